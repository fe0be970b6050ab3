use std::fmt;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Chat,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Tabs(Tab),
}

impl Route {
    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Tabs(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => write!(f, "login"),
            Route::Tabs(Tab::Chat) => write!(f, "chat"),
            Route::Tabs(Tab::Profile) => write!(f, "profile"),
        }
    }
}

/// Tracks the visible screen and keeps signed-out users on the login screen.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Route,
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            current: Route::Login,
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    /// Where a request for `requested` actually lands.
    pub fn resolve(requested: Route, authenticated: bool) -> Route {
        if requested.requires_auth() && !authenticated {
            Route::Login
        } else {
            requested
        }
    }

    pub fn navigate(&mut self, requested: Route, authenticated: bool) -> Route {
        let route = Self::resolve(requested, authenticated);
        if route != requested {
            debug!("Redirecting {} to {}", requested, route);
        }
        self.current = route;
        route
    }

    /// Follow an auth change: signing in leaves the login screen for the
    /// chat tab, signing out always lands on login.
    pub fn on_auth_changed(&mut self, authenticated: bool) -> Route {
        self.current = match (self.current, authenticated) {
            (Route::Login, true) => Route::Tabs(Tab::Chat),
            (_, false) => Route::Login,
            (route, true) => route,
        };
        self.current
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_login() {
        assert_eq!(Navigator::new().current(), Route::Login);
    }

    #[test]
    fn test_tabs_redirect_when_signed_out() {
        let mut nav = Navigator::new();
        assert_eq!(nav.navigate(Route::Tabs(Tab::Profile), false), Route::Login);
        assert_eq!(nav.navigate(Route::Tabs(Tab::Profile), true), Route::Tabs(Tab::Profile));
        assert_eq!(nav.navigate(Route::Login, true), Route::Login);
    }

    #[test]
    fn test_auth_changes() {
        let mut nav = Navigator::new();
        assert_eq!(nav.on_auth_changed(true), Route::Tabs(Tab::Chat));

        nav.navigate(Route::Tabs(Tab::Profile), true);
        assert_eq!(nav.on_auth_changed(true), Route::Tabs(Tab::Profile));

        assert_eq!(nav.on_auth_changed(false), Route::Login);
    }
}
