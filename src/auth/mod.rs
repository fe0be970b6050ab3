pub mod profile;
pub mod service;

pub use profile::{Credentials, ProfilePatch, UserProfile};
pub use service::{AuthService, AuthState};
