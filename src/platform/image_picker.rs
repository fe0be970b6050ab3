use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "heic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResult {
    Picked(String),
    Cancelled,
}

/// Platform capability that hands back a local image locator.
#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus>;
    async fn launch(&self) -> Result<PickerResult>;
}

/// Ask for permission and pick an image. Denial, cancellation and picker
/// failures all come back as `None`.
pub async fn pick_image(picker: &dyn ImagePicker) -> Option<String> {
    match picker.request_permission().await {
        Ok(PermissionStatus::Granted) => {}
        Ok(PermissionStatus::Denied) => {
            warn!("Image picker permission denied");
            return None;
        }
        Err(e) => {
            error!("Image picker error: {}", e);
            return None;
        }
    }

    match picker.launch().await {
        Ok(PickerResult::Picked(uri)) => {
            debug!("Picked image {}", uri);
            Some(uri)
        }
        Ok(PickerResult::Cancelled) => None,
        Err(e) => {
            error!("Image picker error: {}", e);
            None
        }
    }
}

/// Picks a file the user named on the command line.
pub struct FileImagePicker {
    candidate: Option<PathBuf>,
}

impl FileImagePicker {
    pub fn new(candidate: impl Into<PathBuf>) -> Self {
        Self {
            candidate: Some(candidate.into()),
        }
    }

    /// A picker the user backed out of.
    pub fn cancelled() -> Self {
        Self { candidate: None }
    }
}

#[async_trait]
impl ImagePicker for FileImagePicker {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        let Some(path) = &self.candidate else {
            return Ok(PermissionStatus::Granted);
        };

        match fs::File::open(path).await {
            Ok(_) => Ok(PermissionStatus::Granted),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(PermissionStatus::Denied),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn launch(&self) -> Result<PickerResult> {
        let Some(path) = &self.candidate else {
            return Ok(PickerResult::Cancelled);
        };

        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_image {
            return Err(Error::validation(format!("{:?} is not an image", path)));
        }

        let absolute = fs::canonicalize(path).await?;
        let url = Url::from_file_path(&absolute)
            .map_err(|_| Error::platform(format!("Cannot build a file URL for {:?}", absolute)))?;

        Ok(PickerResult::Picked(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct DenyingPicker;

    #[async_trait]
    impl ImagePicker for DenyingPicker {
        async fn request_permission(&self) -> Result<PermissionStatus> {
            Ok(PermissionStatus::Denied)
        }

        async fn launch(&self) -> Result<PickerResult> {
            panic!("launch must not run without permission");
        }
    }

    #[tokio::test]
    async fn test_denied_permission_is_no_selection() {
        assert_eq!(pick_image(&DenyingPicker).await, None);
    }

    #[tokio::test]
    async fn test_picks_existing_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cat.PNG");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let uri = pick_image(&FileImagePicker::new(&path)).await.unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("cat.PNG"));
    }

    #[tokio::test]
    async fn test_missing_or_non_image_is_no_selection() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.png");
        assert_eq!(pick_image(&FileImagePicker::new(missing)).await, None);

        let text = temp_dir.path().join("notes.txt");
        std::fs::write(&text, "hi").unwrap();
        assert_eq!(pick_image(&FileImagePicker::new(text)).await, None);
    }

    #[tokio::test]
    async fn test_cancelled_picker() {
        assert_eq!(pick_image(&FileImagePicker::cancelled()).await, None);
    }
}
