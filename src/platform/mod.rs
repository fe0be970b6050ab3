pub mod image_picker;
pub mod paths;

pub use image_picker::{pick_image, FileImagePicker, ImagePicker, PermissionStatus, PickerResult};
pub use paths::AppPaths;
