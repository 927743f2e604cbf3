pub mod captured_image;
pub mod file_intake;

pub use captured_image::{CapturedImage, ImagePayload, ImageSource};
pub use file_intake::{FileContents, FileIntake, FileOrigin, SelectedFile};
