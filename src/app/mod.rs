pub mod controller;
pub mod notifications;
pub mod shortcuts;
pub mod view;

pub use controller::{Command, DetectionController, Effect};
pub use notifications::{Notification, NotificationCenter, NotificationKind};
pub use view::{CameraControls, CameraStatus, ModelStatus, StatusTone, ViewState};
