pub mod constraints;
pub mod device;
pub mod environment;
pub mod session;
pub mod snapshot;

pub use constraints::{Dimension, FacingMode, VideoConstraints};
pub use device::{
    CameraDevice, DeviceErrorKind, FrameGeometry, NoCamera, TrackId, VideoStream,
};
pub use environment::{Environment, UnavailableReason};
pub use session::{CameraSession, CameraState};
