pub mod analysis;
pub mod app;
pub mod camera;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod network;

#[cfg(test)]
mod testing;

pub use config::Configuration;
pub use coordinator::{ControllerHandle, Coordinator, CoordinatorBuilder};
pub use error::{AppError, BackendError, CameraError, IntakeError, SubmitError};
