pub mod backend;
pub mod http_backend;
pub mod wire;

pub use backend::AnalysisBackend;
pub use http_backend::HttpBackend;
pub use wire::{Confidence, ModelStatusResponse, PredictionResponse};
