pub mod presenter;
pub mod submitter;

pub use presenter::{render, AnalysisResult, Classification, RenderedResult};
pub use submitter::{AnalysisRequest, AnalysisSubmitter, PendingAnalysis};
