use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub image_data: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelStatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl ModelStatusResponse {
    pub fn is_ready(&self) -> bool {
        self.status == "success"
    }
}

/// The backend sends confidence either as text ("92%") or as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Number(f64),
    Text(String),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Number(value) => write!(f, "{}", value),
            Confidence::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Shared response shape of `/predict` and `/upload`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
    #[serde(default)]
    pub prediction_value: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
