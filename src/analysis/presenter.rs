use crate::network::wire::Confidence;

/// A successful analysis, decoded from the backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub diagnosis: String,
    pub confidence: Option<Confidence>,
    pub prediction_value: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Favorable,
    AttentionNeeded,
    Neutral,
}

impl Classification {
    /// Case-insensitive substring match on the backend's wording.
    pub fn of(diagnosis: &str) -> Self {
        let diagnosis = diagnosis.to_lowercase();
        if diagnosis.contains("normal") {
            Classification::Favorable
        } else if diagnosis.contains("issue") || diagnosis.contains("potential") {
            Classification::AttentionNeeded
        } else {
            Classification::Neutral
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Classification::Favorable => "diagnosis normal",
            Classification::AttentionNeeded => "diagnosis issue",
            Classification::Neutral => "diagnosis",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResult {
    pub diagnosis: String,
    pub confidence_text: String,
    pub classification: Classification,
}

pub fn render(result: &AnalysisResult) -> RenderedResult {
    RenderedResult {
        diagnosis: result.diagnosis.clone(),
        confidence_text: result
            .confidence
            .as_ref()
            .map(|confidence| format!("Confidence: {}", confidence))
            .unwrap_or_default(),
        classification: Classification::of(&result.diagnosis),
    }
}
