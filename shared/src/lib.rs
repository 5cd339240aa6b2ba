use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Largest image the server accepts by default. The client checks uploads against it.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Verdict label. Scores above 0.5 are `Real`, everything else is `Fake`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    pub fn is_fake(self) -> bool {
        self == Label::Fake
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionDetails {
    pub is_fake: bool,
    pub fake_probability: f64,
    pub real_probability: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: Label,
    pub confidence: f64,
    pub raw_score: f64,
    pub details: PredictionDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusResponse {
    pub message: String,
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn upload_limit_is_ten_megabytes() {
        assert_eq!(MAX_UPLOAD_BYTES, 10_485_760);
    }

    #[test]
    fn label_serializes_as_plain_name() {
        assert_eq!(serde_json::to_string(&Label::Real).unwrap(), "\"Real\"");
        assert_eq!(serde_json::to_string(&Label::Fake).unwrap(), "\"Fake\"");
        assert_eq!(Label::from_str("Fake").unwrap(), Label::Fake);
        assert_eq!(Label::Real.to_string(), "Real");
    }

    #[test]
    fn prediction_response_wire_shape() {
        let response = PredictionResponse {
            success: true,
            prediction: Label::Fake,
            confidence: 95.0,
            raw_score: 0.05,
            details: PredictionDetails {
                is_fake: true,
                fake_probability: 95.0,
                real_probability: 5.0,
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["prediction"], "Fake");
        assert_eq!(value["details"]["is_fake"], true);
        assert_eq!(value["details"]["fake_probability"], 95.0);
    }
}
