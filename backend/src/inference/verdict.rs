use shared::{Label, PredictionDetails, PredictionResponse};

/// Scores strictly above this are Real.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub label: Label,
    /// Percentage for the winning label, 2 dp.
    pub confidence: f64,
    /// Model output, 4 dp.
    pub raw_score: f64,
    pub fake_probability: f64,
    pub real_probability: f64,
}

impl PredictionResult {
    pub fn is_fake(&self) -> bool {
        self.label.is_fake()
    }
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        PredictionResponse {
            success: true,
            prediction: result.label,
            confidence: result.confidence,
            raw_score: result.raw_score,
            details: PredictionDetails {
                is_fake: result.is_fake(),
                fake_probability: result.fake_probability,
                real_probability: result.real_probability,
            },
        }
    }
}

pub fn derive(raw_score: f32) -> PredictionResult {
    let is_real = raw_score > DECISION_THRESHOLD;
    let real_percent = f64::from(raw_score) * 100.0;
    let fake_percent = 100.0 - real_percent;

    // fake/real are rounded on their own, so they can miss 100 by 0.01
    PredictionResult {
        label: if is_real { Label::Real } else { Label::Fake },
        confidence: round_to(if is_real { real_percent } else { fake_percent }, 2),
        raw_score: round_to(f64::from(raw_score), 4),
        fake_probability: round_to(fake_percent, 2),
        real_probability: round_to(real_percent, 2),
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}
