use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("threshold {name} = {value} is outside [0, 1]")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("thresholds must satisfy low <= medium <= high (got {low}, {medium}, {high})")]
    Unordered { low: f32, medium: f32, high: f32 },
}
