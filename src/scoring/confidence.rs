use tracing::debug;

use crate::evidence::EvidenceChunk;

use super::types::{ConfidenceThresholds, ConfidenceTier};

/// Minimum number of chunks (top chunk included) at or above the medium threshold for a
/// high-confidence answer.
const CORROBORATING_CHUNKS: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceCalculator {
    thresholds: ConfidenceThresholds,
}

impl ConfidenceCalculator {
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    /// Tier for an evidence list whose scores are final.
    ///
    /// Order of `evidence` does not matter; the maximum [`EvidenceChunk::rank_score`] is the
    /// top score.
    pub fn calculate(&self, evidence: &[EvidenceChunk]) -> ConfidenceTier {
        let scores: Vec<f32> = evidence.iter().map(EvidenceChunk::rank_score).collect();
        self.calculate_scores(&scores)
    }

    pub fn calculate_scores(&self, scores: &[f32]) -> ConfidenceTier {
        let Some(top) = scores.iter().copied().max_by(f32::total_cmp) else {
            return ConfidenceTier::Low;
        };

        if top < self.thresholds.low {
            return ConfidenceTier::Low;
        }

        let corroborating = scores
            .iter()
            .filter(|&&s| s >= self.thresholds.medium)
            .count();

        let tier = if top >= self.thresholds.high && corroborating >= CORROBORATING_CHUNKS {
            ConfidenceTier::High
        } else {
            ConfidenceTier::Medium
        };

        debug!(top_score = top, corroborating, tier = %tier, "Confidence calculated");
        tier
    }

    /// Like [`calculate`](Self::calculate), capped at medium when rerank fell back to
    /// retrieval order.
    pub fn calculate_with_fallback(
        &self,
        evidence: &[EvidenceChunk],
        rerank_degraded: bool,
    ) -> ConfidenceTier {
        let tier = self.calculate(evidence);
        if rerank_degraded {
            tier.capped_at(ConfidenceTier::Medium)
        } else {
            tier
        }
    }
}
