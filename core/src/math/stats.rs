/// Minimum, maximum and mean of a set of detection confidences.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfidenceStats {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

pub struct StatsHelper;

impl StatsHelper {
    /// Returns all-zero stats for an empty set.
    pub fn confidence(scores: &[f32]) -> ConfidenceStats {
        if scores.is_empty() {
            return ConfidenceStats::default();
        }
        let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let sum: f32 = scores.iter().sum();
        ConfidenceStats {
            min,
            max,
            avg: sum / scores.len() as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scores_yield_zero_stats() {
        assert_eq!(StatsHelper::confidence(&[]), ConfidenceStats::default());
    }

    #[test]
    fn stats_cover_min_max_and_mean() {
        let stats = StatsHelper::confidence(&[0.5, 0.25, 0.75]);
        assert_eq!(stats.min, 0.25);
        assert_eq!(stats.max, 0.75);
        assert!((stats.avg - 0.5).abs() < 1e-6);
    }

    #[test]
    fn single_score_is_its_own_range() {
        let stats = StatsHelper::confidence(&[0.9]);
        assert_eq!(stats.min, 0.9);
        assert_eq!(stats.max, 0.9);
        assert_eq!(stats.avg, 0.9);
    }
}
