//! Half-window trend classification

use serde::{Deserialize, Serialize};

/// Coarse direction of a field across the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compare the mean of the second half against the first half.
///
/// The split point is `len / 2`, so an odd middle element belongs to the second
/// half. Fewer than two values is always `Stable`.
pub fn classify_trend(values: &[f64], epsilon: f64) -> Trend {
    let split = values.len() / 2;
    if split == 0 {
        return Trend::Stable;
    }

    let (first, second) = values.split_at(split);
    let delta = mean(second) - mean(first);

    if delta > epsilon {
        Trend::Increasing
    } else if delta < -epsilon {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TREND_EPSILON;

    #[test]
    fn test_increasing_with_odd_split() {
        // first half [10, 10] -> 10, second half [10, 20, 20] -> 16.67
        let trend = classify_trend(&[10.0, 10.0, 10.0, 20.0, 20.0], DEFAULT_TREND_EPSILON);
        assert_eq!(trend, Trend::Increasing);
    }

    #[test]
    fn test_decreasing() {
        let trend = classify_trend(&[1800.0, 1750.0, 1500.0, 1400.0], DEFAULT_TREND_EPSILON);
        assert_eq!(trend, Trend::Decreasing);
    }

    #[test]
    fn test_noise_below_epsilon_is_stable() {
        let trend = classify_trend(&[25.0, 25.04, 25.02, 25.08], DEFAULT_TREND_EPSILON);
        assert_eq!(trend, Trend::Stable);
    }

    #[test]
    fn test_single_value_is_stable() {
        assert_eq!(classify_trend(&[42.0], DEFAULT_TREND_EPSILON), Trend::Stable);
        assert_eq!(classify_trend(&[], DEFAULT_TREND_EPSILON), Trend::Stable);
    }
}
