//! Health score and alert generation

use super::{Alert, AlertLevel, Window};
use crate::config::{AnalysisConfig, FieldLimits};
use crate::machine::{Reading, Status};

/// Composite health in [0, 1].
///
/// `range_weight * normal_fraction + status_weight * desirability(current)
/// - change_penalty * status_changes`, clamped. Temperature and speed samples count
/// separately toward `normal_fraction`, so the score never drops when a reading
/// moves into its normal range or when the window holds fewer status changes.
pub fn health_score(window: &Window, status_changes: usize, config: &AnalysisConfig) -> f64 {
    let Some(current) = window.last() else {
        return 0.0;
    };
    let weights = &config.health;

    let samples = window.len() * 2;
    let in_range = window
        .iter()
        .map(|r| {
            usize::from(config.temperature.normal.contains(r.temperature))
                + usize::from(config.speed.normal.contains(r.speed))
        })
        .sum::<usize>();
    let normal_fraction = in_range as f64 / samples as f64;

    let score = weights.range_weight * normal_fraction
        + weights.status_weight * weights.status_scores.score(current.status)
        - weights.change_penalty * status_changes as f64;

    score.clamp(0.0, 1.0)
}

fn field_alert(name: &str, value: f64, limits: &FieldLimits) -> Option<Alert> {
    if !limits.alert.contains(value) {
        Some(Alert::new(
            AlertLevel::Fault,
            format!("{name} out of safe range: {value}"),
        ))
    } else if !limits.normal.contains(value) {
        Some(Alert::new(
            AlertLevel::Warning,
            format!("{name} outside normal range: {value}"),
        ))
    } else {
        None
    }
}

/// Alerts for the most recent reading
pub fn generate_alerts(current: &Reading, config: &AnalysisConfig) -> Vec<Alert> {
    let mut alerts = Vec::new();

    alerts.extend(field_alert("Temperature", current.temperature, &config.temperature));
    alerts.extend(field_alert("Speed", current.speed, &config.speed));

    match current.status {
        Status::Paused => alerts.push(Alert::new(
            AlertLevel::Notice,
            "Machine paused - may require attention",
        )),
        Status::Shutdown => alerts.push(Alert::new(
            AlertLevel::Notice,
            "Machine shutdown - check if scheduled",
        )),
        _ => {}
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn window(values: &[(f64, f64, Status)]) -> Window {
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Window::from_readings(
            values.len(),
            values
                .iter()
                .enumerate()
                .map(|(i, &(t, s, st))| Reading::new(base + Duration::seconds(i as i64), t, s, st)),
        )
    }

    #[test]
    fn test_all_normal_running_scores_full() {
        let config = AnalysisConfig::default();
        let w = window(&[(25.0, 1500.0, Status::Running); 5]);
        assert!((health_score(&w, 0, &config) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_into_normal_range_never_lowers_score() {
        let config = AnalysisConfig::default();
        let mut rows = [(25.0, 1500.0, Status::Running); 5];
        rows[1] = (38.0, 1500.0, Status::Running);
        rows[3] = (25.0, 2100.0, Status::Running);

        let before = health_score(&window(&rows), 0, &config);
        for (idx, fixed) in [(1, (25.0, 1500.0, Status::Running)), (3, (25.0, 1500.0, Status::Running))] {
            let mut improved = rows;
            improved[idx] = fixed;
            assert!(health_score(&window(&improved), 0, &config) >= before);
        }
    }

    #[test]
    fn test_fewer_changes_never_lower_score() {
        let config = AnalysisConfig::default();
        let w = window(&[(25.0, 1500.0, Status::Running); 5]);
        let mut previous = health_score(&w, 4, &config);
        for changes in (0..4).rev() {
            let score = health_score(&w, changes, &config);
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_score_is_clamped() {
        let config = AnalysisConfig::default();
        let w = window(&[(50.0, 0.0, Status::Shutdown); 3]);
        let score = health_score(&w, 20, &config);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_alert_levels() {
        let config = AnalysisConfig::default();
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let alerts = generate_alerts(&Reading::new(ts, 45.5, 1500.0, Status::Running), &config);
        assert_eq!(alerts, vec![Alert::new(AlertLevel::Fault, "Temperature out of safe range: 45.5")]);

        let alerts = generate_alerts(&Reading::new(ts, 25.0, 900.0, Status::Paused), &config);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].message, "Speed outside normal range: 900");
        assert_eq!(alerts[1].message, "Machine paused - may require attention");

        let alerts = generate_alerts(&Reading::new(ts, 25.0, 1500.0, Status::Running), &config);
        assert!(alerts.is_empty());
    }
}
