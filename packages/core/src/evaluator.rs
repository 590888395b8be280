//! Alert evaluation.
//!
//! [`evaluate`] is a pure decision function: given one persisted reading,
//! the patient's (possibly absent) threshold, and whether an
//! unacknowledged critical alert already exists inside the dedup window,
//! it returns the alert to raise — or nothing. The window query itself
//! lives in the repository ([`crate::repository::has_unacked_critical_since`]);
//! the caller runs it and passes the result in, which keeps this function
//! deterministic and testable without a store.

use chrono::Duration;

use crate::model::{AlertDraft, Severity, Threshold, VitalRecord};

/// Rolling deduplication window for critical alerts.
pub const DEDUP_WINDOW_SECONDS: i64 = 60;

/// Fraction of `hr_max` at which a warning fires.
const WARNING_HR_FRACTION: f64 = 0.9;

pub fn dedup_window() -> Duration {
    Duration::seconds(DEDUP_WINDOW_SECONDS)
}

/// Decide whether `vital` breaches `threshold`.
///
/// No threshold configured means no alerting for that patient; this is a
/// fail-open policy, not an error. Critical breaches
/// (`heart_rate > hr_max` or `spo2 < spo2_min`) are suppressed when
/// `has_recent_unacked_critical` is set. Warnings
/// (`heart_rate >= 0.9 * hr_max`, checked only when not critical) are
/// never deduplicated.
pub fn evaluate(
    vital: &VitalRecord,
    threshold: Option<&Threshold>,
    has_recent_unacked_critical: bool,
) -> Option<AlertDraft> {
    let threshold = threshold?;

    let is_critical =
        vital.heart_rate > threshold.hr_max || vital.spo2 < threshold.spo2_min;

    if is_critical {
        if has_recent_unacked_critical {
            return None;
        }
        return Some(AlertDraft {
            patient_id: vital.patient_id.clone(),
            severity: Severity::Critical,
            message: format!(
                "Critical vital signs: HR {} bpm, SpO2 {}%",
                vital.heart_rate, vital.spo2
            ),
            timestamp: vital.timestamp,
        });
    }

    let warning_floor = WARNING_HR_FRACTION * threshold.hr_max as f64;
    if vital.heart_rate as f64 >= warning_floor {
        return Some(AlertDraft {
            patient_id: vital.patient_id.clone(),
            severity: Severity::Warning,
            message: format!(
                "High heart rate approaching limit: {} bpm",
                vital.heart_rate
            ),
            timestamp: vital.timestamp,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn make_vital(heart_rate: i64, spo2: f64) -> VitalRecord {
        VitalRecord {
            id: 1,
            patient_id: "p1".to_string(),
            sensor_id: "sensor-1".to_string(),
            timestamp: Utc::now(),
            heart_rate,
            spo2,
            systolic_bp: 120,
            diastolic_bp: 80,
            body_temp: 36.8,
        }
    }

    fn make_threshold() -> Threshold {
        Threshold {
            patient_id: "p1".to_string(),
            hr_max: 120,
            spo2_min: 92.0,
        }
    }

    #[test]
    fn no_threshold_yields_no_alert() {
        let vital = make_vital(250, 60.0);
        assert!(evaluate(&vital, None, false).is_none());
    }

    #[test]
    fn high_heart_rate_is_critical() {
        let vital = make_vital(150, 95.0);
        let draft = evaluate(&vital, Some(&make_threshold()), false).unwrap();
        assert_eq!(draft.severity, Severity::Critical);
        assert!(draft.message.contains("150"));
        assert!(draft.message.contains("95"));
    }

    #[test]
    fn low_spo2_is_critical() {
        let vital = make_vital(80, 88.0);
        let draft = evaluate(&vital, Some(&make_threshold()), false).unwrap();
        assert_eq!(draft.severity, Severity::Critical);
    }

    #[test]
    fn recent_unacked_critical_suppresses_new_critical() {
        let vital = make_vital(150, 95.0);
        assert!(evaluate(&vital, Some(&make_threshold()), true).is_none());
    }

    #[test]
    fn dedup_flag_does_not_suppress_warnings() {
        // HR 110 is in the warning band for hr_max 120.
        let vital = make_vital(110, 95.0);
        let draft = evaluate(&vital, Some(&make_threshold()), true).unwrap();
        assert_eq!(draft.severity, Severity::Warning);
    }

    #[test]
    fn heart_rate_at_hr_max_is_warning_not_critical() {
        let vital = make_vital(120, 95.0);
        let draft = evaluate(&vital, Some(&make_threshold()), false).unwrap();
        assert_eq!(draft.severity, Severity::Warning);
    }

    #[test]
    fn spo2_at_minimum_is_not_a_breach() {
        let vital = make_vital(80, 92.0);
        assert!(evaluate(&vital, Some(&make_threshold()), false).is_none());
    }

    #[test]
    fn normal_reading_yields_no_alert() {
        let vital = make_vital(80, 96.0);
        assert!(evaluate(&vital, Some(&make_threshold()), false).is_none());
    }

    proptest! {
        /// Any breach of either bound with no recent critical on file
        /// produces a critical draft.
        #[test]
        fn breach_without_recent_critical_is_critical(
            hr in 0i64..300,
            spo2 in 0.0f64..100.0,
        ) {
            let threshold = make_threshold();
            prop_assume!(hr > threshold.hr_max || spo2 < threshold.spo2_min);

            let draft = evaluate(&make_vital(hr, spo2), Some(&threshold), false);
            prop_assert_eq!(draft.unwrap().severity, Severity::Critical);
        }

        /// The same breaches are suppressed while an unacknowledged
        /// critical alert is inside the dedup window.
        #[test]
        fn breach_with_recent_critical_is_suppressed(
            hr in 0i64..300,
            spo2 in 0.0f64..100.0,
        ) {
            let threshold = make_threshold();
            prop_assume!(hr > threshold.hr_max || spo2 < threshold.spo2_min);

            prop_assert!(evaluate(&make_vital(hr, spo2), Some(&threshold), true).is_none());
        }

        /// Heart rate in [0.9 * hr_max, hr_max] with healthy SpO2 is a
        /// warning, regardless of the dedup flag.
        #[test]
        fn warning_band_is_warning(hr in 108i64..=120, dedup in any::<bool>()) {
            let threshold = make_threshold();
            let draft = evaluate(&make_vital(hr, 96.0), Some(&threshold), dedup);
            prop_assert_eq!(draft.unwrap().severity, Severity::Warning);
        }

        /// Below the warning band with healthy SpO2 nothing fires.
        #[test]
        fn quiet_readings_raise_nothing(hr in 0i64..108, spo2 in 92.0f64..100.0) {
            let threshold = make_threshold();
            prop_assert!(evaluate(&make_vital(hr, spo2), Some(&threshold), false).is_none());
        }

        /// Without a configured threshold the evaluator never alerts.
        #[test]
        fn no_threshold_never_alerts(hr in 0i64..300, spo2 in 0.0f64..100.0) {
            prop_assert!(evaluate(&make_vital(hr, spo2), None, false).is_none());
        }
    }
}
