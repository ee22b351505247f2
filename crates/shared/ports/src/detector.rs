use volwatch_core::{Alarm, DetectorSource, Return};

use crate::error::DetectorResult;

/// Port for streaming detectors
///
/// Each implementation owns its private state and is fed returns in strict
/// timestamp order. Implementations share nothing, so independent
/// instances can run on separate workers over the same return sequence.
pub trait AlarmSource: Send {
    /// Which stream this detector feeds into fusion
    fn source(&self) -> DetectorSource;

    /// Consume one return, possibly emitting an alarm
    fn observe(&mut self, ret: &Return) -> DetectorResult<Option<Alarm>>;

    /// Restore the construction-time state
    fn reset(&mut self);

    /// Consume a whole batch and collect its alarms in order
    fn observe_all(&mut self, returns: &[Return]) -> DetectorResult<Vec<Alarm>> {
        let mut alarms = Vec::new();
        for ret in returns {
            if let Some(alarm) = self.observe(ret)? {
                alarms.push(alarm);
            }
        }
        Ok(alarms)
    }

    /// Get the detector name for logging/debugging
    fn name(&self) -> &str {
        self.source().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use volwatch_core::AlarmLabel;

    /// Alarms on every positive return
    struct SignDetector;

    impl AlarmSource for SignDetector {
        fn source(&self) -> DetectorSource {
            DetectorSource::Cusum
        }

        fn observe(&mut self, ret: &Return) -> DetectorResult<Option<Alarm>> {
            Ok((ret.value > 0.0)
                .then(|| Alarm::new(ret.timestamp, self.source(), AlarmLabel::ChangePoint)))
        }

        fn reset(&mut self) {}
    }

    #[test]
    fn test_observe_all_keeps_order() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        let returns: Vec<_> = [0.1, -0.1, 0.2]
            .iter()
            .enumerate()
            .map(|(i, &v)| Return::new(t0 + chrono::Duration::minutes(i as i64), v))
            .collect();

        let mut detector: Box<dyn AlarmSource> = Box::new(SignDetector);
        let alarms = detector.observe_all(&returns).unwrap();

        assert_eq!(alarms.len(), 2);
        assert!(alarms[0].timestamp < alarms[1].timestamp);
        assert_eq!(detector.name(), "cusum");
    }
}
