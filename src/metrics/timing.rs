use std::time::{Duration, Instant};

/// Elapsed time between `start` and `end` as (whole minutes, remaining whole
/// seconds). Truncates; an `end` before `start` gives (0, 0).
pub fn epoch_duration(start: Instant, end: Instant) -> (u64, u64) {
    split_minutes(end.saturating_duration_since(start))
}

pub fn split_minutes(elapsed: Duration) -> (u64, u64) {
    let secs = elapsed.as_secs();
    (secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_minutes_five_seconds() {
        let start = Instant::now();
        assert_eq!(epoch_duration(start, start + Duration::from_secs(125)), (2, 5));
    }

    #[test]
    fn floors_fractional_seconds() {
        assert_eq!(split_minutes(Duration::from_millis(59_999)), (0, 59));
        assert_eq!(split_minutes(Duration::from_millis(60_500)), (1, 0));
    }

    #[test]
    fn reversed_instants_saturate() {
        let start = Instant::now();
        assert_eq!(epoch_duration(start + Duration::from_secs(5), start), (0, 0));
    }
}
