//! Human-like pacing between actions.

use std::time::Duration;

use rand::Rng;

/// `base` scaled by a uniform factor in `[1 - variance, 1 + variance]`,
/// never below `floor`.
pub fn jittered_interval(base: Duration, variance: f64, floor: Duration) -> Duration {
    let sample: f64 = rand::thread_rng().r#gen();
    jittered_interval_at(base, variance, floor, sample)
}

/// Deterministic form of [`jittered_interval`]; `sample` is in `[0, 1)`.
pub fn jittered_interval_at(base: Duration, variance: f64, floor: Duration, sample: f64) -> Duration {
    let variance = variance.clamp(0.0, 1.0);
    let factor = 1.0 - variance + sample.clamp(0.0, 1.0) * 2.0 * variance;
    let millis = (base.as_millis() as f64 * factor).round().max(0.0) as u64;
    Duration::from_millis(millis).max(floor)
}

/// Uniform think time in `[min, max]`. Sampled anew on every call.
pub fn think_time(min: Duration, max: Duration) -> Duration {
    let (lo, hi) = (min.as_millis() as u64, max.as_millis() as u64);
    if hi <= lo {
        return min;
    }
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(60);
        let floor = Duration::from_secs(1);
        assert_eq!(jittered_interval_at(base, 0.2, floor, 0.0), Duration::from_secs(48));
        assert_eq!(jittered_interval_at(base, 0.2, floor, 0.5), Duration::from_secs(60));
        assert_eq!(jittered_interval_at(base, 0.2, floor, 1.0), Duration::from_secs(72));
    }

    #[test]
    fn test_jitter_floor() {
        let delay = jittered_interval_at(Duration::ZERO, 0.5, Duration::from_millis(1000), 0.3);
        assert_eq!(delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_random_interval_in_range() {
        for _ in 0..100 {
            let delay = jittered_interval(Duration::from_secs(10), 0.2, Duration::from_secs(1));
            assert!(delay >= Duration::from_secs(8) && delay <= Duration::from_secs(12));
        }
    }

    #[test]
    fn test_think_time_range() {
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(500);
        for _ in 0..100 {
            let t = think_time(min, max);
            assert!(t >= min && t <= max);
        }
        assert_eq!(think_time(max, min), max);
    }
}
