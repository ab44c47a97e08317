//! Wall-clock latency measurement for single remote calls.

use std::future::Future;
use std::time::{Duration, Instant};

/// Await `fut` and return its output with the elapsed time, measured on the monotonic clock.
pub async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let out = fut.await;
    (out, start.elapsed())
}

pub fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elapsed_covers_awaited_work() {
        let (value, elapsed) = timed(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            7
        })
        .await;
        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn ready_future_is_non_negative() {
        let (_, elapsed) = timed(async {}).await;
        assert!(millis(elapsed) >= 0.0);
    }

    #[test]
    fn millis_conversion() {
        assert!((millis(Duration::from_micros(1500)) - 1.5).abs() < 1e-9);
    }
}
