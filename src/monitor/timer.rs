//! Wall-clock timing for instrumented operations.

use std::time::{Duration, Instant};

/// Starts timing on creation.
#[derive(Debug, Clone, Copy)]
pub struct OperationTimer {
    started: Instant,
}

impl OperationTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for OperationTimer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_measures_elapsed_time() {
        let timer = OperationTimer::start();
        std::thread::sleep(Duration::from_millis(15));

        let ms = timer.elapsed_ms();
        assert!(ms >= 15.0, "elapsed {}ms", ms);
        assert!(timer.elapsed() >= Duration::from_millis(15));
    }
}
