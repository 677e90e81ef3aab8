use std::time::{Duration, Instant};

/// Gate for high-frequency diagnostics.
///
/// Every event is counted; `allow` returns `Some(n)` at most once per
/// interval, where `n` is the number of events since the last permitted one
/// (including the current event).
#[derive(Debug, Clone)]
pub struct LogLimiter {
    interval: Duration,
    last: Option<Instant>,
    pending: u64,
    total: u64,
}

impl LogLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            pending: 0,
            total: 0,
        }
    }

    pub fn allow(&mut self) -> Option<u64> {
        self.allow_at(Instant::now())
    }

    pub fn allow_at(&mut self, now: Instant) -> Option<u64> {
        self.pending += 1;
        self.total += 1;
        let open = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if !open {
            return None;
        }
        self.last = Some(now);
        Some(std::mem::take(&mut self.pending))
    }

    /// Events counted over the limiter's lifetime.
    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_gates_by_interval() {
        let start = Instant::now();
        let mut limiter = LogLimiter::new(Duration::from_secs(10));

        assert_eq!(limiter.allow_at(start), Some(1));
        assert_eq!(limiter.allow_at(start + Duration::from_secs(1)), None);
        assert_eq!(limiter.allow_at(start + Duration::from_secs(2)), None);
        assert_eq!(limiter.allow_at(start + Duration::from_secs(11)), Some(3));
        assert_eq!(limiter.total(), 4);
    }
}
