//! Rate limiting for one repetitive log line.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Gate {
    reopens_at: Option<Instant>,
    swallowed: u64,
}

/// Lets one line through per `interval` and counts the ones it holds back.
///
/// Each owner keeps its own throttle, so two services never share a window.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    gate: Mutex<Gate>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            gate: Mutex::new(Gate::default()),
        }
    }

    /// `Some(n)` when a line may be written now, where `n` lines were held
    /// back since the previous one. `None` while the gate is shut.
    pub fn admit(&self) -> Option<u64> {
        self.admit_at(Instant::now())
    }

    fn admit_at(&self, now: Instant) -> Option<u64> {
        // Poisoning only means a panic elsewhere mid-log; the counters are still sound.
        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        match gate.reopens_at {
            Some(reopens_at) if now < reopens_at => {
                gate.swallowed += 1;
                None
            }
            _ => {
                gate.reopens_at = Some(now + self.interval);
                Some(std::mem::take(&mut gate.swallowed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line_passes_then_gate_shuts() {
        let throttle = LogThrottle::new(Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(throttle.admit_at(start), Some(0));
        assert_eq!(throttle.admit_at(start + Duration::from_secs(1)), None);
        assert_eq!(throttle.admit_at(start + Duration::from_secs(59)), None);
        assert_eq!(throttle.admit_at(start + Duration::from_secs(60)), Some(2));
        assert_eq!(throttle.admit_at(start + Duration::from_secs(61)), None);
    }

    #[test]
    fn test_throttles_are_independent() {
        let a = LogThrottle::new(Duration::from_secs(60));
        let b = LogThrottle::new(Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(a.admit_at(start), Some(0));
        assert_eq!(a.admit_at(start), None);
        // `b` has its own window
        assert_eq!(b.admit_at(start), Some(0));
    }
}
