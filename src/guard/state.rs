use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Control-plane pause switch for the whole pipeline.
#[derive(Debug, Clone)]
pub struct GuardState {
    // If Some(Instant), blocking is paused until that instant.
    // If None or Instant passed, blocking is active.
    blocking_paused_until: Arc<RwLock<Option<Instant>>>,
}

impl GuardState {
    pub fn new() -> Self {
        Self {
            blocking_paused_until: Arc::new(RwLock::new(None)),
        }
    }

    pub fn is_blocking_active(&self) -> bool {
        let guard = self.blocking_paused_until.read().unwrap();
        if let Some(until) = *guard {
            if Instant::now() < until {
                return false;
            }
        }
        true
    }

    pub fn pause_blocking(&self, duration: std::time::Duration) {
        let mut guard = self.blocking_paused_until.write().unwrap();
        *guard = Some(Instant::now() + duration);
    }

    pub fn resume_blocking(&self) {
        let mut guard = self.blocking_paused_until.write().unwrap();
        *guard = None;
    }

    pub fn get_pause_remaining_secs(&self) -> Option<u64> {
        let guard = self.blocking_paused_until.read().unwrap();
        if let Some(until) = *guard {
            let now = Instant::now();
            if until > now {
                return Some(until.duration_since(now).as_secs());
            }
        }
        None
    }
}

impl Default for GuardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_pause_and_resume() {
        let state = GuardState::new();
        assert!(state.is_blocking_active());

        state.pause_blocking(Duration::from_secs(60));
        assert!(!state.is_blocking_active());
        assert!(state.get_pause_remaining_secs().is_some());

        state.resume_blocking();
        assert!(state.is_blocking_active());
        assert_eq!(state.get_pause_remaining_secs(), None);
    }
}
