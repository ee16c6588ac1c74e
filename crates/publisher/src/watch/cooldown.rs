//! Per-path cooldown gate
//!
//! Each watched path is either idle or cooling down until a deadline.
//! A change on an idle path is honored and starts the cooldown; changes
//! during the cooldown are dropped. Expiry is checked when the next change
//! arrives, so there are no timers to cancel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

/// Cooldown state of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Idle,
    CoolingDown { until: Instant },
}

/// Tracks the cooldown state of every watched path
#[derive(Debug)]
pub struct CooldownGate {
    window: Duration,
    states: HashMap<PathBuf, PathState>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            states: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current state of `path` as of `now`
    pub fn state(&self, path: &Path, now: Instant) -> PathState {
        match self.states.get(path) {
            Some(PathState::CoolingDown { until }) if now < *until => {
                PathState::CoolingDown { until: *until }
            }
            _ => PathState::Idle,
        }
    }

    /// Record a change on `path` at `now`.
    ///
    /// Returns `true` when the change should trigger a copy, which moves
    /// the path into its cooldown window.
    pub fn admit(&mut self, path: &Path, now: Instant) -> bool {
        if let PathState::CoolingDown { .. } = self.state(path, now) {
            return false;
        }

        self.states.insert(
            path.to_path_buf(),
            PathState::CoolingDown {
                until: now + self.window,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_first_change_is_admitted() {
        let mut gate = CooldownGate::new(WINDOW);
        let now = Instant::now();
        let path = Path::new("assets/js/ui.js");

        assert_eq!(gate.state(path, now), PathState::Idle);
        assert!(gate.admit(path, now));
        assert_eq!(
            gate.state(path, now),
            PathState::CoolingDown { until: now + WINDOW }
        );
    }

    #[test]
    fn test_changes_within_window_are_dropped() {
        let mut gate = CooldownGate::new(WINDOW);
        let start = Instant::now();
        let path = Path::new("assets/js/ui.js");

        assert!(gate.admit(path, start));
        assert!(!gate.admit(path, start + Duration::from_millis(10)));
        assert!(!gate.admit(path, start + Duration::from_millis(999)));
    }

    #[test]
    fn test_dropped_changes_do_not_extend_window() {
        let mut gate = CooldownGate::new(WINDOW);
        let start = Instant::now();
        let path = Path::new("assets/js/ui.js");

        assert!(gate.admit(path, start));
        assert!(!gate.admit(path, start + Duration::from_millis(900)));
        assert!(gate.admit(path, start + WINDOW));
    }

    #[test]
    fn test_change_after_window_is_admitted() {
        let mut gate = CooldownGate::new(WINDOW);
        let start = Instant::now();
        let path = Path::new("assets/js/ui.js");

        assert!(gate.admit(path, start));
        let later = start + Duration::from_millis(1500);
        assert_eq!(gate.state(path, later), PathState::Idle);
        assert!(gate.admit(path, later));
        assert!(!gate.admit(path, later + Duration::from_millis(1)));
    }

    #[test]
    fn test_paths_are_independent() {
        let mut gate = CooldownGate::new(WINDOW);
        let now = Instant::now();

        assert!(gate.admit(Path::new("a.js"), now));
        assert!(gate.admit(Path::new("b.js"), now));
        assert!(!gate.admit(Path::new("a.js"), now));
    }
}
