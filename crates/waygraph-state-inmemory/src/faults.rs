//! Failure injection for exercising rollback paths.

use std::sync::atomic::{AtomicUsize, Ordering};

const DISARMED: usize = usize::MAX;

/// Countdown triggers shared by every transaction of a store
#[derive(Debug)]
pub struct FaultInjector {
    route_creates: AtomicUsize,
    commits: AtomicUsize,
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self {
            route_creates: AtomicUsize::new(DISARMED),
            commits: AtomicUsize::new(DISARMED),
        }
    }
}

fn arm(counter: &AtomicUsize, successes: usize) {
    counter.store(successes.min(DISARMED - 1), Ordering::SeqCst);
}

/// Count one call down. Fires once, on the call after the allowed successes.
fn trip(counter: &AtomicUsize) -> bool {
    let previous = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
        match remaining {
            DISARMED => None,
            0 => Some(DISARMED),
            n => Some(n - 1),
        }
    });
    matches!(previous, Ok(0))
}

impl FaultInjector {
    /// Let `successes` route creations through, then fail the next one
    pub fn fail_route_create_after(&self, successes: usize) {
        arm(&self.route_creates, successes);
    }

    /// Let `successes` commits through, then fail the next one
    pub fn fail_commit_after(&self, successes: usize) {
        arm(&self.commits, successes);
    }

    /// Disarm every trigger
    pub fn clear(&self) {
        self.route_creates.store(DISARMED, Ordering::SeqCst);
        self.commits.store(DISARMED, Ordering::SeqCst);
    }

    pub(crate) fn trip_route_create(&self) -> bool {
        trip(&self.route_creates)
    }

    pub(crate) fn trip_commit(&self) -> bool {
        trip(&self.commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_successes() {
        let faults = FaultInjector::default();
        assert!(!faults.trip_route_create());

        faults.fail_route_create_after(1);
        assert!(!faults.trip_route_create());
        assert!(faults.trip_route_create());
        assert!(!faults.trip_route_create());
    }

    #[test]
    fn test_clear_disarms() {
        let faults = FaultInjector::default();
        faults.fail_commit_after(0);
        faults.clear();
        assert!(!faults.trip_commit());
    }
}
