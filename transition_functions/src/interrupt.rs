//! Cooperative cancellation for long transitions.
//!
//! The handle is checked after each processed operation, between epoch
//! sub-steps, and periodically inside per-validator loops. A cancelled call
//! returns without completing; the caller's copy of the predecessor state is
//! never touched, so cancellation is unobservable apart from the error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::unphased::Error;

/// How many validators a reward loop may process between checks.
pub(crate) const VALIDATOR_CHECK_INTERVAL: usize = 4096;

#[derive(Clone, Default)]
pub struct Interrupt {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Interrupt {
    #[must_use]
    pub const fn never() -> Self {
        Self {
            flag: None,
            deadline: None,
        }
    }

    /// Cancels the transition once `flag` is set.
    #[must_use]
    pub const fn with_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag: Some(flag),
            deadline: None,
        }
    }

    #[must_use]
    pub const fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: None,
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub fn and_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn check(&self) -> Result<(), Error> {
        if let Some(flag) = &self.flag {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(Error::DeadlineExceeded);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_does_not_trip() {
        Interrupt::never().check().expect("no flag and no deadline");
    }

    #[test]
    fn flag_trips_the_interrupt() {
        let flag = Arc::new(AtomicBool::new(false));
        let interrupt = Interrupt::with_flag(flag.clone());

        interrupt.check().expect("flag is not set yet");

        flag.store(true, Ordering::Relaxed);
        assert!(matches!(interrupt.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn past_deadlines_trip_the_interrupt() {
        let interrupt = Interrupt::with_deadline(Instant::now() - core::time::Duration::from_secs(1));
        assert!(matches!(interrupt.check(), Err(Error::DeadlineExceeded)));
    }
}
