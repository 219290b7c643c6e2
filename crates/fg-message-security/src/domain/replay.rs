//! # Replay Guard
//!
//! Requests carry their issue time inside the signed body. A Responder
//! rejects any request older than `maximum_age` seconds. Requests from the
//! future are accepted: the timestamp is covered by the sender's signature,
//! so only the sender's own clock skew can place it there.

use crate::domain::errors::SecurityError;
use crate::ports::outbound::Clock;
use shared_types::PlaintextEnvelope;
use std::sync::Arc;

/// Stamps outbound requests and checks the age of inbound ones.
#[derive(Clone)]
pub struct ReplayGuard {
    clock: Arc<dyn Clock>,
    maximum_age: u64,
}

impl ReplayGuard {
    /// Create a guard with a window of `maximum_age` seconds.
    pub fn new(clock: Arc<dyn Clock>, maximum_age: u64) -> Self {
        Self { clock, maximum_age }
    }

    /// Replay window in seconds.
    pub fn maximum_age(&self) -> u64 {
        self.maximum_age
    }

    /// Wrap `payload` with the current time.
    pub fn stamp<T>(&self, payload: T) -> PlaintextEnvelope<T> {
        PlaintextEnvelope::new(payload, self.clock.now_utc_seconds())
    }

    /// Check that `envelope` is inside the window, returning its age.
    ///
    /// # Errors
    ///
    /// `SecurityError::ReplayRejected` when older than `maximum_age` or when
    /// the timestamp is not a finite number.
    pub fn check_fresh<T>(&self, envelope: &PlaintextEnvelope<T>) -> Result<f64, SecurityError> {
        if !envelope.issued_at.is_finite() {
            return Err(SecurityError::ReplayRejected {
                age: f64::INFINITY,
                max_age: self.maximum_age,
            });
        }

        let age = self.clock.now_utc_seconds() - envelope.issued_at;
        if age > self.maximum_age as f64 {
            return Err(SecurityError::ReplayRejected {
                age,
                max_age: self.maximum_age,
            });
        }
        Ok(age)
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("maximum_age", &self.maximum_age)
            .finish_non_exhaustive()
    }
}
