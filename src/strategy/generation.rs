use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::StaleResponseDiscarded;

/// Captured at request start; the response is applied only while it is still current
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationToken(u64);

impl GenerationToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic request generation counter guarding against stale responses.
///
/// Starting a request or tearing down the view bumps the counter, so any response
/// carrying an older token is discarded. Only equality is checked, no lock is held.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any request still in flight
    pub fn begin(&self) -> GenerationToken {
        GenerationToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The view went away; every in-flight request becomes stale
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, token: GenerationToken) -> bool {
        self.current() == token.0
    }

    pub fn accept<T>(&self, token: GenerationToken, value: T) -> Result<T, StaleResponseDiscarded> {
        let current = self.current();
        if current == token.0 {
            Ok(value)
        } else {
            Err(StaleResponseDiscarded { token: token.0, current })
        }
    }
}
