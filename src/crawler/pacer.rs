//! Politeness delay between consecutive requests
//!
//! All fetches of a session go through one `Pacer`, so listing pages, post
//! pages and link-text lookups share the same spacing and never overlap.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct Pacer {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Blocks until `delay` has passed since the previous request, then
    /// records the current request
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// behind each other instead of firing together.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                let remaining = self.delay - elapsed;
                tracing::trace!("Pacing: sleeping {:?}", remaining);
                tokio::time::sleep(remaining).await;
            }
        }

        *last = Some(Instant::now());
    }
}
