//! Scripted signing key sources
//!
//! Stand-ins for the identity provider's token key endpoint that replay a
//! fixed script of results and count how often they are asked.

use async_trait::async_trait;
use route_auth::{KeySource, KeySourceError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Key source that replays scripted results in order.
///
/// Once the script runs out, the last step repeats. An empty script
/// fails every fetch.
///
/// # Example
///
/// ```rust,ignore
/// let source = ScriptedKeySource::new()
///     .then_key(old_key.public_key_pem())
///     .then_key(new_key.public_key_pem());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedKeySource {
    steps: Mutex<VecDeque<Result<String, KeySourceError>>>,
    last: Mutex<Option<Result<String, KeySourceError>>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl ScriptedKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful fetch returning `pem`.
    pub fn then_key(self, pem: impl Into<String>) -> Self {
        self.then(Ok(pem.into()))
    }

    /// Append a failed fetch.
    pub fn then_error(self, error: KeySourceError) -> Self {
        self.then(Err(error))
    }

    /// Sleep for `delay` before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn then(self, step: Result<String, KeySourceError>) -> Self {
        self.steps.lock().unwrap().push_back(step);
        self
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for ScriptedKeySource {
    async fn fetch_key(&self) -> Result<String, KeySourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.steps.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(KeySourceError::Request("no key scripted".to_string()))),
        }
    }
}
