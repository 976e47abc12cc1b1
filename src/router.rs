//! Backend selection with the silent-downgrade policy.
//!
//! `claude` is honoured only when that adapter is configured; every other
//! request (absent, unknown, or an unconfigured `claude`) is served by Gemini.
//! A downgrade is never reported as an error. Callers see it only through
//! `modelUsed`.

use crate::backends::{BackendError, BackendId, TextGenerator};
use crate::outcome::{AdviceOutcome, ErrorKind, RoutedOutcome, RoutingDecision};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct ModelRouter {
    gemini: Option<Arc<dyn TextGenerator>>,
    claude: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl ModelRouter {
    pub fn new(
        gemini: Option<Arc<dyn TextGenerator>>,
        claude: Option<Arc<dyn TextGenerator>>,
        timeout: Duration,
    ) -> Self {
        Self {
            gemini,
            claude,
            timeout,
        }
    }

    pub fn is_configured(&self, id: BackendId) -> bool {
        match id {
            BackendId::Gemini => self.gemini.is_some(),
            BackendId::Claude => self.claude.is_some(),
        }
    }

    /// Pure selection; never fails.
    pub fn select(&self, requested: Option<&str>) -> BackendId {
        match requested {
            Some(m) if m == BackendId::Claude.as_str() && self.claude.is_some() => {
                BackendId::Claude
            }
            _ => BackendId::Gemini,
        }
    }

    /// Select a backend and perform exactly one generation call on it.
    pub async fn route(&self, requested: Option<&str>, prompt: &str) -> RoutedOutcome {
        let served_by = self.select(requested);
        let decision = RoutingDecision {
            requested: requested.map(str::to_string),
            served_by,
        };
        if decision.downgraded() {
            warn!(requested = ?requested, served_by = %served_by, "claude not configured; serving with gemini");
        }

        let adapter = match served_by {
            BackendId::Gemini => self.gemini.as_ref(),
            BackendId::Claude => self.claude.as_ref(),
        };
        let Some(adapter) = adapter else {
            let message = format!("{} is not configured", served_by.credential_var());
            error!(backend = %served_by, "{message}");
            return RoutedOutcome {
                decision,
                outcome: AdviceOutcome::failure(ErrorKind::ConfigurationError, message),
            };
        };

        info!(backend = %served_by, prompt_chars = prompt.chars().count(), "generating");
        let result = match timeout(self.timeout, adapter.generate(prompt)).await {
            Ok(r) => r,
            Err(_) => Err(BackendError::Timeout {
                backend: served_by,
                secs: self.timeout.as_secs(),
            }),
        };

        let outcome = match result {
            Ok(text) if !text.trim().is_empty() => {
                info!(backend = %served_by, response_chars = text.chars().count(), "generation succeeded");
                AdviceOutcome::Success { text }
            }
            Ok(_) => {
                let err = BackendError::Empty { backend: served_by };
                error!(backend = %served_by, "{err}");
                AdviceOutcome::failure(ErrorKind::BackendError, err.to_string())
            }
            Err(err) => {
                error!(backend = %served_by, "{err}");
                AdviceOutcome::failure(ErrorKind::BackendError, err.to_string())
            }
        };

        RoutedOutcome { decision, outcome }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted generator that records every prompt it receives.
    pub struct FakeGenerator {
        id: BackendId,
        reply: Result<String, BackendError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        pub fn ok(id: BackendId, text: &str) -> Arc<Self> {
            Arc::new(Self {
                id,
                reply: Ok(text.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn err(id: BackendId, err: BackendError) -> Arc<Self> {
            Arc::new(Self {
                id,
                reply: Err(err),
                delay: None,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn slow(id: BackendId, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                id,
                reply: Ok("late".to_string()),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        fn id(&self) -> BackendId {
            self.id
        }

        async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.reply.clone()
        }
    }
}
