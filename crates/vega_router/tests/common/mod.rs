//! Shared helpers for router scenario tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Once};
use std::time::Duration;
use vega_core::{TracingConfig, TracingFormat};
use vega_models::BackendRegistry;
use vega_models::backend::{BackendError, BackendRequest, CompletionBackend, Role};
use vega_router::{ConversationStore, Exchange, ExchangeRecord, StoreError};

static TRACING: Once = Once::new();

/// Installs a compact subscriber once per test binary. `VEGA_LOG` sets the filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        TracingConfig::from_env()
            .with_format(TracingFormat::Compact)
            .init();
    });
}

/// What a scripted provider does on one call.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answers with this text.
    Text(String),
    /// Fails with a generic provider error carrying this message.
    Fail(String),
    /// Fails with a typed rate-limit error.
    RateLimited,
    /// Fails with a connection error.
    Network,
    /// Never answers within any realistic timeout.
    Hang,
}

impl Step {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }
}

/// Backend whose replies are scripted per provider.
///
/// Each provider consumes its own queue of steps; once the queue is empty the
/// default step applies. Every invocation is recorded.
#[derive(Debug)]
pub struct ScriptedBackend {
    default: Step,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn new(default: Step) -> Self {
        Self {
            default,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, provider: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .insert(provider.to_string(), steps.into());
        self
    }

    /// Wraps the backend as the catch-all of a fresh registry.
    pub fn into_registry(self) -> (Arc<Self>, BackendRegistry) {
        let backend = Arc::new(self);
        let registry = BackendRegistry::new().with_fallback(Arc::clone(&backend));
        (backend, registry)
    }

    pub fn calls(&self) -> Vec<BackendRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn providers_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|call| call.provider.clone())
            .collect()
    }

    fn next_step(&self, provider: &str) -> Step {
        self.scripts
            .lock()
            .get_mut(provider)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default.clone())
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError> {
        let step = self.next_step(&request.provider);
        self.calls.lock().push(request);

        match step {
            Step::Text(text) => Ok(text),
            Step::Fail(message) => Err(BackendError::provider(message)),
            Step::RateLimited => Err(BackendError::RateLimited { retry_after: None }),
            Step::Network => Err(BackendError::Connection("connection reset by peer".into())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
        }
    }
}

/// Conversation store kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: Mutex<HashMap<String, Vec<ExchangeRecord>>>,
}

impl InMemoryStore {
    pub fn records(&self, session: &str) -> Vec<ExchangeRecord> {
        self.sessions
            .lock()
            .get(session)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn history(&self, session: &str) -> Result<Vec<Exchange>, StoreError> {
        let mut exchanges: Vec<Exchange> = Vec::new();
        for record in self.records(session) {
            match record.role {
                Role::Assistant => match exchanges.last_mut() {
                    Some(last) if last.response.is_none() => last.response = Some(record.content),
                    _ => exchanges.push(Exchange::new("", Some(record.content))),
                },
                Role::User | Role::System => exchanges.push(Exchange::new(record.content, None)),
            }
        }
        Ok(exchanges)
    }

    async fn record(&self, session: &str, record: ExchangeRecord) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .entry(session.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}
