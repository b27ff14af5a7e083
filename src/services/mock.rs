//! Scripted fakes of the three capabilities.
//!
//! Each fake records every request, counts calls, and takes its behavior from a queue of
//! [`MockMode`]s (falling back to a default mode once the queue is drained).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::ServiceError;
use super::types::{CompletionRequest, RerankRequest, RerankResult, SearchHit, SearchRequest};
use super::{CompletionService, RerankService, SearchService};

#[derive(Debug, Clone, PartialEq)]
/// Behavior of a single fake call.
pub enum MockMode {
    /// Return the configured payload.
    Succeed,
    /// Return a transport error with this message.
    Fail(String),
    /// Never complete (only a timeout ends the call).
    Hang,
    /// Succeed after sleeping this long.
    Delay(Duration),
}

struct Script<R> {
    calls: AtomicUsize,
    requests: Mutex<Vec<R>>,
    queued: Mutex<VecDeque<MockMode>>,
    default_mode: Mutex<MockMode>,
}

impl<R: Clone> Script<R> {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            queued: Mutex::new(VecDeque::new()),
            default_mode: Mutex::new(MockMode::Succeed),
        }
    }

    fn record(&self, request: &R) -> MockMode {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        self.queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_mode.lock().clone())
    }

    async fn play(&self, service: &'static str, mode: MockMode) -> Result<(), ServiceError> {
        match mode {
            MockMode::Succeed => Ok(()),
            MockMode::Fail(message) => Err(ServiceError::Transport { service, message }),
            MockMode::Hang => std::future::pending().await,
            MockMode::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

macro_rules! script_accessors {
    ($request:ty) => {
        /// Number of calls received so far.
        pub fn call_count(&self) -> usize {
            self.script.calls.load(Ordering::SeqCst)
        }

        /// All requests received so far.
        pub fn requests(&self) -> Vec<$request> {
            self.script.requests.lock().clone()
        }

        /// Most recent request, if any.
        pub fn last_request(&self) -> Option<$request> {
            self.script.requests.lock().last().cloned()
        }

        /// Queues a behavior for the next unscripted call.
        pub fn push_mode(&self, mode: MockMode) {
            self.script.queued.lock().push_back(mode);
        }

        /// Sets the behavior used once the queue is empty.
        pub fn set_default_mode(&self, mode: MockMode) {
            *self.script.default_mode.lock() = mode;
        }
    };
}

/// Search fake returning a fixed hit list.
pub struct MockSearchService {
    script: Script<SearchRequest>,
    hits: Mutex<Vec<SearchHit>>,
}

impl MockSearchService {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            script: Script::new(),
            hits: Mutex::new(hits),
        }
    }

    pub fn failing(message: &str) -> Self {
        let mock = Self::new(Vec::new());
        mock.set_default_mode(MockMode::Fail(message.to_string()));
        mock
    }

    pub fn hanging() -> Self {
        let mock = Self::new(Vec::new());
        mock.set_default_mode(MockMode::Hang);
        mock
    }

    pub fn set_hits(&self, hits: Vec<SearchHit>) {
        *self.hits.lock() = hits;
    }

    script_accessors!(SearchRequest);
}

#[async_trait]
impl SearchService for MockSearchService {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        let mode = self.script.record(request);
        self.script.play("search", mode).await?;
        let mut hits = self.hits.lock().clone();
        hits.truncate(request.top_k);
        Ok(hits)
    }
}

/// Rerank fake scoring documents from a fixed id -> score table (unknown ids score `0.0`).
pub struct MockRerankService {
    script: Script<RerankRequest>,
    scores: Mutex<HashMap<String, f32>>,
}

impl MockRerankService {
    pub fn new<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            script: Script::new(),
            scores: Mutex::new(scores.into_iter().map(|(id, s)| (id.into(), s)).collect()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let mock = Self::new(Vec::<(String, f32)>::new());
        mock.set_default_mode(MockMode::Fail(message.to_string()));
        mock
    }

    pub fn hanging() -> Self {
        let mock = Self::new(Vec::<(String, f32)>::new());
        mock.set_default_mode(MockMode::Hang);
        mock
    }

    script_accessors!(RerankRequest);
}

#[async_trait]
impl RerankService for MockRerankService {
    async fn rerank(&self, request: &RerankRequest) -> Result<Vec<RerankResult>, ServiceError> {
        let mode = self.script.record(request);
        self.script.play("rerank", mode).await?;
        let scores = self.scores.lock();
        Ok(request
            .documents
            .iter()
            .map(|doc| RerankResult {
                id: doc.id.clone(),
                relevance_score: scores.get(&doc.id).copied().unwrap_or(0.0),
            })
            .collect())
    }
}

/// Completion fake returning fixed text.
pub struct MockCompletionService {
    script: Script<CompletionRequest>,
    text: Mutex<String>,
}

impl MockCompletionService {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            script: Script::new(),
            text: Mutex::new(text.into()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let mock = Self::new(String::new());
        mock.set_default_mode(MockMode::Fail(message.to_string()));
        mock
    }

    script_accessors!(CompletionRequest);
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let mode = self.script.record(request);
        self.script.play("completion", mode).await?;
        Ok(self.text.lock().clone())
    }
}
