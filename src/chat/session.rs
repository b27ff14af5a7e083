//! Per-session clarification state.

use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::query::{ClarificationOption, ClarificationRequest, PriorContext, Query};

#[derive(Debug, Clone, PartialEq)]
/// An outstanding clarification and the validated query waiting on it.
pub struct PendingClarification {
    /// Lower-cased key of the ambiguous term.
    pub term_key: String,
    pub request: ClarificationRequest,
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq)]
/// A term the user disambiguated, with the expansion they chose.
pub struct ResolvedTerm {
    pub term_key: String,
    pub expansion: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// At most one clarification is outstanding.
    pub pending: Option<PendingClarification>,
    pub resolved: Vec<ResolvedTerm>,
}

impl SessionState {
    /// Context for a new message: every resolved term, plus the chosen expansions of those
    /// terms that occur among `tokens`.
    pub fn prior_context(&self, tokens: &[&str]) -> PriorContext {
        PriorContext {
            resolved_terms: self.resolved.iter().map(|r| r.term_key.clone()).collect(),
            chosen_expansions: self.expansions_for(tokens),
        }
    }

    /// Chosen expansions of resolved terms that occur among `tokens`.
    pub fn expansions_for(&self, tokens: &[&str]) -> Vec<String> {
        self.resolved
            .iter()
            .filter(|r| tokens.iter().any(|t| *t == r.term_key))
            .map(|r| r.expansion.clone())
            .collect()
    }

    fn record(&mut self, term_key: &str, option: &ClarificationOption) {
        match self.resolved.iter_mut().find(|r| r.term_key == term_key) {
            Some(existing) => existing.expansion = option.expansion.clone(),
            None => self.resolved.push(ResolvedTerm {
                term_key: term_key.to_string(),
                expansion: option.expansion.clone(),
            }),
        }
    }
}

/// TTL-bounded session states keyed by session id.
///
/// Updates are read-modify-write per session; concurrent turns of the same session race and
/// the last write wins.
pub struct SessionStore {
    sessions: Cache<String, SessionState>,
}

impl SessionStore {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Current state, or an empty one for unknown/expired sessions.
    pub fn get(&self, session_id: &str) -> SessionState {
        self.sessions.get(session_id).unwrap_or_default()
    }

    pub fn pending(&self, session_id: &str) -> Option<PendingClarification> {
        self.sessions.get(session_id).and_then(|s| s.pending)
    }

    /// Replaces any outstanding clarification.
    pub fn set_pending(&self, session_id: &str, pending: PendingClarification) {
        let mut state = self.get(session_id);
        if let Some(previous) = state.pending.replace(pending) {
            debug!(session_id, term = %previous.request.term, "Superseded pending clarification");
        }
        self.sessions.insert(session_id.to_string(), state);
    }

    /// Drops the outstanding clarification, if any. Returns whether one was dropped.
    pub fn clear_pending(&self, session_id: &str) -> bool {
        let Some(mut state) = self.sessions.get(session_id) else {
            return false;
        };
        let cleared = state.pending.take().is_some();
        if cleared {
            self.sessions.insert(session_id.to_string(), state);
        }
        cleared
    }

    /// Records the chosen option for `term_key` and clears the pending clarification.
    pub fn resolve(&self, session_id: &str, term_key: &str, option: &ClarificationOption) {
        let mut state = self.get(session_id);
        state.pending = None;
        state.record(term_key, option);
        self.sessions.insert(session_id.to_string(), state);
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions.invalidate(session_id);
    }

    /// Approximate until pending tasks run.
    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn run_pending_tasks(&self) {
        self.sessions.run_pending_tasks();
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.entry_count())
            .finish()
    }
}
