//! Sliding-window request budget per client.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Map size above which idle clients are swept on insert.
const SWEEP_THRESHOLD: usize = 4_096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExceeded {
    /// Time until the oldest counted request leaves the window.
    pub retry_after: Duration,
}

/// Allows at most `limit` requests per client within any `window`.
#[derive(Debug)]
pub struct RequestBudget {
    limit: u32,
    window: Duration,
    clients: Mutex<HashMap<u64, VecDeque<Instant>>>,
}

impl RequestBudget {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Counts a request for `client` if it fits in the budget.
    pub fn check(&self, client: u64) -> Result<(), BudgetExceeded> {
        let now = Instant::now();
        let mut clients = self.clients.lock();

        if clients.len() > SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, hits| {
                hits.back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
        }

        let hits = clients.entry(client).or_default();
        while hits
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.limit as usize {
            let oldest = hits.front().copied().unwrap_or(now);
            return Err(BudgetExceeded {
                retry_after: self
                    .window
                    .saturating_sub(now.saturating_duration_since(oldest)),
            });
        }

        hits.push_back(now);
        Ok(())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}
