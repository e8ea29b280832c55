//! Bounded polling for state that becomes visible eventually.
//!
//! Episode ingestion on the memory server is asynchronous: a successful
//! `add_memory` call only queues the episode. Callers poll the graph until the
//! write is observable or the attempt budget runs out.

use std::time::Duration;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Attempt budget and spacing for [`poll_until`].
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Result<Self> {
        if attempts == 0 {
            bail!("poll attempts must be greater than 0");
        }
        Ok(Self { attempts, interval })
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts, .. } | PollOutcome::Exhausted { attempts } => *attempts,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            PollOutcome::Ready { value, .. } => Some(value),
            PollOutcome::Exhausted { .. } => None,
        }
    }
}

/// Sleeps the calling thread; the production sleeper for [`poll_until`].
pub fn thread_sleeper(duration: Duration) {
    std::thread::sleep(duration);
}

/// Calls `probe` until it yields a value, an error, or the budget is spent.
///
/// `probe` receives the 1-based attempt number. No sleep happens after the
/// final attempt.
pub fn poll_until<T, S, P>(
    policy: PollPolicy,
    mut sleeper: S,
    mut probe: P,
) -> Result<PollOutcome<T>>
where
    S: FnMut(Duration),
    P: FnMut(u32) -> Result<Option<T>>,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(value) = probe(attempt)? {
            return Ok(PollOutcome::Ready {
                value,
                attempts: attempt,
            });
        }
        tracing::debug!(attempt, budget = attempts, "poll target not ready");
        if attempt < attempts {
            sleeper(policy.interval);
        }
    }
    Ok(PollOutcome::Exhausted { attempts })
}
