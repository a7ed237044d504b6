//! # Retry Logic and Backoff
//!
//! Delivers one pending operation with bounded retries and exponential
//! backoff. Attempt bookkeeping is persisted before every remote call, so a
//! crash mid-retry resumes with the correct attempt count and spacing.
//!
//! ## Features
//!
//! - **Exponential Backoff**: `min(base * 2^(n-2), max)` before attempt `n >= 2`
//! - **Jitter**: uniform ±25% around the base delay
//! - **Fail Fast**: permanent remote failures stop retrying immediately
//! - **In-Flight Claim**: the same operation is never delivered twice concurrently
//! - **Connectivity Gate**: no attempt is made while offline; the operation is
//!   deferred with its attempt budget untouched
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasksync::client::offline::retry::{RetryEngine, RetryPolicy};
//! use tasksync::shared::RetrySettings;
//!
//! let policy = RetryPolicy::from(&RetrySettings::default());
//! assert_eq!(policy.base_delay_for(3).as_millis(), 2000);
//! ```

use crate::client::local_db::LocalDatabase;
use crate::client::sync::adapters::{SyncAdapters, SyncOutcome};
use crate::client::sync::network_monitor::NetworkMonitor;
use crate::shared::config::RetrySettings;
use crate::shared::error::StorageError;
use crate::shared::operation::{now_micros, PendingOperation};
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Maximum relative deviation applied by jitter
const JITTER_FACTOR: f64 = 0.25;

/// Bounded exponential backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay before attempt `attempt` (1-indexed).
    ///
    /// Attempt 1 fires immediately; attempt 2 waits `base_delay`, and every
    /// following attempt doubles it up to `max_delay`.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        let factor = 1u32 << exponent;
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before attempt `attempt`, jittered when the policy asks for it
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range((1.0 - JITTER_FACTOR)..=(1.0 + JITTER_FACTOR));
        delay.mul_f64(factor)
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// Source of backoff waits; tests substitute one that records instead of sleeping
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How one `process_operation` call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The remote confirmed the change
    Delivered { canonical_id: Option<String> },
    /// Every attempt failed with a retryable error; now flagged for manual resolution
    Exhausted { last_error: String },
    /// The remote refused the change for good; flagged for manual resolution
    Rejected { reason: String },
    /// Flagged already, or being delivered by someone else
    Skipped,
    /// The network went down before the next attempt; left queued and unflagged
    Deferred,
}

/// Drives delivery attempts for single operations
#[derive(Debug)]
pub struct RetryEngine {
    db: Arc<LocalDatabase>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    network: Arc<NetworkMonitor>,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Releases an in-flight claim on drop
struct InFlightClaim<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.id);
    }
}

impl RetryEngine {
    pub fn new(db: Arc<LocalDatabase>, policy: RetryPolicy, network: Arc<NetworkMonitor>) -> Self {
        Self::with_sleeper(db, policy, network, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(
        db: Arc<LocalDatabase>,
        policy: RetryPolicy,
        network: Arc<NetworkMonitor>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            db,
            policy,
            sleeper,
            network,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn claim(&self, id: Uuid) -> Option<InFlightClaim<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.insert(id).then_some(InFlightClaim {
            in_flight: &self.in_flight,
            id,
        })
    }

    /// Whether `id` is currently being delivered
    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&id)
    }

    /// Time still to wait before the next attempt of an operation carried over
    /// from an earlier pass or process
    fn remaining_backoff(&self, op: &PendingOperation, attempt: u32) -> Duration {
        let delay = self.policy.delay_for(attempt);
        let Some(last_attempt) = op.last_attempt else {
            return Duration::ZERO;
        };
        let elapsed = (now_micros() - last_attempt).to_std().unwrap_or(Duration::ZERO);
        delay.saturating_sub(elapsed)
    }

    /// Deliver `op` through `adapters` until success, permanent failure or exhaustion.
    ///
    /// Connectivity is checked before every attempt. Going offline ends the
    /// call with [`DeliveryOutcome::Deferred`] and leaves the attempt count as is.
    ///
    /// `attempts`, `last_attempt` and `last_error` are persisted around every
    /// attempt. The operation is never removed here; that is the caller's job
    /// once it sees [`DeliveryOutcome::Delivered`].
    pub async fn process_operation(
        &self,
        op: &mut PendingOperation,
        adapters: &SyncAdapters,
    ) -> Result<DeliveryOutcome, StorageError> {
        if op.requires_resolution {
            return Ok(DeliveryOutcome::Skipped);
        }
        let Some(_claim) = self.claim(op.id) else {
            tracing::debug!(op_id = %op.id, "Operation already in flight, skipping");
            return Ok(DeliveryOutcome::Skipped);
        };

        let mut first_in_call = true;
        while !self.policy.is_exhausted(op.attempts) {
            let attempt = op.attempts + 1;
            let delay = if first_in_call {
                self.remaining_backoff(op, attempt)
            } else {
                self.policy.delay_for(attempt)
            };
            first_in_call = false;

            if !delay.is_zero() {
                tracing::debug!(
                    op_id = %op.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
                self.sleeper.sleep(delay).await;
            }

            if !self.network.is_online() {
                tracing::info!(op_id = %op.id, attempts = op.attempts, "Offline, deferring delivery");
                return Ok(DeliveryOutcome::Deferred);
            }

            op.attempts = attempt;
            op.last_attempt = Some(now_micros());
            self.db.update_pending_operation(op).await?;

            match adapters.sync_change(op).await {
                SyncOutcome::Success { canonical_id } => {
                    tracing::debug!(
                        op_id = %op.id,
                        entity_type = %op.entity_type(),
                        operation = %op.operation,
                        attempt,
                        "Operation delivered"
                    );
                    return Ok(DeliveryOutcome::Delivered { canonical_id });
                }
                SyncOutcome::RetryableFailure(reason) => {
                    tracing::warn!(
                        op_id = %op.id,
                        entity_type = %op.entity_type(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %reason,
                        "Delivery attempt failed"
                    );
                    op.last_error = Some(reason);
                    self.db.update_pending_operation(op).await?;
                }
                SyncOutcome::PermanentFailure(reason) => {
                    tracing::error!(
                        op_id = %op.id,
                        entity_type = %op.entity_type(),
                        attempt,
                        error = %reason,
                        "Remote rejected operation, requires manual resolution"
                    );
                    op.last_error = Some(reason.clone());
                    op.requires_resolution = true;
                    self.db.update_pending_operation(op).await?;
                    return Ok(DeliveryOutcome::Rejected { reason });
                }
            }
        }

        let last_error = op.last_error.clone().unwrap_or_else(|| "retry limit reached".to_string());
        tracing::error!(
            op_id = %op.id,
            entity_type = %op.entity_type(),
            attempts = op.attempts,
            error = %last_error,
            "Retries exhausted, requires manual resolution"
        );
        op.requires_resolution = true;
        self.db.update_pending_operation(op).await?;
        Ok(DeliveryOutcome::Exhausted { last_error })
    }
}
