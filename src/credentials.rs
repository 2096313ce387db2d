//! Credential pool management
//!
//! The pool owns the ordered set of API credentials, tracks per-credential
//! usage and failure metrics, decides availability, and rotates to the next
//! viable credential when the current one runs out of quota.
//!
//! Rotation and counter updates are a single critical section: concurrent
//! callers never observe a half-updated rotation index. Raw credential values
//! never leave the pool except inside [`CredentialHandle`] for issuing
//! requests; everything user-facing carries only a truncated SHA-256 hash.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use utoipa::ToSchema;

/// A borrowed credential for issuing one or more requests.
///
/// The `index` ties request outcomes back to the pool via
/// [`CredentialPool::record_outcome`].
#[derive(Clone, Debug)]
pub struct CredentialHandle {
    /// Position of this credential in the pool
    pub index: usize,
    /// The raw credential value. Never log this; use the pool's hashed
    /// summaries for display.
    pub key: String,
}

/// Per-credential metrics and the raw key
#[derive(Debug)]
struct CredentialState {
    key: String,
    key_hash: String,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    quota_exceeded_count: u64,
    daily_used: u64,
    last_used: Option<DateTime<Utc>>,
}

impl CredentialState {
    fn new(key: String) -> Self {
        let key_hash = truncated_hash(&key);
        Self {
            key,
            key_hash,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            quota_exceeded_count: 0,
            daily_used: 0,
            last_used: None,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    credentials: Vec<CredentialState>,
    current: usize,
    last_reset: NaiveDate,
}

/// Pool of API credentials with availability tracking and circular rotation
#[derive(Debug)]
pub struct CredentialPool {
    state: Mutex<PoolState>,
    daily_limit: u64,
}

impl CredentialPool {
    /// Maximum lifetime quota violations before a credential is parked
    const MAX_QUOTA_VIOLATIONS: u64 = 3;

    /// Failure-rate ceiling above which a credential is considered unhealthy
    const MAX_FAILURE_RATE: f64 = 0.5;

    /// Build a pool from an ordered, non-empty credential list.
    ///
    /// Duplicate keys are dropped (first occurrence wins). An empty list is a
    /// fatal configuration error: the system cannot reach the source at all.
    pub fn new(keys: &[String], daily_limit: u64) -> Result<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.trim();
            if !key.is_empty() && !unique.iter().any(|k| k == key) {
                unique.push(key.to_string());
            }
        }

        if unique.is_empty() {
            return Err(Error::Config {
                message: "no API credentials configured".to_string(),
                key: Some("credentials.api_keys".to_string()),
            });
        }

        tracing::info!(credentials = unique.len(), "Credential pool initialized");

        Ok(Self {
            state: Mutex::new(PoolState {
                credentials: unique.into_iter().map(CredentialState::new).collect(),
                current: 0,
                last_reset: Local::now().date_naive(),
            }),
            daily_limit,
        })
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.lock().credentials.len()
    }

    /// True when the pool holds no credentials (never, after construction)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The credential the pool currently points at, rotating first if it is
    /// no longer available.
    ///
    /// Returns [`Error::CredentialsExhausted`] when no credential in the pool
    /// is viable; that condition is fatal for the current call and must not
    /// be retried.
    pub fn current(&self) -> Result<CredentialHandle> {
        let mut state = self.lock();
        self.maybe_daily_reset(&mut state);

        if self.is_available(&state.credentials[state.current]) {
            return Ok(handle(&state));
        }

        self.rotate_locked(&mut state)
    }

    /// Advance to the next available credential.
    ///
    /// The pointer moves circularly, at most once past every credential. If a
    /// full cycle finds nothing available the pointer is restored to its
    /// pre-rotation value and [`Error::CredentialsExhausted`] is returned.
    pub fn rotate(&self) -> Result<CredentialHandle> {
        let mut state = self.lock();
        self.maybe_daily_reset(&mut state);
        self.rotate_locked(&mut state)
    }

    /// Record the outcome of one request attempt against a credential.
    ///
    /// Every attempt is recorded for observability; only failures and quota
    /// signals affect availability.
    pub fn record_outcome(&self, index: usize, success: bool, quota_error: bool) {
        let mut state = self.lock();
        let Some(credential) = state.credentials.get_mut(index) else {
            tracing::warn!(index, "record_outcome for unknown credential index");
            return;
        };

        credential.total_requests += 1;
        credential.daily_used += 1;
        credential.last_used = Some(Utc::now());

        if success {
            credential.successful_requests += 1;
        } else {
            credential.failed_requests += 1;
            if quota_error {
                credential.quota_exceeded_count += 1;
                tracing::warn!(
                    credential = %credential.key_hash,
                    quota_exceeded_count = credential.quota_exceeded_count,
                    "Quota signal recorded for credential"
                );
            }
        }
    }

    /// Summarize the pool for the status surface.
    ///
    /// Raw credential values are never included; each entry carries only the
    /// truncated SHA-256 hash of its key.
    pub fn status(&self) -> CredentialPoolStatus {
        let mut state = self.lock();
        self.maybe_daily_reset(&mut state);

        let current = state.current;
        let credentials: Vec<CredentialSummary> = state
            .credentials
            .iter()
            .enumerate()
            .map(|(index, c)| CredentialSummary {
                index,
                key_hash: c.key_hash.clone(),
                is_current: index == current,
                is_available: self.is_available(c),
                total_requests: c.total_requests,
                successful_requests: c.successful_requests,
                failed_requests: c.failed_requests,
                quota_exceeded_count: c.quota_exceeded_count,
                daily_used: c.daily_used,
                quota_remaining: self.daily_limit.saturating_sub(c.daily_used),
                last_used: c.last_used,
            })
            .collect();

        CredentialPoolStatus {
            total: credentials.len(),
            available: credentials.iter().filter(|c| c.is_available).count(),
            current_index: current,
            credentials,
        }
    }

    /// Display hash of the credential the pointer is currently on.
    pub fn current_display_hash(&self) -> String {
        let state = self.lock();
        state.credentials[state.current].key_hash.clone()
    }

    fn rotate_locked(&self, state: &mut PoolState) -> Result<CredentialHandle> {
        let original = state.current;
        let len = state.credentials.len();

        for _ in 0..len {
            state.current = (state.current + 1) % len;
            if self.is_available(&state.credentials[state.current]) {
                tracing::info!(index = state.current, "Rotated to credential");
                return Ok(handle(state));
            }
        }

        // Full cycle found nothing viable; leave the pointer where it was.
        state.current = original;
        tracing::error!("No available credentials found after full rotation cycle");
        Err(Error::CredentialsExhausted)
    }

    fn is_available(&self, credential: &CredentialState) -> bool {
        if credential.daily_used >= self.daily_limit {
            return false;
        }

        if credential.total_requests > 0 {
            let failure_rate =
                credential.failed_requests as f64 / credential.total_requests as f64;
            if failure_rate > Self::MAX_FAILURE_RATE {
                return false;
            }
        }

        credential.quota_exceeded_count <= Self::MAX_QUOTA_VIOLATIONS
    }

    /// Clear daily-scoped counters on the first access after a local-date
    /// rollover. Lifetime totals are kept for reporting.
    fn maybe_daily_reset(&self, state: &mut PoolState) {
        let today = Local::now().date_naive();
        if today > state.last_reset {
            for credential in &mut state.credentials {
                credential.daily_used = 0;
            }
            state.last_reset = today;
            tracing::info!(
                credentials = state.credentials.len(),
                "Daily credential usage counters reset"
            );
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // A poisoned pool mutex means a panic mid-update; the counters are
        // still structurally valid, so recover the guard and continue.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn set_last_reset(&self, date: NaiveDate) {
        self.lock().last_reset = date;
    }

    #[cfg(test)]
    fn current_index(&self) -> usize {
        self.lock().current
    }
}

fn handle(state: &PoolState) -> CredentialHandle {
    CredentialHandle {
        index: state.current,
        key: state.credentials[state.current].key.clone(),
    }
}

/// First 16 hex chars of the SHA-256 of a credential, for display.
fn truncated_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// Status summary for one credential (hashed, never the raw value)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialSummary {
    /// Position in the pool
    pub index: usize,
    /// Truncated SHA-256 hash of the credential for display
    pub key_hash: String,
    /// Whether the pool pointer is on this credential
    pub is_current: bool,
    /// Whether the availability predicate currently passes
    pub is_available: bool,
    /// Lifetime request count
    pub total_requests: u64,
    /// Lifetime successful request count
    pub successful_requests: u64,
    /// Lifetime failed request count
    pub failed_requests: u64,
    /// Lifetime quota-violation count
    pub quota_exceeded_count: u64,
    /// Requests charged against today's quota
    pub daily_used: u64,
    /// Requests remaining in today's quota
    pub quota_remaining: u64,
    /// When this credential last issued a request
    pub last_used: Option<DateTime<Utc>>,
}

/// Status summary for the whole pool
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialPoolStatus {
    /// Number of credentials in the pool
    pub total: usize,
    /// Number of credentials currently passing the availability predicate
    pub available: usize,
    /// Index of the current credential
    pub current_index: usize,
    /// Per-credential summaries
    pub credentials: Vec<CredentialSummary>,
}
