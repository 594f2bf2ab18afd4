use crate::session::{ConfirmationOutcome, ConfirmationRejection, ConfirmationSession, SessionState};
use fence_config::ConfirmationPolicy;
use fence_core::{EpochMillis, LocationSample, SessionId, SessionKey};
use fence_integrity::SecurityAnalysis;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub session_id: SessionId,
    pub state: SessionState,
    pub confirmations: usize,
    pub remaining: usize,
}

struct SessionSlot {
    created_at_ms: EpochMillis,
    session: Arc<Mutex<ConfirmationSession>>,
}

/// Keyed confirmation sessions.
///
/// The map lock is only held to find or create a slot. Each session has its
/// own lock, so two keys never wait on each other while a sample is checked,
/// and two samples for the same key are applied one after the other.
pub struct SessionStore {
    policy: ConfirmationPolicy,
    sessions: Mutex<HashMap<SessionKey, SessionSlot>>,
}

impl SessionStore {
    pub fn new(policy: ConfirmationPolicy) -> Self {
        Self {
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }

    /// Feeds one sample into the session for `key`, creating it on first use.
    /// Finished or expired sessions are dropped so the next call starts over.
    pub fn advance(
        &self,
        key: SessionKey,
        sample: LocationSample,
        analysis: SecurityAnalysis,
        now_ms: EpochMillis,
        salt: &str,
    ) -> Result<ConfirmationOutcome, ConfirmationRejection> {
        let session = {
            let mut sessions = self.sessions.lock();
            self.sweep_expired(&mut sessions, now_ms);
            let slot = sessions.entry(key).or_insert_with(|| {
                let session = ConfirmationSession::new(key, now_ms);
                tracing::info!(
                    session_id = %session.id(),
                    key = %key,
                    "confirmation session started"
                );
                SessionSlot {
                    created_at_ms: now_ms,
                    session: Arc::new(Mutex::new(session)),
                }
            });
            Arc::clone(&slot.session)
        };

        let (result, finished) = {
            let mut guard = session.lock();
            let result = guard.add_confirmation(sample, analysis, now_ms, &self.policy, salt);
            (result, guard.state() != SessionState::Collecting)
        };

        if let Err(rejection) = &result {
            tracing::info!(
                key = %key,
                reason = rejection.reason_code(),
                error = %rejection,
                "confirmation rejected"
            );
        }

        if finished {
            let mut sessions = self.sessions.lock();
            if sessions
                .get(&key)
                .is_some_and(|slot| Arc::ptr_eq(&slot.session, &session))
            {
                sessions.remove(&key);
            }
        }

        result
    }

    /// Discards the session for `key`. Returns whether one existed.
    pub fn reset(&self, key: SessionKey) -> bool {
        let removed = self.sessions.lock().remove(&key).is_some();
        if removed {
            tracing::info!(key = %key, "confirmation session reset");
        }
        removed
    }

    pub fn progress(&self, key: SessionKey, now_ms: EpochMillis) -> Option<SessionProgress> {
        let session = {
            let sessions = self.sessions.lock();
            let slot = sessions.get(&key)?;
            if self.slot_expired(slot, now_ms) {
                return None;
            }
            Arc::clone(&slot.session)
        };
        let guard = session.lock();
        let confirmations = guard.confirmations().len();
        Some(SessionProgress {
            session_id: guard.id(),
            state: guard.state(),
            confirmations,
            remaining: self.policy.required_confirmations.saturating_sub(confirmations),
        })
    }

    pub fn active_sessions(&self, now_ms: EpochMillis) -> usize {
        let mut sessions = self.sessions.lock();
        self.sweep_expired(&mut sessions, now_ms);
        sessions.len()
    }

    fn slot_expired(&self, slot: &SessionSlot, now_ms: EpochMillis) -> bool {
        now_ms.saturating_sub(slot.created_at_ms) > self.policy.session_ttl_ms()
    }

    fn sweep_expired(&self, sessions: &mut HashMap<SessionKey, SessionSlot>, now_ms: EpochMillis) {
        let before = sessions.len();
        sessions.retain(|_, slot| !self.slot_expired(slot, now_ms));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "expired confirmation sessions removed");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(ConfirmationPolicy::default())
    }
}
