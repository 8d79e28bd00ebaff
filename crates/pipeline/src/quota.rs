//! Per-user consumable points with a fixed refill window.

use std::sync::Arc;

use chrono::Utc;
use mu2mi_core::error::CoreError;
use mu2mi_core::quota::{QuotaPolicy, QuotaState};
use mu2mi_db::Store;

use crate::error::PipelineError;

pub struct QuotaLedger {
    store: Arc<dyn Store>,
    policy: QuotaPolicy,
    enabled: bool,
}

impl QuotaLedger {
    pub fn new(store: Arc<dyn Store>, policy: QuotaPolicy, enabled: bool) -> Self {
        Self {
            store,
            policy,
            enabled,
        }
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Consume one point and report the state after consumption.
    ///
    /// Never rejects. Store failures propagate; there is no fallback to
    /// unlimited.
    pub async fn penalize(&self, user_id: &str) -> Result<QuotaState, PipelineError> {
        if !self.enabled {
            return Ok(self.policy.fresh());
        }

        let counter = self
            .store
            .consume_point(&QuotaPolicy::key_for(user_id), self.policy.window)
            .await?;
        Ok(self
            .policy
            .state_from(counter.points, counter.ms_until_expiry(Utc::now())))
    }

    /// Consume one point, rejecting the call that leaves no points available.
    ///
    /// The rejected call's point stays recorded.
    pub async fn charge(&self, user_id: &str) -> Result<QuotaState, PipelineError> {
        let state = self.penalize(user_id).await?;
        if self.enabled && self.policy.is_exceeded(state.consumed_points) {
            tracing::info!(
                user_id,
                consumed = state.consumed_points,
                ms_before_next_refill = state.ms_before_next_refill,
                "Quota exceeded",
            );
            return Err(CoreError::QuotaExceeded {
                ms_before_next_refill: state.ms_before_next_refill,
            }
            .into());
        }
        Ok(state)
    }

    /// Current state without consuming. Never creates a record.
    pub async fn peek(&self, user_id: &str) -> Result<QuotaState, PipelineError> {
        if !self.enabled {
            return Ok(self.policy.fresh());
        }

        let counter = self
            .store
            .find_counter(&QuotaPolicy::key_for(user_id))
            .await?;
        Ok(match counter {
            Some(counter) => self
                .policy
                .state_from(counter.points, counter.ms_until_expiry(Utc::now())),
            None => self.policy.fresh(),
        })
    }
}
