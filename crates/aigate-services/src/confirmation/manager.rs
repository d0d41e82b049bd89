//! Confirmation manager
//!
//! Stores pending confirmations in the shared store and consumes them at most
//! once. Several callers may load the same record concurrently; only the one
//! whose delete actually removes the key gets a decision, the others answer
//! `CONFIRMATION_NOT_FOUND`.

use aigate_core::clock::{duration_secs, Clock, SystemClock};
use aigate_core::config::ConfirmationConfig;
use aigate_core::error::{AppError, ErrorCode, ErrorMetadata};
use aigate_core::models::{
    ConfirmAction, ConfirmationResult, Operation, PendingConfirmation, RiskLevel,
};
use aigate_storage::{store_ttl, EphemeralStore, KeyLayout, StoreError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tracing target for confirmation decisions
pub const AUDIT_TARGET: &str = "aigate::audit";

const CONFIRM_ID_PREFIX: &str = "confirm_";

pub struct ConfirmationManager {
    store: Arc<dyn EphemeralStore>,
    keys: KeyLayout,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ConfirmationManager {
    pub fn new(store: Arc<dyn EphemeralStore>, config: &ConfirmationConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn EphemeralStore>,
        config: &ConfirmationConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            keys: KeyLayout::new(config.redis_prefix.clone()),
            ttl: config.ttl,
            clock,
        }
    }

    /// Persist a fresh confirmation for `operation`.
    ///
    /// Never deduplicates: every call mints a new `confirm_id`.
    #[tracing::instrument(skip(self, summary, operation, check_result), fields(op_type = %operation.op_type))]
    pub async fn create(
        &self,
        session_id: &str,
        user_id: i64,
        risk_level: RiskLevel,
        summary: &str,
        operation: Operation,
        check_result: Option<Value>,
    ) -> Result<PendingConfirmation, AppError> {
        operation.validate()?;

        let now = self.clock.now_secs();
        let record = PendingConfirmation {
            confirm_id: format!("{}{}", CONFIRM_ID_PREFIX, Uuid::new_v4()),
            session_id: session_id.to_string(),
            user_id,
            risk_level,
            summary: summary.to_string(),
            operation,
            check_result,
            created_at: now,
            expires_at: now.saturating_add(duration_secs(self.ttl)),
        };

        let payload = serde_json::to_string(&record)?;
        self.store
            .set(
                &self.keys.confirmation(&record.confirm_id),
                payload,
                store_ttl(self.ttl),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    confirm_id = %record.confirm_id,
                    "Failed to store pending confirmation"
                );
                AppError::Store(format!("failed to store confirmation: {}", e))
            })?;

        tracing::info!(
            confirm_id = %record.confirm_id,
            session_id = %record.session_id,
            user_id = record.user_id,
            risk_level = ?record.risk_level,
            tool_name = %record.operation.tool_name,
            expires_at = record.expires_at,
            "Pending confirmation created"
        );

        Ok(record)
    }

    /// Load a confirmation, deleting it if it outlived its expiry.
    pub async fn get(&self, confirm_id: &str) -> Result<PendingConfirmation, AppError> {
        let key = self.keys.confirmation(confirm_id);
        let payload = match self.store.get(&key).await {
            Ok(payload) => payload,
            Err(StoreError::NotFound(_)) => {
                return Err(AppError::ConfirmationNotFound(confirm_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let record: PendingConfirmation = serde_json::from_str(&payload)?;

        if record.is_expired_at(self.clock.now_secs()) {
            if let Err(e) = self.store.del(&key).await {
                tracing::warn!(error = %e, confirm_id = %confirm_id, "Failed to delete expired confirmation");
            }
            tracing::info!(
                confirm_id = %confirm_id,
                expires_at = record.expires_at,
                "Confirmation expired"
            );
            return Err(AppError::ConfirmationExpired(confirm_id.to_string()));
        }

        Ok(record)
    }

    /// Check ownership and apply the user's decision.
    ///
    /// Protocol outcomes come back as a non-success `ConfirmationResult`;
    /// only store and decoding failures surface as `Err`.
    #[tracing::instrument(skip(self))]
    pub async fn validate_and_consume(
        &self,
        confirm_id: &str,
        caller_user: i64,
        action: &str,
    ) -> Result<ConfirmationResult, AppError> {
        let record = match self.get(confirm_id).await {
            Ok(record) => record,
            Err(e @ (AppError::ConfirmationNotFound(_) | AppError::ConfirmationExpired(_))) => {
                return Ok(ConfirmationResult::failed(e.error_code()))
            }
            Err(e) => return Err(e),
        };

        if !record.is_owned_by(caller_user) {
            tracing::warn!(
                target: AUDIT_TARGET,
                confirm_id = %confirm_id,
                owner = record.user_id,
                caller = caller_user,
                decision = "denied",
                "Confirmation decision by non-owner refused"
            );
            return Ok(ConfirmationResult::failed(ErrorCode::PermissionDenied));
        }

        let Some(decision) = ConfirmAction::parse(action) else {
            tracing::debug!(confirm_id = %confirm_id, action = %action, "Unknown confirmation action");
            return Ok(ConfirmationResult::failed_with(
                AppError::InvalidRequest(format!("Unknown confirmation action: {}", action))
                    .to_structured(),
            ));
        };

        // Consume before answering so a replay cannot observe the record
        let consumed = self
            .store
            .del(&self.keys.confirmation(confirm_id))
            .await
            .map_err(|e| AppError::Store(format!("failed to consume confirmation: {}", e)))?;
        if !consumed {
            tracing::debug!(confirm_id = %confirm_id, "Confirmation consumed by a concurrent caller");
            return Ok(ConfirmationResult::failed(ErrorCode::ConfirmationNotFound));
        }

        match decision {
            ConfirmAction::Reject => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    confirm_id = %confirm_id,
                    session_id = %record.session_id,
                    user_id = caller_user,
                    tool_name = %record.operation.tool_name,
                    decision = "rejected",
                    "Confirmation rejected"
                );
                Ok(ConfirmationResult::failed(ErrorCode::RiskRejected))
            }
            ConfirmAction::Approve => {
                tracing::info!(
                    target: AUDIT_TARGET,
                    confirm_id = %confirm_id,
                    session_id = %record.session_id,
                    user_id = caller_user,
                    tool_name = %record.operation.tool_name,
                    decision = "approved",
                    "Confirmation approved"
                );
                Ok(ConfirmationResult::approved(record.operation))
            }
        }
    }

    /// Remove a confirmation. Deleting a missing id succeeds.
    pub async fn delete(&self, confirm_id: &str) -> Result<(), AppError> {
        match self.store.del(&self.keys.confirmation(confirm_id)).await {
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
