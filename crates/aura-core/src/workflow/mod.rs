//! Annual plan approval lifecycle.
//!
//! Enforces the review graph:
//!
//! ```text
//! draft   -> pending   (submit)
//! pending -> approved  (approve)
//! pending -> rejected  (reject, comment required)
//! ```
//!
//! Each transition is one conditional `UPDATE ... WHERE status = <from>`.
//! When it matches no row the plan is re-read to tell "not found" apart from
//! "wrong status". A transition that changed the row notifies the configured
//! [`PlanNotifier`].

pub mod event;

use std::fmt;
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use aura_db::models::{AnnualPlan, PlanStatus};
use aura_db::queries::plans as db;

pub use event::{Disabled, PlanEvent, PlanNotifier};

/// A review action requested by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Submit,
    Approve,
    Reject,
}

impl PlanAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// The status the action moves a plan out of.
    pub fn source(self) -> PlanStatus {
        match self {
            Self::Submit => PlanStatus::Draft,
            Self::Approve | Self::Reject => PlanStatus::Pending,
        }
    }

    /// The status the action moves a plan into.
    pub fn target(self) -> PlanStatus {
        match self {
            Self::Submit => PlanStatus::Pending,
            Self::Approve => PlanStatus::Approved,
            Self::Reject => PlanStatus::Rejected,
        }
    }

    /// Webhook event name emitted after the action succeeds.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Submit => "plan.submitted",
            Self::Approve => "plan.approved",
            Self::Reject => "plan.rejected",
        }
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("plan {0} not found")]
    NotFound(Uuid),

    #[error("cannot {action} a plan in status {from}")]
    InvalidTransition { from: PlanStatus, action: PlanAction },

    #[error("a reviewer comment is required to reject a plan")]
    MissingReviewerComment,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Result of a workflow action.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransitionOutcome {
    pub plan: AnnualPlan,
    /// False when the action was an idempotent no-op.
    pub changed: bool,
    /// Whether the webhook accepted the notification.
    pub workflow_triggered: bool,
}

/// Applies review actions to plans of one database.
#[derive(Clone)]
pub struct PlanWorkflow {
    pool: PgPool,
    notifier: Arc<dyn PlanNotifier>,
}

impl PlanWorkflow {
    pub fn new(pool: PgPool, notifier: Arc<dyn PlanNotifier>) -> Self {
        Self { pool, notifier }
    }

    /// Move a draft plan to `pending`.
    ///
    /// Submitting a plan that is already pending returns it unchanged and
    /// sends no notification.
    pub async fn submit(
        &self,
        school_id: Uuid,
        plan_id: Uuid,
        actor_id: Uuid,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let updated = db::mark_submitted(&self.pool, school_id, plan_id).await?;
        match updated {
            Some(plan) => Ok(self.changed(PlanAction::Submit, plan, actor_id).await),
            None => self.missed(school_id, plan_id, PlanAction::Submit).await,
        }
    }

    /// Approve a pending plan. The comment is optional.
    pub async fn approve(
        &self,
        school_id: Uuid,
        plan_id: Uuid,
        reviewer_id: Uuid,
        comment: Option<&str>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        let updated =
            db::mark_approved(&self.pool, school_id, plan_id, reviewer_id, comment).await?;
        match updated {
            Some(plan) => Ok(self.changed(PlanAction::Approve, plan, reviewer_id).await),
            None => self.missed(school_id, plan_id, PlanAction::Approve).await,
        }
    }

    /// Reject a pending plan. A non-blank comment is required.
    pub async fn reject(
        &self,
        school_id: Uuid,
        plan_id: Uuid,
        reviewer_id: Uuid,
        comment: &str,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(WorkflowError::MissingReviewerComment);
        }
        let updated =
            db::mark_rejected(&self.pool, school_id, plan_id, reviewer_id, comment).await?;
        match updated {
            Some(plan) => Ok(self.changed(PlanAction::Reject, plan, reviewer_id).await),
            None => self.missed(school_id, plan_id, PlanAction::Reject).await,
        }
    }

    async fn current(&self, school_id: Uuid, plan_id: Uuid) -> Result<AnnualPlan, WorkflowError> {
        db::get_plan(&self.pool, school_id, plan_id)
            .await?
            .ok_or(WorkflowError::NotFound(plan_id))
    }

    /// The conditional update matched no row. Re-read the plan to report why.
    ///
    /// Only submit is idempotent: a plan already sitting in its target status
    /// comes back unchanged.
    async fn missed(
        &self,
        school_id: Uuid,
        plan_id: Uuid,
        action: PlanAction,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let plan = self.current(school_id, plan_id).await?;
        if action == PlanAction::Submit && plan.status == action.target() {
            tracing::debug!(plan_id = %plan_id, "plan already pending; submit is a no-op");
            return Ok(TransitionOutcome {
                plan,
                changed: false,
                workflow_triggered: false,
            });
        }
        tracing::debug!(
            plan_id = %plan_id,
            from = %plan.status,
            expected = %action.source(),
            action = %action,
            "rejected plan transition"
        );
        Err(WorkflowError::InvalidTransition {
            from: plan.status,
            action,
        })
    }

    async fn changed(&self, action: PlanAction, plan: AnnualPlan, actor_id: Uuid) -> TransitionOutcome {
        tracing::info!(
            plan_id = %plan.id,
            school_id = %plan.school_id,
            action = %action,
            from = %action.source(),
            to = %action.target(),
            "plan transitioned"
        );
        let event = PlanEvent::new(action, &plan, actor_id);
        let workflow_triggered = self.notifier.notify(&event).await;
        TransitionOutcome {
            plan,
            changed: true,
            workflow_triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_follow_the_review_graph() {
        let edges: Vec<_> = [PlanAction::Submit, PlanAction::Approve, PlanAction::Reject]
            .into_iter()
            .map(|a| (a.source(), a.target()))
            .collect();
        assert_eq!(
            edges,
            [
                (PlanStatus::Draft, PlanStatus::Pending),
                (PlanStatus::Pending, PlanStatus::Approved),
                (PlanStatus::Pending, PlanStatus::Rejected),
            ]
        );
    }

    #[test]
    fn no_action_leaves_a_terminal_status() {
        for action in [PlanAction::Submit, PlanAction::Approve, PlanAction::Reject] {
            assert!(!matches!(
                action.source(),
                PlanStatus::Approved | PlanStatus::Rejected
            ));
            assert_ne!(action.source(), action.target(), "{action}");
        }
    }

    #[test]
    fn error_messages() {
        let err = WorkflowError::InvalidTransition {
            from: PlanStatus::Draft,
            action: PlanAction::Approve,
        };
        assert_eq!(err.to_string(), "cannot approve a plan in status draft");
        assert_eq!(
            WorkflowError::MissingReviewerComment.to_string(),
            "a reviewer comment is required to reject a plan"
        );
    }

    #[test]
    fn event_names() {
        assert_eq!(PlanAction::Submit.event_name(), "plan.submitted");
        assert_eq!(PlanAction::Approve.event_name(), "plan.approved");
        assert_eq!(PlanAction::Reject.event_name(), "plan.rejected");
    }
}
