//! The notification emitted after a plan changes status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use aura_db::models::{AnnualPlan, PlanStatus};

use super::PlanAction;

/// Body of the workflow webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEvent {
    pub event: &'static str,
    pub plan_id: Uuid,
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub status: PlanStatus,
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl PlanEvent {
    pub fn new(action: PlanAction, plan: &AnnualPlan, actor_id: Uuid) -> Self {
        Self {
            event: action.event_name(),
            plan_id: plan.id,
            school_id: plan.school_id,
            class_id: plan.class_id,
            teacher_id: plan.teacher_id,
            title: plan.title.clone(),
            status: plan.status,
            actor_id,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives plan events. Implementations never fail: the return value says
/// whether the event was delivered.
#[async_trait]
pub trait PlanNotifier: Send + Sync {
    async fn notify(&self, event: &PlanEvent) -> bool;
}

/// A notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disabled;

#[async_trait]
impl PlanNotifier for Disabled {
    async fn notify(&self, event: &PlanEvent) -> bool {
        tracing::debug!(event = event.event, plan_id = %event.plan_id, "workflow webhook disabled");
        false
    }
}
