use crate::error::Result;
use crate::model::ProjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TermCreated,
    CapacitySet,
    ExaminerLimitSet,
    ProjectRequested,
    ProjectApproved,
    ProjectRejected,
    SupervisorAssigned,
    ExaminerAssigned,
    TopicProposed,
    TopicApproved,
    DefenseTimesSubmitted,
    DefenseScheduled,
    GradeSubmitted,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::TermCreated => "TERM_CREATED",
            AuditAction::CapacitySet => "CAPACITY_SET",
            AuditAction::ExaminerLimitSet => "EXAMINER_LIMIT_SET",
            AuditAction::ProjectRequested => "PROJECT_REQUESTED",
            AuditAction::ProjectApproved => "PROJECT_APPROVED",
            AuditAction::ProjectRejected => "PROJECT_REJECTED",
            AuditAction::SupervisorAssigned => "SUPERVISOR_ASSIGNED",
            AuditAction::ExaminerAssigned => "EXAMINER_ASSIGNED",
            AuditAction::TopicProposed => "TOPIC_PROPOSED",
            AuditAction::TopicApproved => "TOPIC_APPROVED",
            AuditAction::DefenseTimesSubmitted => "DEFENSE_TIMES_SUBMITTED",
            AuditAction::DefenseScheduled => "DEFENSE_SCHEDULED",
            AuditAction::GradeSubmitted => "GRADE_SUBMITTED",
        }
    }
}

/// The user on whose behalf an operation runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActorId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub actor: ActorId,
    pub target_project: Option<ProjectId>,
    pub target_user: Option<i64>,
    pub details: Value,
}

impl AuditEvent {
    pub fn new(action: AuditAction, actor: ActorId) -> Self {
        AuditEvent {
            action,
            actor,
            target_project: None,
            target_user: None,
            details: Value::Null,
        }
    }

    pub fn project(self, project: ProjectId) -> Self {
        AuditEvent {
            target_project: Some(project),
            ..self
        }
    }

    pub fn user(self, user: i64) -> Self {
        AuditEvent {
            target_user: Some(user),
            ..self
        }
    }

    pub fn details(self, details: Value) -> Self {
        AuditEvent { details, ..self }
    }
}

/// Where audit events go. Callers never let a failure here abort the
/// operation being audited.
#[allow(async_fn_in_trait)]
pub trait AuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<()>;
}

/// Emit audit events as log lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        info!(
            target: "audit",
            action = event.action.as_str(),
            actor = event.actor.0,
            project = ?event.target_project,
            user = ?event.target_user,
            details = %event.details,
            "Audit event",
        );
        Ok(())
    }
}
