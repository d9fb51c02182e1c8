use crate::model::{ProfessorId, ProjectId, ProjectStatus, StudentId, TermId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("there is no active term")]
    NoActiveTerm,

    #[error("term {0} not found")]
    TermNotFound(TermId),

    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    #[error("professor {0} not found")]
    ProfessorNotFound(ProfessorId),

    #[error("project {project} has already been processed (status {status})")]
    AlreadyProcessed {
        project: ProjectId,
        status: ProjectStatus,
    },

    #[error("project capacity for major {major} is exhausted or undefined")]
    CapacityExceeded { major: String },

    #[error("capacity for major {major} cannot drop to {requested}, {current} projects are approved")]
    CapacityBelowCount {
        major: String,
        current: u32,
        requested: u32,
    },

    #[error("no eligible supervisors")]
    NoEligibleSupervisors,

    #[error("at least two faculty members are needed to assign examiners, found {0}")]
    InsufficientFaculty(usize),

    #[error("project {project} cannot move from {from} to {to}")]
    InvalidTransition {
        project: ProjectId,
        from: ProjectStatus,
        to: ProjectStatus,
    },

    #[error("student {student} already has project {project} open in this term")]
    DuplicateRequest {
        student: StudentId,
        project: ProjectId,
    },

    #[error("professor {professor} is not the {role} of project {project}")]
    WrongRole {
        professor: ProfessorId,
        project: ProjectId,
        role: &'static str,
    },

    #[error("project {project} has no proposed topic #{index}")]
    UnknownTopic { project: ProjectId, index: usize },

    #[error("invalid time window {0}")]
    InvalidWindow(String),

    #[error("grade {0} is outside of the 0-20 range")]
    InvalidGrade(f64),

    #[error("unknown project status {0}")]
    UnknownStatus(String),

    #[error("unknown processing order {0}")]
    UnknownOrder(String),

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

pub type Result<T, E = PlanError> = std::result::Result<T, E>;
