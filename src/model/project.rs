use super::{ProfessorId, TermId, TimeKey, TimeWindow};
use crate::error::PlanError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct StudentId(pub i64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a project. Variants are declared in lifecycle order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Approved,
    SupervisorAssigned,
    TopicProposal,
    TopicApproved,
    InProgress,
    DefenseScheduled,
    Completed,
    Rejected,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 9] = [
        ProjectStatus::Pending,
        ProjectStatus::Approved,
        ProjectStatus::SupervisorAssigned,
        ProjectStatus::TopicProposal,
        ProjectStatus::TopicApproved,
        ProjectStatus::InProgress,
        ProjectStatus::DefenseScheduled,
        ProjectStatus::Completed,
        ProjectStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Approved => "approved",
            ProjectStatus::SupervisorAssigned => "supervisor_assigned",
            ProjectStatus::TopicProposal => "topic_proposal",
            ProjectStatus::TopicApproved => "topic_approved",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::DefenseScheduled => "defense_scheduled",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Rejected)
    }

    /// Transitions only ever move forward.
    pub fn can_advance_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Rejected)
                | (Approved, SupervisorAssigned)
                | (SupervisorAssigned, TopicProposal | TopicApproved)
                | (TopicProposal, TopicApproved)
                | (TopicApproved, InProgress)
                | (InProgress, DefenseScheduled)
                | (DefenseScheduled, Completed)
        )
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PlanError::UnknownStatus(s.to_owned()))
    }
}

/// A defense window offered by a committee member.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidateTime {
    pub window: TimeWindow,
    pub submitted_by: ProfessorId,
}

impl CandidateTime {
    pub fn key(&self) -> TimeKey {
        self.window.key()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub student: StudentId,
    pub term: TermId,
    pub major: String,
    pub status: ProjectStatus,
    pub supervisor: Option<ProfessorId>,
    pub examiner: Option<ProfessorId>,
    pub proposed_topics: Vec<String>,
    pub topic: Option<String>,
    /// Kept in submission order.
    pub proposed_defense_times: Vec<CandidateTime>,
    pub defense: Option<TimeWindow>,
    pub grade: Option<f64>,
    pub requested_at: NaiveDateTime,
    pub approved_at: Option<NaiveDateTime>,
}

impl Project {
    pub fn new(
        id: ProjectId,
        student: StudentId,
        term: TermId,
        major: impl Into<String>,
        requested_at: NaiveDateTime,
    ) -> Self {
        Project {
            id,
            student,
            term,
            major: major.into(),
            status: ProjectStatus::Pending,
            supervisor: None,
            examiner: None,
            proposed_topics: Vec::new(),
            topic: None,
            proposed_defense_times: Vec::new(),
            defense: None,
            grade: None,
            requested_at,
            approved_at: None,
        }
    }

    pub fn advance(&mut self, next: ProjectStatus) -> Result<(), PlanError> {
        if !self.status.can_advance_to(next) {
            return Err(PlanError::InvalidTransition {
                project: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_committee_member(&self, professor: ProfessorId) -> bool {
        self.supervisor == Some(professor) || self.examiner == Some(professor)
    }
}
