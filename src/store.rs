use crate::error::Result;
use crate::model::{
    Professor, ProfessorId, Project, ProjectId, ProjectStatus, StudentId, Term, TermId,
};

pub use self::memory::MemoryStore;
pub use self::sql::SqlStore;

mod memory;
mod sql;

/// Selection of projects. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct ProjectFilter {
    pub term: Option<TermId>,
    pub status: Option<ProjectStatus>,
    pub student: Option<StudentId>,
}

impl ProjectFilter {
    pub fn term(term: TermId) -> Self {
        ProjectFilter {
            term: Some(term),
            ..ProjectFilter::default()
        }
    }

    pub fn with_status(self, status: ProjectStatus) -> Self {
        ProjectFilter {
            status: Some(status),
            ..self
        }
    }

    pub fn with_student(self, student: StudentId) -> Self {
        ProjectFilter {
            student: Some(student),
            ..self
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        self.term.is_none_or(|t| project.term == t)
            && self.status.is_none_or(|s| project.status == s)
            && self.student.is_none_or(|s| project.student == s)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FacultyFilter {
    /// Only active and approved professors.
    pub eligible_only: bool,
}

impl FacultyFilter {
    pub fn eligible() -> Self {
        FacultyFilter {
            eligible_only: true,
        }
    }

    pub fn matches(&self, professor: &Professor) -> bool {
        !self.eligible_only || professor.is_eligible()
    }
}

/// Projects are returned by ascending id.
#[allow(async_fn_in_trait)]
pub trait ProjectRepository {
    async fn find_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>>;
    async fn project(&self, id: ProjectId) -> Result<Option<Project>>;
    async fn save_project(&self, project: &Project) -> Result<()>;
    /// Store a new project, ignoring its id, and return it with the
    /// id it was given.
    async fn insert_project(&self, project: Project) -> Result<Project>;
}

/// Professors are returned by ascending id.
#[allow(async_fn_in_trait)]
pub trait FacultyRepository {
    async fn find_faculty(&self, filter: &FacultyFilter) -> Result<Vec<Professor>>;
    async fn professor(&self, id: ProfessorId) -> Result<Option<Professor>>;
    async fn save_professor(&self, professor: &Professor) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait TermRepository {
    async fn active_term(&self) -> Result<Option<Term>>;
    async fn term(&self, id: TermId) -> Result<Option<Term>>;
    /// Persist name, active flag and capacity ceilings. Approved counts
    /// only ever change through `try_reserve`. Activating a term
    /// deactivates every other one.
    async fn save_term(&self, term: &Term) -> Result<()>;
    /// Same as `save_term` for a new term, returning it with its id.
    async fn insert_term(&self, term: Term) -> Result<Term>;
    /// Atomically take one seat of `major` in `term` if one is left.
    async fn try_reserve(&self, term: TermId, major: &str) -> Result<bool>;
    /// Give back a seat taken by `try_reserve`. Returns `false` if no seat
    /// of `major` was taken.
    async fn release(&self, term: TermId, major: &str) -> Result<bool>;
}
