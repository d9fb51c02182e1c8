pub use self::loads::FacultyLoads;
pub use self::professor::{Professor, ProfessorId};
pub use self::project::{CandidateTime, Project, ProjectId, ProjectStatus, StudentId};
pub use self::term::{Term, TermId};
pub use self::time::{DATE_FORMAT, TIME_FORMAT, TimeKey, TimeWindow};

mod loads;
mod professor;
mod project;
mod term;
mod time;
