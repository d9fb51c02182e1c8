pub use self::defenses::{DefenseBook, DefenseRun, ScheduledDefense, schedule_defenses};
pub use self::examiners::{ExaminerAssignment, ExaminerRun, assign_examiners};
pub use self::ordering::{ProcessingOrder, ProjectOrder};
pub use self::supervisors::{SupervisorAssignment, assign_supervisors};

mod defenses;
mod examiners;
mod ordering;
mod supervisors;
