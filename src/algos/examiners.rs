use super::ordering::{ProcessingOrder, ordered};
use crate::error::PlanError;
use crate::model::{FacultyLoads, ProfessorId, Project, ProjectId, ProjectStatus};
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ExaminerAssignment {
    pub project: ProjectId,
    pub supervisor: ProfessorId,
    pub examiner: ProfessorId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExaminerRun {
    pub assignments: Vec<ExaminerAssignment>,
    /// Projects for which no professor could examine.
    pub skipped: Vec<ProjectId>,
}

/// Give every topic-approved project without an examiner the least busy
/// examiner other than its supervisor and still under its examiner limit.
/// A project without any such professor is skipped and the run goes on.
#[instrument(skip_all)]
pub fn assign_examiners<O: ProcessingOrder + ?Sized>(
    projects: &[Project],
    loads: &mut FacultyLoads,
    order: &O,
) -> Result<ExaminerRun, PlanError> {
    let candidates = ordered(projects, order, |p| {
        p.status == ProjectStatus::TopicApproved && p.examiner.is_none()
    });
    let mut run = ExaminerRun::default();
    if candidates.is_empty() {
        debug!("No topic-approved project is waiting for an examiner");
        return Ok(run);
    }
    if loads.len() < 2 {
        return Err(PlanError::InsufficientFaculty(loads.len()));
    }
    for project in candidates {
        let Some(supervisor) = project.supervisor else {
            warn!(project = %project.id, "Project has no supervisor, skipping");
            run.skipped.push(project.id);
            continue;
        };
        let Some(examiner) = loads.least_loaded_examiner(Some(supervisor)) else {
            warn!(
                project = %project.id,
                supervisor = %supervisor,
                "No eligible examiner for project",
            );
            run.skipped.push(project.id);
            continue;
        };
        let load = loads.add_examinee(examiner);
        trace!(
            project = %project.id,
            examiner = %examiner,
            examinees = %load,
            "Assigning examiner",
        );
        run.assignments.push(ExaminerAssignment {
            project: project.id,
            supervisor,
            examiner,
        });
    }
    debug!(
        assigned = %run.assignments.len(),
        skipped = %run.skipped.len(),
        "Examiners assigned"
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algos::ProjectOrder;
    use crate::algos::testing::{professor, project};
    use crate::model::Professor;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    fn topic_approved(id: i64, supervisor: i64) -> Project {
        Project {
            status: ProjectStatus::TopicApproved,
            supervisor: Some(ProfessorId(supervisor)),
            ..project(id, id)
        }
    }

    fn limited(id: i64, examinees: u32, max: Option<u32>) -> Professor {
        Professor {
            current_examinees: examinees,
            max_examinees: max,
            ..professor(id)
        }
    }

    #[test]
    fn second_project_is_skipped_once_the_only_examiner_is_full() {
        let x = professor(1);
        let y = limited(2, 0, Some(1));
        let projects = vec![topic_approved(1, 1), topic_approved(2, 1)];
        let mut loads = FacultyLoads::new(&[x, y]);
        let run = assign_examiners(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert_eq!(
            run.assignments,
            vec![ExaminerAssignment {
                project: ProjectId(1),
                supervisor: ProfessorId(1),
                examiner: ProfessorId(2),
            }]
        );
        assert_eq!(run.skipped, vec![ProjectId(2)]);
        assert_eq!(loads.load(ProfessorId(2)).unwrap().examinees, 1);
    }

    #[test]
    fn least_loaded_examiner_wins() {
        let projects = vec![topic_approved(1, 1)];
        let mut loads = FacultyLoads::new(&[
            professor(1),
            limited(2, 3, None),
            limited(3, 1, None),
            limited(4, 1, None),
        ]);
        let run = assign_examiners(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert_eq!(run.assignments[0].examiner, ProfessorId(3));
    }

    #[test]
    fn zero_limit_means_no_examinations() {
        let projects = vec![topic_approved(1, 1)];
        let mut loads = FacultyLoads::new(&[professor(1), limited(2, 0, Some(0))]);
        let run = assign_examiners(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert!(run.assignments.is_empty());
        assert_eq!(run.skipped, vec![ProjectId(1)]);
    }

    #[test]
    fn a_single_professor_is_not_enough() {
        let projects = vec![topic_approved(1, 1)];
        let mut loads = FacultyLoads::new(&[professor(2)]);
        assert!(matches!(
            assign_examiners(&projects, &mut loads, &ProjectOrder::RequestedAt),
            Err(PlanError::InsufficientFaculty(1))
        ));
        assert_eq!(loads.load(ProfessorId(2)).unwrap().examinees, 0);
    }

    #[test]
    fn supervisor_never_examines_and_limits_hold() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let size = rng.random_range(2..6);
            let faculty = (0..size)
                .map(|id| {
                    let max = if rng.random_bool(0.5) {
                        Some(rng.random_range(0..4))
                    } else {
                        None
                    };
                    limited(id, 0, max)
                })
                .collect::<Vec<_>>();
            let projects = (0..rng.random_range(0..15))
                .map(|id| topic_approved(id, rng.random_range(0..size)))
                .collect::<Vec<_>>();
            let mut loads = FacultyLoads::new(&faculty);
            let run = assign_examiners(&projects, &mut loads, &ProjectOrder::AsLoaded).unwrap();
            assert_eq!(run.assignments.len() + run.skipped.len(), projects.len());
            let mut counts: HashMap<ProfessorId, u32> = HashMap::new();
            for a in &run.assignments {
                assert_ne!(a.examiner, a.supervisor);
                *counts.entry(a.examiner).or_default() += 1;
            }
            for p in &faculty {
                if let Some(max) = p.max_examinees {
                    assert!(counts.get(&p.id).copied().unwrap_or(0) <= max);
                }
            }
        }
    }
}
