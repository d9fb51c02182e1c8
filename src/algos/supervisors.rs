use super::ordering::{ProcessingOrder, ordered};
use crate::error::PlanError;
use crate::model::{FacultyLoads, ProfessorId, Project, ProjectId, ProjectStatus};
use serde::Serialize;
use tracing::{debug, instrument, trace};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SupervisorAssignment {
    pub project: ProjectId,
    pub supervisor: ProfessorId,
}

/// Give every approved project without a supervisor the professor who
/// currently supervises the fewest projects, visiting projects in `order`.
/// Loads are updated after each pick, so this balances the pool greedily
/// rather than rotating through it.
#[instrument(skip_all)]
pub fn assign_supervisors<O: ProcessingOrder + ?Sized>(
    projects: &[Project],
    loads: &mut FacultyLoads,
    order: &O,
) -> Result<Vec<SupervisorAssignment>, PlanError> {
    let candidates = ordered(projects, order, |p| {
        p.status == ProjectStatus::Approved && p.supervisor.is_none()
    });
    if candidates.is_empty() {
        debug!("No approved project is waiting for a supervisor");
        return Ok(Vec::new());
    }
    if loads.is_empty() {
        return Err(PlanError::NoEligibleSupervisors);
    }
    let mut assignments = Vec::with_capacity(candidates.len());
    for project in candidates {
        let supervisor = loads
            .least_loaded_supervisor()
            .ok_or(PlanError::NoEligibleSupervisors)?;
        let load = loads.add_supervisee(supervisor);
        trace!(
            project = %project.id,
            supervisor = %supervisor,
            supervisees = %load,
            "Assigning supervisor",
        );
        assignments.push(SupervisorAssignment {
            project: project.id,
            supervisor,
        });
    }
    debug!(
        assigned = %assignments.len(),
        faculty = %loads.len(),
        "Supervisors assigned"
    );
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algos::ProjectOrder;
    use crate::algos::testing::{professor, project, with_status};
    use crate::model::Professor;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn approved(id: i64, minutes: i64) -> Project {
        Project {
            status: ProjectStatus::Approved,
            ..project(id, minutes)
        }
    }

    fn supervisors(assignments: &[SupervisorAssignment]) -> Vec<i64> {
        assignments.iter().map(|a| a.supervisor.0).collect()
    }

    #[test]
    fn two_idle_professors_alternate_starting_with_the_first() {
        let projects = vec![approved(1, 0), approved(2, 1), approved(3, 2)];
        let mut loads = FacultyLoads::new(&[professor(10), professor(20)]);
        let assignments =
            assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert_eq!(supervisors(&assignments), vec![10, 20, 10]);
        assert_eq!(loads.load(ProfessorId(10)).unwrap().supervisees, 2);
        assert_eq!(loads.load(ProfessorId(20)).unwrap().supervisees, 1);
    }

    #[test]
    fn earliest_request_is_served_first() {
        let projects = vec![approved(1, 30), approved(2, 10), approved(3, 20)];
        let mut loads = FacultyLoads::new(&[professor(10), professor(20), professor(30)]);
        let assignments =
            assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert_eq!(
            assignments,
            vec![
                SupervisorAssignment {
                    project: ProjectId(2),
                    supervisor: ProfessorId(10)
                },
                SupervisorAssignment {
                    project: ProjectId(3),
                    supervisor: ProfessorId(20)
                },
                SupervisorAssignment {
                    project: ProjectId(1),
                    supervisor: ProfessorId(30)
                },
            ]
        );
    }

    #[test]
    fn existing_load_is_taken_into_account() {
        let busy = Professor {
            current_supervisees: 2,
            ..professor(10)
        };
        let projects = vec![approved(1, 0), approved(2, 1), approved(3, 2)];
        let mut loads = FacultyLoads::new(&[busy, professor(20)]);
        let assignments =
            assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert_eq!(supervisors(&assignments), vec![20, 20, 10]);
    }

    #[test]
    fn no_faculty_fails_before_assigning() {
        let projects = vec![approved(1, 0)];
        let mut loads = FacultyLoads::new(&[]);
        assert!(matches!(
            assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt),
            Err(PlanError::NoEligibleSupervisors)
        ));
    }

    #[test]
    fn nothing_to_assign_is_not_an_error() {
        let projects = vec![with_status(1, ProjectStatus::Pending)];
        let mut loads = FacultyLoads::new(&[]);
        assert!(
            assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn only_approved_projects_without_supervisor_are_considered() {
        let mut taken = approved(2, 1);
        taken.supervisor = Some(ProfessorId(20));
        let projects = vec![
            approved(1, 0),
            taken,
            with_status(3, ProjectStatus::Pending),
            with_status(4, ProjectStatus::TopicApproved),
        ];
        let mut loads = FacultyLoads::new(&[professor(10), professor(20)]);
        let assignments =
            assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].project, ProjectId(1));
    }

    #[test]
    fn never_skips_a_less_loaded_professor() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..50 {
            let faculty = (0..rng.random_range(1..6))
                .map(|id| Professor {
                    current_supervisees: rng.random_range(0..4),
                    ..professor(id)
                })
                .collect::<Vec<_>>();
            let projects = (0..rng.random_range(0..12))
                .map(|id| approved(id, rng.random_range(0..100)))
                .collect::<Vec<_>>();
            let mut loads = FacultyLoads::new(&faculty);
            let mut replay = loads.clone();
            let assignments =
                assign_supervisors(&projects, &mut loads, &ProjectOrder::RequestedAt).unwrap();
            assert_eq!(assignments.len(), projects.len());
            for a in assignments {
                let chosen = replay.load(a.supervisor).unwrap().supervisees;
                let minimum = replay
                    .faculty()
                    .iter()
                    .map(|&p| replay.load(p).unwrap().supervisees)
                    .min()
                    .unwrap();
                assert_eq!(chosen, minimum);
                replay.add_supervisee(a.supervisor);
            }
        }
    }
}
