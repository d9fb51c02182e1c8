use super::ordering::{ProcessingOrder, ordered};
use crate::model::{ProfessorId, Project, ProjectId, ProjectStatus, TimeKey, TimeWindow};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, trace, warn};

/// Time keys already committed, per professor.
#[derive(Clone, Debug, Default)]
pub struct DefenseBook {
    booked: HashMap<ProfessorId, HashSet<TimeKey>>,
}

impl DefenseBook {
    pub fn new() -> Self {
        DefenseBook::default()
    }

    /// Book the confirmed defenses of `projects` for their committees.
    pub fn seeded_from(projects: &[Project]) -> Self {
        let mut book = DefenseBook::new();
        for p in projects {
            if let Some(window) = p.defense {
                for professor in [p.supervisor, p.examiner].into_iter().flatten() {
                    book.book(professor, window.key());
                }
            }
        }
        book
    }

    pub fn is_free(&self, professor: ProfessorId, key: TimeKey) -> bool {
        self.booked
            .get(&professor)
            .is_none_or(|keys| !keys.contains(&key))
    }

    /// Returns `false` if the professor was already booked at that time.
    pub fn book(&mut self, professor: ProfessorId, key: TimeKey) -> bool {
        self.booked.entry(professor).or_default().insert(key)
    }

    #[cfg(test)]
    pub fn bookings_of(&self, professor: ProfessorId) -> usize {
        self.booked.get(&professor).map_or(0, HashSet::len)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ScheduledDefense {
    pub project: ProjectId,
    pub window: TimeWindow,
    pub supervisor: ProfessorId,
    pub examiner: ProfessorId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefenseRun {
    pub scheduled: Vec<ScheduledDefense>,
    /// Projects none of whose candidate times were free for the committee.
    pub unscheduled: Vec<ProjectId>,
}

/// Pick, for every in-progress project with candidate times and no defense
/// yet, the first candidate (in submission order) at which neither committee
/// member is booked. First fit: an unlucky order may leave a project
/// unscheduled even though another assignment would have placed it.
#[instrument(skip_all)]
pub fn schedule_defenses<O: ProcessingOrder + ?Sized>(
    projects: &[Project],
    book: &mut DefenseBook,
    order: &O,
) -> DefenseRun {
    let candidates = ordered(projects, order, |p| {
        p.status == ProjectStatus::InProgress
            && p.defense.is_none()
            && !p.proposed_defense_times.is_empty()
    });
    let mut run = DefenseRun::default();
    for project in candidates {
        let (Some(supervisor), Some(examiner)) = (project.supervisor, project.examiner) else {
            warn!(project = %project.id, "Project has an incomplete committee, skipping");
            run.unscheduled.push(project.id);
            continue;
        };
        let slot = project
            .proposed_defense_times
            .iter()
            .find(|c| book.is_free(supervisor, c.key()) && book.is_free(examiner, c.key()));
        match slot {
            Some(candidate) => {
                book.book(supervisor, candidate.key());
                book.book(examiner, candidate.key());
                trace!(
                    project = %project.id,
                    window = %candidate.window,
                    "Defense scheduled",
                );
                run.scheduled.push(ScheduledDefense {
                    project: project.id,
                    window: candidate.window,
                    supervisor,
                    examiner,
                });
            }
            None => {
                debug!(
                    project = %project.id,
                    candidates = %project.proposed_defense_times.len(),
                    "No conflict-free defense time",
                );
                run.unscheduled.push(project.id);
            }
        }
    }
    debug!(
        scheduled = %run.scheduled.len(),
        unscheduled = %run.unscheduled.len(),
        "Defenses scheduled"
    );
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algos::ProjectOrder;
    use crate::algos::testing::{project, window};
    use crate::model::CandidateTime;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn in_progress(id: i64, supervisor: i64, examiner: i64, times: &[&str]) -> Project {
        Project {
            status: ProjectStatus::InProgress,
            supervisor: Some(ProfessorId(supervisor)),
            examiner: Some(ProfessorId(examiner)),
            proposed_defense_times: times
                .iter()
                .map(|t| CandidateTime {
                    window: window(t),
                    submitted_by: ProfessorId(examiner),
                })
                .collect(),
            ..project(id, id)
        }
    }

    #[test]
    fn shared_examiner_gets_the_next_candidate() {
        let a = in_progress(1, 1, 9, &["2025-06-14T09:00-09:30"]);
        let b = in_progress(
            2,
            2,
            9,
            &["2025-06-14T09:00-09:30", "2025-06-14T09:30-10:00"],
        );
        let run = schedule_defenses(&[a, b], &mut DefenseBook::new(), &ProjectOrder::Id);
        assert!(run.unscheduled.is_empty());
        assert_eq!(run.scheduled[0].window, window("2025-06-14T09:00-09:30"));
        assert_eq!(run.scheduled[1].window, window("2025-06-14T09:30-10:00"));
    }

    #[test]
    fn same_start_conflicts_whatever_the_end() {
        let a = in_progress(1, 1, 9, &["2025-06-14T09:00-09:30"]);
        let b = in_progress(2, 9, 3, &["2025-06-14T09:00-11:00"]);
        let run = schedule_defenses(&[a, b], &mut DefenseBook::new(), &ProjectOrder::Id);
        assert_eq!(run.scheduled.len(), 1);
        assert_eq!(run.unscheduled, vec![ProjectId(2)]);
    }

    #[test]
    fn first_fit_depends_on_order() {
        // Project 2 can only use 09:00; project 1 could use either.
        let flexible = in_progress(
            1,
            1,
            9,
            &["2025-06-14T09:00-09:30", "2025-06-14T10:00-10:30"],
        );
        let rigid = in_progress(2, 2, 9, &["2025-06-14T09:00-09:30"]);
        let projects = [flexible, rigid];
        let run = schedule_defenses(&projects, &mut DefenseBook::new(), &ProjectOrder::Id);
        assert_eq!(run.unscheduled, vec![ProjectId(2)]);
        let rigid_first = |a: &Project, b: &Project| b.id.cmp(&a.id);
        let run = schedule_defenses(&projects, &mut DefenseBook::new(), &rigid_first);
        assert!(run.unscheduled.is_empty());
    }

    #[test]
    fn existing_defenses_are_respected() {
        let mut done = in_progress(1, 1, 9, &["2025-06-14T09:00-09:30"]);
        done.status = ProjectStatus::DefenseScheduled;
        done.defense = Some(window("2025-06-14T09:00-09:30"));
        let next = in_progress(2, 2, 9, &["2025-06-14T09:00-09:30"]);
        let projects = [done, next];
        let mut book = DefenseBook::seeded_from(&projects);
        assert_eq!(book.bookings_of(ProfessorId(9)), 1);
        let run = schedule_defenses(&projects, &mut book, &ProjectOrder::Id);
        assert!(run.scheduled.is_empty());
        assert_eq!(run.unscheduled, vec![ProjectId(2)]);
    }

    #[test]
    fn projects_without_candidates_or_with_defense_are_ignored() {
        let empty = in_progress(1, 1, 2, &[]);
        let mut scheduled = in_progress(2, 1, 2, &["2025-06-14T09:00-09:30"]);
        scheduled.defense = Some(window("2025-06-14T09:00-09:30"));
        let mut no_examiner = in_progress(3, 1, 2, &["2025-06-14T11:00-11:30"]);
        no_examiner.examiner = None;
        let run = schedule_defenses(
            &[empty, scheduled, no_examiner],
            &mut DefenseBook::new(),
            &ProjectOrder::Id,
        );
        assert!(run.scheduled.is_empty());
        assert_eq!(run.unscheduled, vec![ProjectId(3)]);
    }

    #[test]
    fn nobody_is_booked_twice() {
        let slots = [
            "2025-06-14T09:00-09:30",
            "2025-06-14T09:30-10:00",
            "2025-06-14T10:00-10:30",
            "2025-06-15T09:00-09:30",
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let projects = (0..rng.random_range(0..12))
                .map(|id| {
                    let supervisor = rng.random_range(0..4);
                    let examiner = (supervisor + rng.random_range(1..4)) % 4;
                    let times = (0..rng.random_range(1..4))
                        .map(|_| slots[rng.random_range(0..slots.len())])
                        .collect::<Vec<_>>();
                    in_progress(id, supervisor, examiner, &times)
                })
                .collect::<Vec<_>>();
            let run = schedule_defenses(&projects, &mut DefenseBook::new(), &ProjectOrder::Id);
            let mut seen = HashSet::new();
            for d in &run.scheduled {
                assert!(seen.insert((d.supervisor, d.window.key())));
                assert!(seen.insert((d.examiner, d.window.key())));
            }
            assert_eq!(
                run.scheduled.len() + run.unscheduled.len(),
                projects.len()
            );
        }
    }
}
