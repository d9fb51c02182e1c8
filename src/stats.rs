use crate::ledger::CapacityLedger;
use crate::model::{Project, ProjectStatus, Term};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
    pub term: String,
    pub total: usize,
    pub students: usize,
    pub by_status: BTreeMap<ProjectStatus, usize>,
    pub capacities: CapacityLedger,
    pub average_grade: Option<f64>,
}

impl Statistics {
    pub fn count(&self, status: ProjectStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Project counts of `term`. Every status is present in `by_status`, even
/// with a zero count.
#[allow(clippy::cast_precision_loss)]
pub fn statistics(term: &Term, projects: &[Project]) -> Statistics {
    let projects = projects.iter().filter(|p| p.term == term.id).collect::<Vec<_>>();
    let mut by_status = ProjectStatus::ALL
        .into_iter()
        .map(|s| (s, 0))
        .collect::<BTreeMap<_, _>>();
    for p in &projects {
        *by_status.entry(p.status).or_default() += 1;
    }
    let grades = projects.iter().filter_map(|p| p.grade).collect::<Vec<_>>();
    let average_grade =
        (!grades.is_empty()).then(|| grades.iter().sum::<f64>() / grades.len() as f64);
    Statistics {
        term: term.name.clone(),
        total: projects.len(),
        students: projects.iter().map(|p| p.student).collect::<BTreeSet<_>>().len(),
        by_status,
        capacities: term.capacities.clone(),
        average_grade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algos::testing::{project, with_status};
    use crate::ledger::Capacity;
    use crate::model::{StudentId, TermId};

    #[test]
    fn counts_only_projects_of_the_term() {
        let term = Term::new(
            TermId(1),
            "2025",
            [Capacity::new("CS", 4)].into_iter().collect(),
        );
        let mut graded = with_status(3, ProjectStatus::Completed);
        graded.grade = Some(14.0);
        let mut other = with_status(4, ProjectStatus::Completed);
        other.grade = Some(18.0);
        let mut elsewhere = project(5, 0);
        elsewhere.term = TermId(2);
        let mut again = with_status(6, ProjectStatus::Rejected);
        again.student = StudentId(101);
        let projects = vec![project(1, 0), graded, other, elsewhere, again];
        let stats = statistics(&term, &projects);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.students, 3);
        assert_eq!(stats.count(ProjectStatus::Pending), 1);
        assert_eq!(stats.count(ProjectStatus::Completed), 2);
        assert_eq!(stats.count(ProjectStatus::Rejected), 1);
        assert_eq!(stats.count(ProjectStatus::Approved), 0);
        assert_eq!(stats.by_status.len(), ProjectStatus::ALL.len());
        assert_eq!(stats.average_grade, Some(16.0));
        assert_eq!(stats.capacities.get("CS").unwrap().remaining(), 4);
    }

    #[test]
    fn empty_term() {
        let term = Term::new(TermId(1), "2025", CapacityLedger::new());
        let stats = statistics(&term, &[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_grade, None);
    }
}
