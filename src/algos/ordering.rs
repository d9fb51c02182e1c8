use crate::error::PlanError;
use crate::model::Project;
use serde::{Deserialize, Serialize};
use std::cmp;
use std::str::FromStr;

/// Decides in which order a batch operation visits its projects. Allocation
/// fairness and scheduling feasibility both depend on it.
pub trait ProcessingOrder {
    fn compare(&self, a: &Project, b: &Project) -> cmp::Ordering;

    /// Stable sort, so projects comparing equal keep their loaded order.
    fn sort(&self, projects: &mut [&Project]) {
        projects.sort_by(|a, b| self.compare(a, b));
    }
}

impl<F> ProcessingOrder for F
where
    F: Fn(&Project, &Project) -> cmp::Ordering,
{
    fn compare(&self, a: &Project, b: &Project) -> cmp::Ordering {
        self(a, b)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectOrder {
    /// Earliest request first, then lowest id.
    #[default]
    RequestedAt,
    Id,
    /// Keep whatever order the store returned.
    AsLoaded,
}

impl ProcessingOrder for ProjectOrder {
    fn compare(&self, a: &Project, b: &Project) -> cmp::Ordering {
        match self {
            ProjectOrder::RequestedAt => (a.requested_at, a.id).cmp(&(b.requested_at, b.id)),
            ProjectOrder::Id => a.id.cmp(&b.id),
            ProjectOrder::AsLoaded => cmp::Ordering::Equal,
        }
    }
}

impl FromStr for ProjectOrder {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested-at" => Ok(ProjectOrder::RequestedAt),
            "id" => Ok(ProjectOrder::Id),
            "as-loaded" => Ok(ProjectOrder::AsLoaded),
            other => Err(PlanError::UnknownOrder(other.to_owned())),
        }
    }
}

/// Keep the projects matching `keep`, in processing order.
pub fn ordered<'a, O, F>(projects: &'a [Project], order: &O, keep: F) -> Vec<&'a Project>
where
    O: ProcessingOrder + ?Sized,
    F: Fn(&Project) -> bool,
{
    let mut selected = projects.iter().filter(|&p| keep(p)).collect::<Vec<_>>();
    order.sort(&mut selected);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algos::testing::project;
    use crate::model::ProjectId;

    fn ids(projects: &[&Project]) -> Vec<i64> {
        projects.iter().map(|p| p.id.0).collect()
    }

    #[test]
    fn requested_at_breaks_ties_by_id() {
        let projects = vec![project(3, 10), project(2, 5), project(1, 10)];
        let sorted = ordered(&projects, &ProjectOrder::RequestedAt, |_| true);
        assert_eq!(ids(&sorted), vec![2, 1, 3]);
    }

    #[test]
    fn as_loaded_keeps_input_order() {
        let projects = vec![project(3, 10), project(2, 5), project(1, 10)];
        let sorted = ordered(&projects, &ProjectOrder::AsLoaded, |_| true);
        assert_eq!(ids(&sorted), vec![3, 2, 1]);
        let sorted = ordered(&projects, &ProjectOrder::Id, |p| p.id != ProjectId(2));
        assert_eq!(ids(&sorted), vec![1, 3]);
    }

    #[test]
    fn closures_are_orders() {
        let projects = vec![project(1, 0), project(2, 0), project(3, 0)];
        let latest_first = |a: &Project, b: &Project| b.id.cmp(&a.id);
        let sorted = ordered(&projects, &latest_first, |_| true);
        assert_eq!(ids(&sorted), vec![3, 2, 1]);
    }

    #[test]
    fn parse_order_names() {
        assert_eq!("id".parse::<ProjectOrder>().unwrap(), ProjectOrder::Id);
        assert_eq!(
            "requested-at".parse::<ProjectOrder>().unwrap(),
            ProjectOrder::RequestedAt
        );
        assert!("random".parse::<ProjectOrder>().is_err());
    }
}
