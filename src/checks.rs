use crate::model::{Professor, ProfessorId, Project, ProjectStatus, Term, TimeKey};
use eyre::{Result, bail};
use std::collections::{HashMap, HashSet};
use tracing::warn;

fn counts_against_capacity(status: ProjectStatus) -> bool {
    !matches!(status, ProjectStatus::Pending | ProjectStatus::Rejected)
}

pub fn ensure_distinct_committees(projects: &[Project]) -> Result<()> {
    if let Some(p) = projects
        .iter()
        .find(|p| p.supervisor.is_some() && p.supervisor == p.examiner)
    {
        bail!("project {} has the same professor as supervisor and examiner", p.id);
    }
    Ok(())
}

pub fn ensure_no_double_booking(projects: &[Project]) -> Result<()> {
    let mut booked = HashSet::<(ProfessorId, TimeKey)>::new();
    for p in projects {
        let Some(window) = p.defense else { continue };
        for professor in [p.supervisor, p.examiner].into_iter().flatten() {
            if !booked.insert((professor, window.key())) {
                bail!(
                    "professor {professor} has two defenses at {} (project {})",
                    window.key(),
                    p.id
                );
            }
        }
    }
    Ok(())
}

pub fn ensure_within_capacity(term: &Term, projects: &[Project]) -> Result<()> {
    let mut approved = HashMap::<&str, u32>::new();
    for p in projects
        .iter()
        .filter(|p| p.term == term.id && counts_against_capacity(p.status))
    {
        *approved.entry(p.major.as_str()).or_default() += 1;
    }
    for (major, n) in approved {
        let max = term.capacities.get(major).map_or(0, |c| c.max_projects);
        if n > max {
            bail!("{n} projects approved in major {major}, capacity is {max}");
        }
    }
    Ok(())
}

/// Examiner limits may have been lowered after assignments were made, so
/// overflowing them is only reported.
pub fn check_examiner_limits(faculty: &[Professor]) {
    for p in faculty {
        if let Some(max) = p.max_examinees {
            if p.current_examinees > max {
                warn!(
                    professor = %p,
                    examinees = %p.current_examinees,
                    max = %max,
                    "Professor examines more projects than allowed",
                );
            }
        }
    }
}

pub fn ensure_consistent(term: &Term, projects: &[Project], faculty: &[Professor]) -> Result<()> {
    check_examiner_limits(faculty);
    ensure_distinct_committees(projects)?;
    ensure_no_double_booking(projects)?;
    ensure_within_capacity(term, projects)
}
