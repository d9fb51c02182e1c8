use crate::algos::{DefenseRun, ExaminerRun, SupervisorAssignment};
use crate::model::{DATE_FORMAT, ProjectId, TIME_FORMAT};
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::io;
use std::path::Path;

/// One line of a batch result, whatever the batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub project: i64,
    pub outcome: &'static str,
    pub supervisor: Option<i64>,
    pub examiner: Option<i64>,
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ResultRow {
    fn new(project: ProjectId, outcome: &'static str) -> Self {
        ResultRow {
            project: project.0,
            outcome,
            ..ResultRow::default()
        }
    }
}

pub fn supervisor_rows(assignments: &[SupervisorAssignment]) -> Vec<ResultRow> {
    assignments
        .iter()
        .map(|a| ResultRow {
            supervisor: Some(a.supervisor.0),
            ..ResultRow::new(a.project, "assigned")
        })
        .collect()
}

pub fn examiner_rows(run: &ExaminerRun) -> Vec<ResultRow> {
    run.assignments
        .iter()
        .map(|a| ResultRow {
            supervisor: Some(a.supervisor.0),
            examiner: Some(a.examiner.0),
            ..ResultRow::new(a.project, "assigned")
        })
        .chain(run.skipped.iter().map(|&p| ResultRow::new(p, "skipped")))
        .collect()
}

pub fn defense_rows(run: &DefenseRun) -> Vec<ResultRow> {
    run.scheduled
        .iter()
        .map(|d| ResultRow {
            supervisor: Some(d.supervisor.0),
            examiner: Some(d.examiner.0),
            date: Some(d.window.date.format(DATE_FORMAT).to_string()),
            start: Some(d.window.start.format(TIME_FORMAT).to_string()),
            end: Some(d.window.end.format(TIME_FORMAT).to_string()),
            ..ResultRow::new(d.project, "scheduled")
        })
        .chain(run.unscheduled.iter().map(|&p| ResultRow::new(p, "unscheduled")))
        .collect()
}

pub fn write_rows<W: io::Write>(writer: W, rows: &[ResultRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_file(path: &Path, rows: &[ResultRow]) -> Result<()> {
    let file = std::fs::File::create(path)
        .wrap_err_with(|| format!("cannot create {}", path.display()))?;
    write_rows(file, rows).wrap_err_with(|| format!("cannot write {}", path.display()))
}
