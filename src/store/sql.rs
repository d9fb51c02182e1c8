#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use super::{FacultyFilter, FacultyRepository, ProjectFilter, ProjectRepository, TermRepository};
use crate::audit::{AuditEvent, AuditSink};
use crate::error::Result;
use crate::ledger::{Capacity, CapacityLedger};
use crate::model::{
    CandidateTime, DATE_FORMAT, Professor, ProfessorId, Project, ProjectId, ProjectStatus,
    StudentId, TIME_FORMAT, Term, TermId, TimeWindow,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyConnection, AnyPool, QueryBuilder, Row};
use tracing::{debug, trace};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PROJECT_SELECT: &str = "SELECT id, student_id, term_id, major, status, supervisor_id, \
     examiner_id, topic, defense_date, defense_start, defense_end, grade, requested_at, \
     approved_at FROM projects";

const PROFESSOR_SELECT: &str = "SELECT id, first_name, last_name, major, is_active, \
     is_approved, current_supervisees, current_examinees, max_examinees FROM professors";

fn decode_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

fn timestamp(s: &str) -> Result<NaiveDateTime, sqlx::Error> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(decode_error)
}

fn window(date: &str, start: &str, end: &str) -> Result<TimeWindow, sqlx::Error> {
    TimeWindow::new(
        NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(decode_error)?,
        NaiveTime::parse_from_str(start, TIME_FORMAT).map_err(decode_error)?,
        NaiveTime::parse_from_str(end, TIME_FORMAT).map_err(decode_error)?,
    )
    .map_err(decode_error)
}

fn project_row(row: AnyRow) -> Result<Project, sqlx::Error> {
    let status = row.try_get::<String, _>("status")?;
    let defense = match (
        row.try_get::<Option<String>, _>("defense_date")?,
        row.try_get::<Option<String>, _>("defense_start")?,
        row.try_get::<Option<String>, _>("defense_end")?,
    ) {
        (Some(date), Some(start), Some(end)) => Some(window(&date, &start, &end)?),
        _ => None,
    };
    Ok(Project {
        id: ProjectId(row.try_get("id")?),
        student: StudentId(row.try_get("student_id")?),
        term: TermId(row.try_get("term_id")?),
        major: row.try_get("major")?,
        status: status.parse::<ProjectStatus>().map_err(decode_error)?,
        supervisor: row
            .try_get::<Option<i64>, _>("supervisor_id")?
            .map(ProfessorId),
        examiner: row.try_get::<Option<i64>, _>("examiner_id")?.map(ProfessorId),
        proposed_topics: Vec::new(),
        topic: row.try_get("topic")?,
        proposed_defense_times: Vec::new(),
        defense,
        grade: row.try_get("grade")?,
        requested_at: timestamp(&row.try_get::<String, _>("requested_at")?)?,
        approved_at: row
            .try_get::<Option<String>, _>("approved_at")?
            .as_deref()
            .map(timestamp)
            .transpose()?,
    })
}

fn professor_row(row: AnyRow) -> Result<Professor, sqlx::Error> {
    let first_name = row.try_get::<String, _>("first_name")?;
    let last_name = row.try_get::<String, _>("last_name")?;
    Ok(Professor {
        id: ProfessorId(row.try_get("id")?),
        name: format!("{first_name} {last_name}"),
        major: row.try_get("major")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        is_approved: row.try_get::<i64, _>("is_approved")? != 0,
        current_supervisees: row.try_get::<i64, _>("current_supervisees")? as u32,
        current_examinees: row.try_get::<i64, _>("current_examinees")? as u32,
        max_examinees: row
            .try_get::<Option<i64>, _>("max_examinees")?
            .map(|max| max as u32),
    })
}

/// Write the term row and its capacity ceilings. Approved counts of
/// existing majors are left untouched.
async fn write_term(conn: &mut AnyConnection, term: &Term) -> Result<(), sqlx::Error> {
    if term.is_active {
        sqlx::query("UPDATE terms SET is_active = 0 WHERE id <> ?")
            .bind(term.id.0)
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query("UPDATE terms SET name = ?, is_active = ? WHERE id = ?")
        .bind(term.name.clone())
        .bind(i64::from(term.is_active))
        .bind(term.id.0)
        .execute(&mut *conn)
        .await?;
    for capacity in term.capacities.iter() {
        let existing = sqlx::query(
            "SELECT COUNT(*) AS n FROM term_capacities WHERE term_id = ? AND major = ?",
        )
        .bind(term.id.0)
        .bind(capacity.major.clone())
        .try_map(|row: AnyRow| row.try_get::<i64, _>("n"))
        .fetch_one(&mut *conn)
        .await?;
        if existing > 0 {
            sqlx::query(
                "UPDATE term_capacities SET max_projects = ? WHERE term_id = ? AND major = ?",
            )
            .bind(i64::from(capacity.max_projects))
            .bind(term.id.0)
            .bind(capacity.major.clone())
            .execute(&mut *conn)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO term_capacities (term_id, major, max_projects, current_count) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(term.id.0)
            .bind(capacity.major.clone())
            .bind(i64::from(capacity.max_projects))
            .bind(i64::from(capacity.current_count))
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

/// Store backed by an sqlx `Any` pool (MySQL, or SQLite with the `sqlite`
/// feature). See `schema.sql` for the tables it expects.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await?;
        debug!("Connected to database");
        Ok(SqlStore { pool })
    }

    async fn with_children(&self, mut project: Project) -> Result<Project> {
        project.proposed_topics =
            sqlx::query("SELECT topic FROM project_topics WHERE project_id = ? ORDER BY position")
                .bind(project.id.0)
                .try_map(|row: AnyRow| row.try_get::<String, _>("topic"))
                .fetch_all(&self.pool)
                .await?;
        project.proposed_defense_times = sqlx::query(
            "SELECT defense_date, start_time, end_time, submitted_by FROM defense_proposals \
             WHERE project_id = ? ORDER BY position",
        )
        .bind(project.id.0)
        .try_map(|row: AnyRow| {
            Ok(CandidateTime {
                window: window(
                    &row.try_get::<String, _>("defense_date")?,
                    &row.try_get::<String, _>("start_time")?,
                    &row.try_get::<String, _>("end_time")?,
                )?,
                submitted_by: ProfessorId(row.try_get("submitted_by")?),
            })
        })
        .fetch_all(&self.pool)
        .await?;
        Ok(project)
    }

    async fn capacities(&self, term: TermId) -> Result<CapacityLedger> {
        Ok(sqlx::query(
            "SELECT major, max_projects, current_count FROM term_capacities \
             WHERE term_id = ? ORDER BY major",
        )
        .bind(term.0)
        .try_map(|row: AnyRow| {
            Ok(Capacity {
                major: row.try_get("major")?,
                max_projects: row.try_get::<i64, _>("max_projects")? as u32,
                current_count: row.try_get::<i64, _>("current_count")? as u32,
            })
        })
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect())
    }

    async fn find_term(&self, condition: &str, id: Option<i64>) -> Result<Option<Term>> {
        let sql = format!("SELECT id, name, is_active FROM terms WHERE {condition} ORDER BY id DESC");
        let mut query = sqlx::query(&sql);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let row = query
            .try_map(|row: AnyRow| {
                Ok((
                    TermId(row.try_get("id")?),
                    row.try_get::<String, _>("name")?,
                    row.try_get::<i64, _>("is_active")? != 0,
                ))
            })
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some((id, name, is_active)) => Ok(Some(Term {
                id,
                name,
                is_active,
                capacities: self.capacities(id).await?,
            })),
            None => Ok(None),
        }
    }
}

impl ProjectRepository for SqlStore {
    async fn find_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let mut query = QueryBuilder::<Any>::new(PROJECT_SELECT);
        query.push(" WHERE 1 = 1");
        if let Some(term) = filter.term {
            query.push(" AND term_id = ").push_bind(term.0);
        }
        if let Some(status) = filter.status {
            query
                .push(" AND status = ")
                .push_bind(status.as_str().to_owned());
        }
        if let Some(student) = filter.student {
            query.push(" AND student_id = ").push_bind(student.0);
        }
        query.push(" ORDER BY id");
        let rows = query
            .build()
            .try_map(project_row)
            .fetch_all(&self.pool)
            .await?;
        let mut projects = Vec::with_capacity(rows.len());
        for project in rows {
            projects.push(self.with_children(project).await?);
        }
        trace!(?filter, found = %projects.len(), "Projects loaded");
        Ok(projects)
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>> {
        let sql = format!("{PROJECT_SELECT} WHERE id = ?");
        match sqlx::query(&sql)
            .bind(id.0)
            .try_map(project_row)
            .fetch_optional(&self.pool)
            .await?
        {
            Some(project) => Ok(Some(self.with_children(project).await?)),
            None => Ok(None),
        }
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE projects SET status = ?, supervisor_id = ?, examiner_id = ?, topic = ?, \
             defense_date = ?, defense_start = ?, defense_end = ?, grade = ?, approved_at = ? \
             WHERE id = ?",
        )
        .bind(project.status.as_str().to_owned())
        .bind(project.supervisor.map(|p| p.0))
        .bind(project.examiner.map(|p| p.0))
        .bind(project.topic.clone())
        .bind(project.defense.map(|w| w.date.format(DATE_FORMAT).to_string()))
        .bind(project.defense.map(|w| w.start.format(TIME_FORMAT).to_string()))
        .bind(project.defense.map(|w| w.end.format(TIME_FORMAT).to_string()))
        .bind(project.grade)
        .bind(
            project
                .approved_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        )
        .bind(project.id.0)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM project_topics WHERE project_id = ?")
            .bind(project.id.0)
            .execute(&mut *tx)
            .await?;
        for (position, topic) in project.proposed_topics.iter().enumerate() {
            sqlx::query("INSERT INTO project_topics (project_id, position, topic) VALUES (?, ?, ?)")
                .bind(project.id.0)
                .bind(position as i64)
                .bind(topic.clone())
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM defense_proposals WHERE project_id = ?")
            .bind(project.id.0)
            .execute(&mut *tx)
            .await?;
        for (position, candidate) in project.proposed_defense_times.iter().enumerate() {
            sqlx::query(
                "INSERT INTO defense_proposals \
                 (project_id, position, defense_date, start_time, end_time, submitted_by) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(project.id.0)
            .bind(position as i64)
            .bind(candidate.window.date.format(DATE_FORMAT).to_string())
            .bind(candidate.window.start.format(TIME_FORMAT).to_string())
            .bind(candidate.window.end.format(TIME_FORMAT).to_string())
            .bind(candidate.submitted_by.0)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        trace!(project = %project.id, status = %project.status, "Project saved");
        Ok(())
    }

    async fn insert_project(&self, project: Project) -> Result<Project> {
        let result = sqlx::query(
            "INSERT INTO projects (student_id, term_id, major, status, requested_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(project.student.0)
        .bind(project.term.0)
        .bind(project.major.clone())
        .bind(project.status.as_str().to_owned())
        .bind(project.requested_at.format(TIMESTAMP_FORMAT).to_string())
        .execute(&self.pool)
        .await?;
        let id = result
            .last_insert_id()
            .ok_or_else(|| sqlx::Error::Protocol("no id returned for new project".to_owned()))?;
        let project = Project {
            id: ProjectId(id),
            ..project
        };
        self.save_project(&project).await?;
        Ok(project)
    }
}

impl FacultyRepository for SqlStore {
    async fn find_faculty(&self, filter: &FacultyFilter) -> Result<Vec<Professor>> {
        let sql = if filter.eligible_only {
            format!("{PROFESSOR_SELECT} WHERE is_active = 1 AND is_approved = 1 ORDER BY id")
        } else {
            format!("{PROFESSOR_SELECT} ORDER BY id")
        };
        Ok(sqlx::query(&sql)
            .try_map(professor_row)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn professor(&self, id: ProfessorId) -> Result<Option<Professor>> {
        let sql = format!("{PROFESSOR_SELECT} WHERE id = ?");
        Ok(sqlx::query(&sql)
            .bind(id.0)
            .try_map(professor_row)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_professor(&self, professor: &Professor) -> Result<()> {
        sqlx::query(
            "UPDATE professors SET is_active = ?, is_approved = ?, current_supervisees = ?, \
             current_examinees = ?, max_examinees = ? WHERE id = ?",
        )
        .bind(i64::from(professor.is_active))
        .bind(i64::from(professor.is_approved))
        .bind(i64::from(professor.current_supervisees))
        .bind(i64::from(professor.current_examinees))
        .bind(professor.max_examinees.map(i64::from))
        .bind(professor.id.0)
        .execute(&self.pool)
        .await?;
        trace!(professor = %professor.id, "Professor saved");
        Ok(())
    }
}

impl TermRepository for SqlStore {
    async fn active_term(&self) -> Result<Option<Term>> {
        self.find_term("is_active = 1", None).await
    }

    async fn term(&self, id: TermId) -> Result<Option<Term>> {
        self.find_term("id = ?", Some(id.0)).await
    }

    async fn save_term(&self, term: &Term) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_term(&mut tx, term).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_term(&self, term: Term) -> Result<Term> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("INSERT INTO terms (name, is_active) VALUES (?, ?)")
            .bind(term.name.clone())
            .bind(i64::from(term.is_active))
            .execute(&mut *tx)
            .await?;
        let id = result
            .last_insert_id()
            .ok_or_else(|| sqlx::Error::Protocol("no id returned for new term".to_owned()))?;
        let term = Term {
            id: TermId(id),
            ..term
        };
        write_term(&mut tx, &term).await?;
        tx.commit().await?;
        Ok(term)
    }

    async fn try_reserve(&self, term: TermId, major: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE term_capacities SET current_count = current_count + 1 \
             WHERE term_id = ? AND major = ? AND current_count < max_projects",
        )
        .bind(term.0)
        .bind(major.to_owned())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, term: TermId, major: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE term_capacities SET current_count = current_count - 1 \
             WHERE term_id = ? AND major = ? AND current_count > 0",
        )
        .bind(term.0)
        .bind(major.to_owned())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

impl AuditSink for SqlStore {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log (action, actor_id, target_project, target_user, details, \
             created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.action.as_str().to_owned())
        .bind(event.actor.0)
        .bind(event.target_project.map(|p| p.0))
        .bind(event.target_user)
        .bind(event.details.to_string())
        .bind(Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
