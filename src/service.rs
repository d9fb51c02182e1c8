use crate::algos::{
    self, DefenseBook, DefenseRun, ExaminerRun, ProcessingOrder, ProjectOrder,
    SupervisorAssignment,
};
use crate::audit::{ActorId, AuditAction, AuditEvent, AuditSink};
use crate::error::{PlanError, Result};
use crate::ledger::{Capacity, CapacityLedger};
use crate::model::{
    CandidateTime, FacultyLoads, Professor, ProfessorId, Project, ProjectId, ProjectStatus,
    StudentId, Term, TermId, TimeWindow,
};
use crate::stats::{self, Statistics};
use crate::store::{FacultyFilter, FacultyRepository, ProjectFilter, ProjectRepository, TermRepository};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use tracing::{debug, info, instrument, warn};

pub const GRADE_RANGE: RangeInclusive<f64> = 0.0..=20.0;

#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Recorded as the author of every audit event.
    pub actor: ActorId,
    pub supervisor_order: ProjectOrder,
    pub examiner_order: ProjectOrder,
    pub defense_order: ProjectOrder,
    /// Book the defenses already scheduled in the term before placing new ones.
    pub respect_existing_defenses: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            actor: ActorId::default(),
            supervisor_order: ProjectOrder::default(),
            examiner_order: ProjectOrder::default(),
            defense_order: ProjectOrder::default(),
            respect_existing_defenses: true,
        }
    }
}

/// Entry point of every operation. Batch operations persist after each
/// project, so a store failure leaves the already saved prefix in place.
pub struct Planner<S, A> {
    store: S,
    audit: A,
    config: PlannerConfig,
}

impl<S, A> Planner<S, A>
where
    S: ProjectRepository + FacultyRepository + TermRepository,
    A: AuditSink,
{
    pub fn new(store: S, audit: A, config: PlannerConfig) -> Self {
        Planner {
            store,
            audit,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn event(&self, action: AuditAction) -> AuditEvent {
        AuditEvent::new(action, self.config.actor)
    }

    async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(&event).await {
            warn!(action = event.action.as_str(), error = %e, "Cannot record audit event");
        }
    }

    async fn load_project(&self, id: ProjectId) -> Result<Project> {
        self.store
            .project(id)
            .await?
            .ok_or(PlanError::ProjectNotFound(id))
    }

    async fn load_term(&self, id: TermId) -> Result<Term> {
        self.store.term(id).await?.ok_or(PlanError::TermNotFound(id))
    }

    async fn load_professor(&self, id: ProfessorId) -> Result<Professor> {
        self.store
            .professor(id)
            .await?
            .ok_or(PlanError::ProfessorNotFound(id))
    }

    /// Open a new term. It becomes the only active one.
    pub async fn create_term(&self, name: &str, capacities: CapacityLedger) -> Result<Term> {
        let capacities = capacities
            .iter()
            .map(|c| Capacity::new(c.major.clone(), c.max_projects))
            .collect();
        let term = self
            .store
            .insert_term(Term::new(TermId(0), name, capacities))
            .await?;
        info!(term = %term.id, name = %term.name, "Term created");
        self.record(self.event(AuditAction::TermCreated).details(json!({
            "term": term.id.0,
            "name": term.name,
            "capacities": term.capacities,
        })))
        .await;
        Ok(term)
    }

    pub async fn set_capacity(&self, term: TermId, major: &str, max_projects: u32) -> Result<Term> {
        let mut term = self.load_term(term).await?;
        term.capacities.set_capacity(major, max_projects)?;
        self.store.save_term(&term).await?;
        info!(term = %term.id, major, max_projects, "Capacity set");
        self.record(self.event(AuditAction::CapacitySet).details(json!({
            "term": term.id.0,
            "major": major,
            "max_projects": max_projects,
        })))
        .await;
        Ok(term)
    }

    /// `None` lifts the limit.
    pub async fn set_examiner_limit(
        &self,
        professor: ProfessorId,
        max_examinees: Option<u32>,
    ) -> Result<Professor> {
        let mut professor = self.load_professor(professor).await?;
        professor.max_examinees = max_examinees;
        self.store.save_professor(&professor).await?;
        self.record(
            self.event(AuditAction::ExaminerLimitSet)
                .user(professor.id.0)
                .details(json!({ "max_examinees": max_examinees })),
        )
        .await;
        Ok(professor)
    }

    /// Open a pending project for `student` in the active term.
    pub async fn request_project(&self, student: StudentId, major: &str) -> Result<Project> {
        let term = self.store.active_term().await?.ok_or(PlanError::NoActiveTerm)?;
        let existing = self
            .store
            .find_projects(&ProjectFilter::term(term.id).with_student(student))
            .await?;
        if let Some(open) = existing.iter().find(|p| !p.status.is_terminal()) {
            return Err(PlanError::DuplicateRequest {
                student,
                project: open.id,
            });
        }
        let project = self
            .store
            .insert_project(Project::new(
                ProjectId(0),
                student,
                term.id,
                major,
                Utc::now().naive_utc(),
            ))
            .await?;
        info!(project = %project.id, student = %student, major, "Project requested");
        self.record(
            self.event(AuditAction::ProjectRequested)
                .project(project.id)
                .user(student.0)
                .details(json!({ "term": term.id.0, "major": major })),
        )
        .await;
        Ok(project)
    }

    /// Approve a pending project, taking one seat of its major in its term.
    pub async fn approve_project(&self, id: ProjectId) -> Result<Project> {
        let mut project = self.load_project(id).await?;
        if project.status != ProjectStatus::Pending {
            return Err(PlanError::AlreadyProcessed {
                project: id,
                status: project.status,
            });
        }
        let term = self.load_term(project.term).await?;
        if !self.store.try_reserve(term.id, &project.major).await? {
            return Err(PlanError::CapacityExceeded {
                major: project.major,
            });
        }
        project.advance(ProjectStatus::Approved)?;
        project.approved_at = Some(Utc::now().naive_utc());
        if let Err(e) = self.store.save_project(&project).await {
            // The project is still pending in the store, so its seat goes back.
            if let Err(release) = self.store.release(term.id, &project.major).await {
                warn!(project = %id, error = %release, "Cannot give back reserved seat");
            }
            return Err(e);
        }
        info!(project = %id, major = %project.major, term = %term.name, "Project approved");
        self.record(
            self.event(AuditAction::ProjectApproved)
                .project(id)
                .user(project.student.0)
                .details(json!({ "major": project.major })),
        )
        .await;
        Ok(project)
    }

    pub async fn reject_project(&self, id: ProjectId) -> Result<Project> {
        let mut project = self.load_project(id).await?;
        if project.status != ProjectStatus::Pending {
            return Err(PlanError::AlreadyProcessed {
                project: id,
                status: project.status,
            });
        }
        project.advance(ProjectStatus::Rejected)?;
        self.store.save_project(&project).await?;
        info!(project = %id, "Project rejected");
        self.record(
            self.event(AuditAction::ProjectRejected)
                .project(id)
                .user(project.student.0),
        )
        .await;
        Ok(project)
    }

    /// Pending projects of `term`, earliest request first.
    pub async fn pending_projects(&self, term: TermId) -> Result<Vec<Project>> {
        let term = self.load_term(term).await?;
        let mut projects = self
            .store
            .find_projects(&ProjectFilter::term(term.id).with_status(ProjectStatus::Pending))
            .await?;
        projects.sort_by(|a, b| ProjectOrder::RequestedAt.compare(a, b));
        Ok(projects)
    }

    #[instrument(skip(self))]
    pub async fn assign_supervisors(&self, term: TermId) -> Result<Vec<SupervisorAssignment>> {
        let term = self.load_term(term).await?;
        let projects = self
            .store
            .find_projects(&ProjectFilter::term(term.id).with_status(ProjectStatus::Approved))
            .await?;
        let faculty = self.store.find_faculty(&FacultyFilter::eligible()).await?;
        let mut loads = FacultyLoads::new(&faculty);
        let assignments =
            algos::assign_supervisors(&projects, &mut loads, &self.config.supervisor_order)?;
        let mut projects = by_project(projects);
        let mut faculty = by_professor(faculty);
        for assignment in &assignments {
            let project = projects
                .get_mut(&assignment.project)
                .ok_or(PlanError::ProjectNotFound(assignment.project))?;
            project.supervisor = Some(assignment.supervisor);
            project.advance(ProjectStatus::SupervisorAssigned)?;
            self.store.save_project(project).await?;
            let professor = faculty
                .get_mut(&assignment.supervisor)
                .ok_or(PlanError::ProfessorNotFound(assignment.supervisor))?;
            professor.current_supervisees += 1;
            self.store.save_professor(professor).await?;
            self.record(
                self.event(AuditAction::SupervisorAssigned)
                    .project(assignment.project)
                    .user(assignment.supervisor.0),
            )
            .await;
        }
        info!(term = %term.name, assigned = %assignments.len(), "Supervisors assigned");
        Ok(assignments)
    }

    #[instrument(skip(self))]
    pub async fn assign_examiners(&self, term: TermId) -> Result<ExaminerRun> {
        let term = self.load_term(term).await?;
        let projects = self
            .store
            .find_projects(&ProjectFilter::term(term.id).with_status(ProjectStatus::TopicApproved))
            .await?;
        let faculty = self.store.find_faculty(&FacultyFilter::eligible()).await?;
        let mut loads = FacultyLoads::new(&faculty);
        let run = algos::assign_examiners(&projects, &mut loads, &self.config.examiner_order)?;
        let mut projects = by_project(projects);
        let mut faculty = by_professor(faculty);
        for assignment in &run.assignments {
            let project = projects
                .get_mut(&assignment.project)
                .ok_or(PlanError::ProjectNotFound(assignment.project))?;
            project.examiner = Some(assignment.examiner);
            project.advance(ProjectStatus::InProgress)?;
            self.store.save_project(project).await?;
            let professor = faculty
                .get_mut(&assignment.examiner)
                .ok_or(PlanError::ProfessorNotFound(assignment.examiner))?;
            professor.current_examinees += 1;
            self.store.save_professor(professor).await?;
            self.record(
                self.event(AuditAction::ExaminerAssigned)
                    .project(assignment.project)
                    .user(assignment.examiner.0),
            )
            .await;
        }
        info!(
            term = %term.name,
            assigned = %run.assignments.len(),
            skipped = %run.skipped.len(),
            "Examiners assigned",
        );
        Ok(run)
    }

    #[instrument(skip(self))]
    pub async fn schedule_defenses(&self, term: TermId) -> Result<DefenseRun> {
        let term = self.load_term(term).await?;
        let projects = self.store.find_projects(&ProjectFilter::term(term.id)).await?;
        let mut book = if self.config.respect_existing_defenses {
            DefenseBook::seeded_from(&projects)
        } else {
            DefenseBook::new()
        };
        let run = algos::schedule_defenses(&projects, &mut book, &self.config.defense_order);
        let mut projects = by_project(projects);
        for defense in &run.scheduled {
            let project = projects
                .get_mut(&defense.project)
                .ok_or(PlanError::ProjectNotFound(defense.project))?;
            project.defense = Some(defense.window);
            project.advance(ProjectStatus::DefenseScheduled)?;
            self.store.save_project(project).await?;
            self.record(
                self.event(AuditAction::DefenseScheduled)
                    .project(defense.project)
                    .details(json!({
                        "window": defense.window.to_string(),
                        "supervisor": defense.supervisor.0,
                        "examiner": defense.examiner.0,
                    })),
            )
            .await;
        }
        info!(
            term = %term.name,
            scheduled = %run.scheduled.len(),
            unscheduled = %run.unscheduled.len(),
            "Defenses scheduled",
        );
        Ok(run)
    }

    /// Add a topic to the project's proposals.
    pub async fn propose_topic(&self, id: ProjectId, topic: &str) -> Result<Project> {
        let mut project = self.load_project(id).await?;
        if project.status != ProjectStatus::TopicProposal {
            project.advance(ProjectStatus::TopicProposal)?;
        }
        project.proposed_topics.push(topic.to_owned());
        self.store.save_project(&project).await?;
        debug!(project = %id, topics = %project.proposed_topics.len(), "Topic proposed");
        self.record(
            self.event(AuditAction::TopicProposed)
                .project(id)
                .details(json!({ "topic": topic })),
        )
        .await;
        Ok(project)
    }

    /// Retain the `index`-th proposed topic. Only the supervisor may do it.
    pub async fn approve_topic(
        &self,
        id: ProjectId,
        professor: ProfessorId,
        index: usize,
    ) -> Result<Project> {
        let mut project = self.load_project(id).await?;
        if project.supervisor != Some(professor) {
            return Err(PlanError::WrongRole {
                professor,
                project: id,
                role: "supervisor",
            });
        }
        let topic = project
            .proposed_topics
            .get(index)
            .cloned()
            .ok_or(PlanError::UnknownTopic { project: id, index })?;
        project.advance(ProjectStatus::TopicApproved)?;
        project.topic = Some(topic);
        self.store.save_project(&project).await?;
        info!(project = %id, "Topic approved");
        self.record(
            self.event(AuditAction::TopicApproved)
                .project(id)
                .user(professor.0)
                .details(json!({ "topic": project.topic })),
        )
        .await;
        Ok(project)
    }

    /// Append candidate defense times proposed by a committee member.
    pub async fn submit_defense_times(
        &self,
        id: ProjectId,
        professor: ProfessorId,
        windows: &[TimeWindow],
    ) -> Result<Project> {
        let mut project = self.load_project(id).await?;
        if !project.is_committee_member(professor) {
            return Err(PlanError::WrongRole {
                professor,
                project: id,
                role: "committee member",
            });
        }
        if project.defense.is_some() {
            return Err(PlanError::AlreadyProcessed {
                project: id,
                status: project.status,
            });
        }
        if project.status != ProjectStatus::InProgress {
            return Err(PlanError::InvalidTransition {
                project: id,
                from: project.status,
                to: ProjectStatus::DefenseScheduled,
            });
        }
        project
            .proposed_defense_times
            .extend(windows.iter().map(|&window| CandidateTime {
                window,
                submitted_by: professor,
            }));
        self.store.save_project(&project).await?;
        debug!(
            project = %id,
            professor = %professor,
            submitted = %windows.len(),
            "Defense times submitted",
        );
        self.record(
            self.event(AuditAction::DefenseTimesSubmitted)
                .project(id)
                .user(professor.0)
                .details(json!({
                    "windows": windows.iter().map(ToString::to_string).collect::<Vec<_>>(),
                })),
        )
        .await;
        Ok(project)
    }

    /// Grade a defended project, which completes it. Only the examiner may
    /// do it.
    pub async fn submit_grade(
        &self,
        id: ProjectId,
        professor: ProfessorId,
        grade: f64,
    ) -> Result<Project> {
        let mut project = self.load_project(id).await?;
        if project.examiner != Some(professor) {
            return Err(PlanError::WrongRole {
                professor,
                project: id,
                role: "examiner",
            });
        }
        if !GRADE_RANGE.contains(&grade) {
            return Err(PlanError::InvalidGrade(grade));
        }
        project.advance(ProjectStatus::Completed)?;
        project.grade = Some(grade);
        self.store.save_project(&project).await?;
        info!(project = %id, grade, "Grade submitted");
        self.record(
            self.event(AuditAction::GradeSubmitted)
                .project(id)
                .user(professor.0)
                .details(json!({ "grade": grade })),
        )
        .await;
        Ok(project)
    }

    pub async fn statistics(&self, term: TermId) -> Result<Statistics> {
        let term = self.load_term(term).await?;
        let projects = self.store.find_projects(&ProjectFilter::term(term.id)).await?;
        Ok(stats::statistics(&term, &projects))
    }
}

fn by_project(projects: Vec<Project>) -> HashMap<ProjectId, Project> {
    projects.into_iter().map(|p| (p.id, p)).collect()
}

fn by_professor(faculty: Vec<Professor>) -> HashMap<ProfessorId, Professor> {
    faculty.into_iter().map(|p| (p.id, p)).collect()
}
