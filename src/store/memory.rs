use super::{FacultyFilter, FacultyRepository, ProjectFilter, ProjectRepository, TermRepository};
use crate::audit::{AuditEvent, AuditSink};
use crate::error::{PlanError, Result};
use crate::ledger::Capacity;
use crate::model::{Professor, ProfessorId, Project, ProjectId, Term, TermId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    terms: BTreeMap<TermId, Term>,
    projects: BTreeMap<ProjectId, Project>,
    faculty: BTreeMap<ProfessorId, Professor>,
    events: Vec<AuditEvent>,
    /// Remaining successful saves before every write fails.
    save_budget: Option<usize>,
}

impl State {
    fn spend_save(&mut self) -> Result<()> {
        match &mut self.save_budget {
            Some(0) => Err(PlanError::Store(sqlx::Error::Protocol(
                "memory store write budget exhausted".to_owned(),
            ))),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn next_id<K: Ord>(map: &BTreeMap<K, impl Sized>, id: impl Fn(&K) -> i64) -> i64 {
        map.keys().next_back().map_or(1, |k| id(k) + 1)
    }

    fn store_term(&mut self, term: &Term) {
        if term.is_active {
            for other in self.terms.values_mut() {
                other.is_active = false;
            }
        }
        // Approved counts are owned by `try_reserve`.
        let previous = self.terms.get(&term.id).map(|t| t.capacities.clone());
        let capacities = term
            .capacities
            .iter()
            .map(|c| Capacity {
                current_count: previous
                    .as_ref()
                    .and_then(|ledger| ledger.get(&c.major))
                    .map_or(c.current_count, |p| p.current_count),
                ..c.clone()
            })
            .collect();
        self.terms.insert(
            term.id,
            Term {
                capacities,
                ..term.clone()
            },
        );
    }
}

/// In-memory store, used for tests and dry runs. Clones share their data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new(terms: Vec<Term>, faculty: Vec<Professor>, projects: Vec<Project>) -> Self {
        let state = State {
            terms: terms.into_iter().map(|t| (t.id, t)).collect(),
            projects: projects.into_iter().map(|p| (p.id, p)).collect(),
            faculty: faculty.into_iter().map(|p| (p.id, p)).collect(),
            ..State::default()
        };
        MemoryStore {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Copy the active term, its projects and the whole faculty out of
    /// `source`.
    pub async fn snapshot<S>(source: &S) -> Result<Self>
    where
        S: ProjectRepository + FacultyRepository + TermRepository,
    {
        let term = source.active_term().await?;
        let projects = match &term {
            Some(term) => {
                source
                    .find_projects(&ProjectFilter::term(term.id))
                    .await?
            }
            None => Vec::new(),
        };
        let faculty = source.find_faculty(&FacultyFilter::default()).await?;
        debug!(
            term = ?term.as_ref().map(|t| &t.name),
            projects = %projects.len(),
            faculty = %faculty.len(),
            "Snapshot taken",
        );
        Ok(MemoryStore::new(term.into_iter().collect(), faculty, projects))
    }

    #[cfg(test)]
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.state.lock().await.events.clone()
    }

    /// Let `saves` more writes succeed, then fail all the following ones.
    #[cfg(test)]
    pub async fn fail_saves_after(&self, saves: usize) {
        self.state.lock().await.save_budget = Some(saves);
    }
}

impl ProjectRepository for MemoryStore {
    async fn find_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let state = self.state.lock().await;
        Ok(state
            .projects
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.state.lock().await.projects.get(&id).cloned())
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        let mut state = self.state.lock().await;
        state.spend_save()?;
        state.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn insert_project(&self, project: Project) -> Result<Project> {
        let mut state = self.state.lock().await;
        state.spend_save()?;
        let id = ProjectId(State::next_id(&state.projects, |k| k.0));
        let project = Project { id, ..project };
        state.projects.insert(id, project.clone());
        Ok(project)
    }
}

impl FacultyRepository for MemoryStore {
    async fn find_faculty(&self, filter: &FacultyFilter) -> Result<Vec<Professor>> {
        let state = self.state.lock().await;
        Ok(state
            .faculty
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn professor(&self, id: ProfessorId) -> Result<Option<Professor>> {
        Ok(self.state.lock().await.faculty.get(&id).cloned())
    }

    async fn save_professor(&self, professor: &Professor) -> Result<()> {
        let mut state = self.state.lock().await;
        state.spend_save()?;
        state.faculty.insert(professor.id, professor.clone());
        Ok(())
    }
}

impl TermRepository for MemoryStore {
    async fn active_term(&self) -> Result<Option<Term>> {
        let state = self.state.lock().await;
        Ok(state.terms.values().find(|t| t.is_active).cloned())
    }

    async fn term(&self, id: TermId) -> Result<Option<Term>> {
        Ok(self.state.lock().await.terms.get(&id).cloned())
    }

    async fn save_term(&self, term: &Term) -> Result<()> {
        let mut state = self.state.lock().await;
        state.spend_save()?;
        state.store_term(term);
        Ok(())
    }

    async fn insert_term(&self, term: Term) -> Result<Term> {
        let mut state = self.state.lock().await;
        state.spend_save()?;
        let id = TermId(State::next_id(&state.terms, |k| k.0));
        let term = Term { id, ..term };
        state.store_term(&term);
        Ok(term)
    }

    async fn try_reserve(&self, term: TermId, major: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let term = state
            .terms
            .get_mut(&term)
            .ok_or(PlanError::TermNotFound(term))?;
        Ok(term.capacities.try_reserve(major))
    }

    async fn release(&self, term: TermId, major: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let term = state
            .terms
            .get_mut(&term)
            .ok_or(PlanError::TermNotFound(term))?;
        Ok(term.capacities.release(major))
    }
}

impl AuditSink for MemoryStore {
    async fn record(&self, event: &AuditEvent) -> Result<()> {
        self.state.lock().await.events.push(event.clone());
        Ok(())
    }
}
