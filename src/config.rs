use crate::algos::ProjectOrder;
use crate::audit::ActorId;
use crate::service::PlannerConfig;
use eyre::{Result, WrapErr};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_FILE: &str = "rplanner.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub planner: ActorConfig,
    #[serde(default)]
    pub ordering: OrderingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorConfig {
    #[serde(default)]
    pub actor: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderingConfig {
    pub supervisors: ProjectOrder,
    pub examiners: ProjectOrder,
    pub defenses: ProjectOrder,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub respect_existing_defenses: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            respect_existing_defenses: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot load configuration file {}", path.display()))?;
        Self::parse(&content)
            .wrap_err_with(|| format!("cannot parse configuration file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            actor: ActorId(self.planner.actor),
            supervisor_order: self.ordering.supervisors,
            examiner_order: self.ordering.examiners,
            defense_order: self.ordering.defenses,
            respect_existing_defenses: self.scheduler.respect_existing_defenses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_database_is_mandatory() {
        let config = Config::parse("[database]\nurl = \"sqlite::memory:\"\n").unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        let planner = config.planner_config();
        assert_eq!(planner.actor, ActorId(0));
        assert_eq!(planner.supervisor_order, ProjectOrder::RequestedAt);
        assert!(planner.respect_existing_defenses);
        assert!(Config::parse("[planner]\nactor = 3\n").is_err());
    }

    #[test]
    fn full_file() {
        let config = Config::parse(
            r#"
            [database]
            url = "mysql://planner@localhost/planner"

            [planner]
            actor = 12

            [ordering]
            supervisors = "id"
            defenses = "as-loaded"

            [scheduler]
            respect_existing_defenses = false
            "#,
        )
        .unwrap();
        let planner = config.planner_config();
        assert_eq!(planner.actor, ActorId(12));
        assert_eq!(planner.supervisor_order, ProjectOrder::Id);
        assert_eq!(planner.examiner_order, ProjectOrder::RequestedAt);
        assert_eq!(planner.defense_order, ProjectOrder::AsLoaded);
        assert!(!planner.respect_existing_defenses);
    }

    #[test]
    fn unknown_order_is_rejected() {
        assert!(
            Config::parse("[database]\nurl = \"x\"\n[ordering]\nsupervisors = \"random\"\n")
                .is_err()
        );
    }

    #[test]
    fn missing_file() {
        let err = Config::load(Path::new("/nonexistent/rplanner.toml")).unwrap_err();
        assert!(format!("{err}").contains("cannot load configuration file"));
    }
}
