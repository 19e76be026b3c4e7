// ============================================================
// Layer 2 - ParseUseCase
// ============================================================
// Raw experiment logs → tidy behavioural tables.
//
//   Step 1: parse every participant       (Layer 4 - data parsers)
//   Step 2: write all.csv and the above-
//           chance subset                 (Layer 4 - chance filter)
//
// Output: data/human_behavioural/<task>/{all,above_chance}.csv

use anyhow::{bail, Result};
use serde::Serialize;

use crate::application::config::Study;
use crate::data::{
    category_parser::CategoryLogParser,
    chance_filter::{write_tables, FilterSummary},
    reward_parser::RewardLogParser,
};
use crate::domain::{
    task::Task,
    traits::{BehaviourSource, TrialRow},
};

pub struct ParseUseCase<'a> {
    study: &'a Study,
    task:  Task,
}

impl<'a> ParseUseCase<'a> {
    pub fn new(study: &'a Study, task: Task) -> Self {
        Self { study, task }
    }

    pub fn execute(&self) -> Result<FilterSummary> {
        let root = &self.study.root;
        let cfg  = &self.study.config;
        let dir  = root.experiment_dir(self.task);

        tracing::info!("Parsing {} logs in '{}'", self.task, dir.display());
        match self.task {
            Task::RewardLearning => self.run(RewardLogParser::new(
                dir,
                cfg.reward_trials,
                cfg.reward_base_pay,
            )),
            Task::CategoryLearning => self.run(CategoryLogParser::new(
                dir,
                cfg.category_trials,
                cfg.category_base_pay,
                cfg.positive_category.clone(),
            )),
        }
    }

    fn run<S>(&self, source: S) -> Result<FilterSummary>
    where
        S: BehaviourSource,
        S::Row: TrialRow + Clone + Serialize,
    {
        let rows = source.load_all()?;
        if rows.is_empty() {
            bail!(
                "No {} participants could be parsed from '{}'",
                self.task,
                self.study.root.experiment_dir(self.task).display()
            );
        }

        write_tables(
            &rows,
            &self.study.root.behavioural_dir(self.task),
            self.study.config.chance_threshold,
        )
    }
}
