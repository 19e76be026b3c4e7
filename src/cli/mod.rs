// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, opens the study and hands off to one use case. The only
// printing in the crate happens here: one summary line (or
// table) per command. Progress goes through tracing.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::application::{
    config::Study,
    extract_use_case::{prompts, ExtractUseCase},
    judgement_use_case::{NightsUseCase, PetersonUseCase, PruneNightsUseCase},
    parse_use_case::ParseUseCase,
    similarity_use_case::{ClassSeparationUseCase, CkaUseCase, IntrinsicDimUseCase},
    simulate_use_case::SimulateUseCase,
};
use crate::infra::project_root::ProjectRoot;
use commands::Commands;

#[derive(Parser, Debug)]
#[command(
    name = "naturalcogsci",
    version,
    about = "Compare human learning and similarity judgements with machine-learning representations."
)]
pub struct Cli {
    /// Project directory holding data/ and experiments/
    #[arg(long, global = true, env = "NATURALCOGSCI_ROOT")]
    pub root: Option<PathBuf>,

    /// Config overrides; defaults to <root>/naturalcogsci.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn study(&self) -> Result<Study> {
        let root = match &self.root {
            Some(path) => ProjectRoot::new(path),
            None       => ProjectRoot::from_env()?,
        };
        Study::open(root, self.config.clone())
    }

    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        let study = self.study()?;
        tracing::debug!("Project root: {}", study.root.path().display());

        match self.command {
            Commands::Extract(args) => {
                let report = ExtractUseCase::new(&study, args.into()).execute()?;
                println!(
                    "Extracted {} feature arrays ({} already cached).",
                    report.extracted.len(),
                    report.cached.len()
                );
            }
            Commands::Prompts => {
                let path = prompts(&study)?;
                println!("Prompts written to {}", path.display());
            }
            Commands::Cka(args) => {
                let (path, rows) = CkaUseCase::new(&study, args.into()).execute()?;
                for row in &rows {
                    println!("{:<40} {:.4}", row.feature, row.cka);
                }
                println!("Saved to {}", path.display());
            }
            Commands::ClassSep(args) => {
                match ClassSeparationUseCase::new(&study, args.features.clone()).execute()? {
                    Some(r2) => println!("{}: R² = {:.4}", args.features, r2),
                    None     => println!("{} already extracted", args.features),
                }
            }
            Commands::IntrinsicDim(args) => {
                let done = IntrinsicDimUseCase::new(&study, args.features).execute()?;
                for (feature, id) in &done {
                    println!("{:<40} {:.2}", feature, id);
                }
                println!("{} intrinsic dimensions estimated.", done.len());
            }
            Commands::Nights => {
                let results = NightsUseCase::new(&study).execute()?;
                for (model, rate) in &results {
                    println!("{:<40} {:.3}", model, rate);
                }
            }
            Commands::Peterson => {
                let results = PetersonUseCase::new(&study).execute()?;
                for (model, rho) in &results {
                    println!("{:<40} {:.3}", model, rho);
                }
            }
            Commands::PruneNights(args) => {
                let report = PruneNightsUseCase::new(&study, args.dry_run).execute()?;
                let verb   = if args.dry_run { "would be removed" } else { "removed" };
                println!("{} images kept, {} {}.", report.kept, report.removed, verb);
            }
            Commands::Parse(args) => {
                let summary = ParseUseCase::new(&study, args.task).execute()?;
                println!(
                    "{}: {} of {} participants above chance.",
                    args.task, summary.kept, summary.participants
                );
            }
            Commands::Simulate(args) => {
                let report = SimulateUseCase::new(&study, args.into()).execute()?;
                println!(
                    "{} simulated trials saved to {}",
                    report.rows.len(),
                    report.values_path.display()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_root_after_subcommand() {
        let cli = Cli::try_parse_from([
            "naturalcogsci",
            "simulate",
            "--task",
            "category_learning",
            "--features",
            "clip_ViT-B/32",
            "--root",
            "/tmp/study",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/study")));
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.task, crate::domain::task::Task::CategoryLearning);
                assert_eq!(args.features, "clip_ViT-B/32");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_task_rejected() {
        assert!(Cli::try_parse_from(["naturalcogsci", "parse", "--task", "memory"]).is_err());
    }

    #[test]
    fn test_extract_overwrite_disables_cache() {
        let cli = Cli::try_parse_from(["naturalcogsci", "extract", "pca", "task", "--overwrite"]).unwrap();
        let Commands::Extract(args) = cli.command else { panic!("expected extract") };
        let request: crate::application::extract_use_case::ExtractRequest = args.into();
        assert_eq!(request.features, vec!["pca".to_string(), "task".to_string()]);
        assert!(!request.use_cached);
    }
}
