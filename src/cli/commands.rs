// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// One subcommand per analysis. Each Args struct converts into
// the request type of its use case, so the application layer
// never sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    extract_use_case::ExtractRequest,
    similarity_use_case::CkaRequest,
    simulate_use_case::SimulateRequest,
};
use crate::domain::task::Task;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract and cache feature arrays for the stimulus set
    Extract(ExtractArgs),

    /// Write one caption per stimulus for text embedders
    Prompts,

    /// Linear CKA between cached features and a target
    Cka(CkaArgs),

    /// Class-separation R² of one feature array
    ClassSep(FeatureArgs),

    /// TwoNN intrinsic dimension of cached features
    IntrinsicDim(OptionalFeatureArgs),

    /// Agreement with NIGHTS human triplet judgements
    Nights,

    /// Spearman correlation with Peterson similarity ratings
    Peterson,

    /// Delete NIGHTS images no kept triplet refers to
    PruneNights(PruneArgs),

    /// Parse raw experiment logs into tidy tables
    Parse(TaskArgs),

    /// Replay an experiment through a sequential learner
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Feature names, e.g. task, pca, clip_ViT-B/32, gLocal_clip_ViT-B/32
    #[arg(required = true)]
    pub features: Vec<String>,

    /// Recompute arrays that are already cached
    #[arg(long)]
    pub overwrite: bool,
}

impl From<ExtractArgs> for ExtractRequest {
    fn from(a: ExtractArgs) -> Self {
        ExtractRequest {
            features:   a.features,
            use_cached: !a.overwrite,
        }
    }
}

#[derive(Args, Debug)]
pub struct CkaArgs {
    /// Feature name to compare; every cached feature when omitted
    #[arg(long)]
    pub features: Option<String>,

    /// Feature name everything is compared against
    #[arg(long, default_value = "task")]
    pub target: String,
}

impl From<CkaArgs> for CkaRequest {
    fn from(a: CkaArgs) -> Self {
        CkaRequest {
            features: a.features,
            target:   a.target,
        }
    }
}

#[derive(Args, Debug)]
pub struct FeatureArgs {
    /// Feature name of a cached array
    #[arg(long)]
    pub features: String,
}

#[derive(Args, Debug)]
pub struct OptionalFeatureArgs {
    /// Feature name; every cached feature when omitted
    #[arg(long)]
    pub features: Option<String>,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Only report what would be deleted
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct TaskArgs {
    /// reward_learning or category_learning
    #[arg(long)]
    pub task: Task,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// reward_learning or category_learning
    #[arg(long)]
    pub task: Task,

    /// Feature name of the representation the learner sees
    #[arg(long)]
    pub features: String,
}

impl From<SimulateArgs> for SimulateRequest {
    fn from(a: SimulateArgs) -> Self {
        SimulateRequest {
            task:     a.task,
            features: a.features,
        }
    }
}
