// ============================================================
// Layer 3 - Feature Names
// ============================================================
// A feature name is both the CLI argument and the cache key.
// It encodes which backend produces the representation:
//
//   task                          → SPoSE task embedding
//   pca                           → pixel-space PCA baseline
//   gLocal_<base>                 → gLocal transform of <base>
//   clip_<variant>                → CLIP, e.g. clip_ViT-B/32
//   OpenCLIP_<variant>_<dataset>  → OpenCLIP, dataset starts with "laion"
//   Harmonization_<variant>       → harmonized CNNs
//   DreamSim_<variant>            → DreamSim ensembles
//   <m>_slip_<size>               → SLIP/CLIP/SimCLR ViTs from the SLIP release
//   bert*, roberta*, distilbert*,
//   universal_sentence_encoder,
//   ada-002 / text-embedding-ada-002 → text model over the prompts
//   fasttext                      → word vectors of the object names
//   anything else                 → a plain model name
//
// Parsing is pure string work, kept here so it can be tested
// without touching the disk.

use std::collections::BTreeMap;

use crate::infra::project_root::feature_file_stem;

/// The SLIP checkpoints shipped as local weight files
pub const SLIP_VARIANTS: [&str; 9] = [
    "slip_slip_small",
    "clip_slip_small",
    "simclr_slip_small",
    "slip_slip_base",
    "clip_slip_base",
    "simclr_slip_base",
    "slip_slip_large",
    "clip_slip_large",
    "simclr_slip_large",
];

/// Which backend a feature name dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureSource {
    Task,
    Pca,
    /// Transform of an already extracted feature
    GLocal { base: String },
    Text(TextSpec),
    Model(ModelSpec),
}

/// What a text model is given for each stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInput {
    /// "A photo of a <object>", from prompts.txt
    Prompt,
    /// The bare object name, from words.txt
    Word,
}

impl TextInput {
    /// File under data/features/ holding one input per stimulus
    pub fn file_name(self) -> &'static str {
        match self {
            TextInput::Prompt => "prompts.txt",
            TextInput::Word   => "words.txt",
        }
    }
}

/// A language model whose embeddings are produced outside the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpec {
    pub name:      String,
    pub input:     TextInput,
    /// Folder under data/temp/ holding one dump per input line
    pub save_name: String,
}

/// Hugging Face encoder families, matched on the first '-' segment
const TRANSFORMER_FAMILIES: [&str; 3] = ["bert", "roberta", "distilbert"];

impl TextSpec {
    /// `None` when `name` is not a known text model.
    pub fn parse(name: &str) -> Option<Self> {
        let family = name.split('-').next().unwrap_or(name);
        let input = match name {
            "fasttext" => TextInput::Word,
            "universal_sentence_encoder" | "ada-002" | "text-embedding-ada-002" => TextInput::Prompt,
            _ if TRANSFORMER_FAMILIES.contains(&family) => TextInput::Prompt,
            _ => return None,
        };
        Some(Self {
            name: name.to_string(),
            input,
            save_name: feature_file_stem(name),
        })
    }
}

/// A pretrained model as understood by the external extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Key in data/model_configs.json (the full feature name)
    pub config_key: String,
    /// Model family passed to the extractor, e.g. "clip" or "OpenCLIP"
    pub family: String,
    /// Extra constructor parameters, e.g. variant and dataset
    pub parameters: BTreeMap<String, String>,
    /// Folder under data/temp/ holding the activation dumps
    pub save_name: String,
}

impl ModelSpec {
    pub fn parse(name: &str) -> Self {
        let mut parameters = BTreeMap::new();

        let family = if name.contains("slip") {
            name.to_string()
        } else if let Some(variant) = name.strip_prefix("clip_") {
            parameters.insert("variant".to_string(), variant.to_string());
            "clip".to_string()
        } else if let Some(rest) = name.strip_prefix("OpenCLIP_") {
            // OpenCLIP_<variant>_<dataset>, where the dataset starts with "laion"
            let (variant, dataset) = match rest.find("_laion") {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None      => (rest, ""),
            };
            parameters.insert("variant".to_string(), variant.to_string());
            if !dataset.is_empty() {
                parameters.insert("dataset".to_string(), dataset.to_string());
            }
            "OpenCLIP".to_string()
        } else if name.starts_with("Harmonization") {
            let variant = name.rsplit("Harmonization_").next().unwrap_or(name);
            parameters.insert("variant".to_string(), variant.to_string());
            "Harmonization".to_string()
        } else if let Some(variant) = name.strip_prefix("DreamSim_") {
            parameters.insert("variant".to_string(), variant.to_string());
            "DreamSim".to_string()
        } else {
            name.to_string()
        };

        Self {
            config_key: name.to_string(),
            family,
            parameters,
            save_name: feature_file_stem(name),
        }
    }

    pub fn is_slip(&self) -> bool {
        SLIP_VARIANTS.contains(&self.config_key.as_str())
    }
}

impl FeatureSource {
    pub fn parse(name: &str) -> Self {
        match name {
            "task" => FeatureSource::Task,
            "pca"  => FeatureSource::Pca,
            _ if name.contains("gLocal") => {
                let base = name.rsplit("gLocal_").next().unwrap_or(name);
                FeatureSource::GLocal { base: base.to_string() }
            }
            _ => match TextSpec::parse(name) {
                Some(text) => FeatureSource::Text(text),
                None       => FeatureSource::Model(ModelSpec::parse(name)),
            },
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sources() {
        assert_eq!(FeatureSource::parse("task"), FeatureSource::Task);
        assert_eq!(FeatureSource::parse("pca"), FeatureSource::Pca);
        assert_eq!(
            FeatureSource::parse("gLocal_clip_ViT-L/14"),
            FeatureSource::GLocal { base: "clip_ViT-L/14".to_string() }
        );
    }

    #[test]
    fn test_clip_variant_and_save_name() {
        let spec = ModelSpec::parse("clip_ViT-B/32");
        assert_eq!(spec.family, "clip");
        assert_eq!(spec.parameters["variant"], "ViT-B/32");
        assert_eq!(spec.save_name, "clip_ViT-B_32");
    }

    #[test]
    fn test_openclip_variant_and_dataset() {
        let spec = ModelSpec::parse("OpenCLIP_ViT-H-14_laion2b_s32b_b79k");
        assert_eq!(spec.family, "OpenCLIP");
        assert_eq!(spec.parameters["variant"], "ViT-H-14");
        assert_eq!(spec.parameters["dataset"], "laion2b_s32b_b79k");
    }

    #[test]
    fn test_slip_takes_precedence_over_clip_prefix() {
        let spec = ModelSpec::parse("clip_slip_base");
        assert!(spec.is_slip());
        assert_eq!(spec.family, "clip_slip_base");
        assert!(spec.parameters.is_empty());
    }

    #[test]
    fn test_text_models() {
        for name in ["bert", "bert-base-uncased", "roberta-base", "distilbert-base-uncased",
                     "universal_sentence_encoder", "ada-002", "text-embedding-ada-002"] {
            match FeatureSource::parse(name) {
                FeatureSource::Text(spec) => assert_eq!(spec.input, TextInput::Prompt, "{name}"),
                other => panic!("{name} parsed as {other:?}"),
            }
        }
        let FeatureSource::Text(spec) = FeatureSource::parse("fasttext") else { panic!("fasttext") };
        assert_eq!(spec.input, TextInput::Word);
        assert_eq!(spec.input.file_name(), "words.txt");
    }

    #[test]
    fn test_vision_names_are_not_text() {
        assert!(TextSpec::parse("resnet50").is_none());
        assert!(TextSpec::parse("bertha_net").is_none());
        assert!(matches!(FeatureSource::parse("clip_ViT-B/32"), FeatureSource::Model(_)));
    }

    #[test]
    fn test_plain_model() {
        let spec = ModelSpec::parse("resnet50");
        assert_eq!(spec.family, "resnet50");
        assert!(!spec.is_slip());
    }
}
