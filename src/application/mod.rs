// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers to run one analysis end to end.
//
// Rules for this layer:
//   - No metric or model maths here (Layers 4-5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination: read inputs, call the
//     layers below, write the result files
//
// Every use case takes a `Study` (project root + config) and a
// small request struct, and is run with `execute()`.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Project root and config overrides
pub mod config;

// Feature extraction and text prompts
pub mod extract_use_case;

// CKA, class separation, intrinsic dimension
pub mod similarity_use_case;

// NIGHTS and Peterson human judgement benchmarks
pub mod judgement_use_case;

// Raw logs → tidy behavioural tables
pub mod parse_use_case;

// Sequential-learner simulations
pub mod simulate_use_case;
