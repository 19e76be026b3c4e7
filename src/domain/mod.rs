// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain structs, enums and traits describing the study:
// which task, what a tidy trial row looks like, what a feature
// name means.
//
// Rules for this layer:
//   - NO file I/O
//   - NO numeric arrays or model code
//   - Only plain Rust types and traits

// Which of the two experiments
pub mod task;

// Tidy per-trial rows of both experiments
pub mod trial;

// Feature-name parsing and backend selection
pub mod feature_name;

// Abstractions the data layer implements
pub mod traits;
