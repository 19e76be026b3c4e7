// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting file concerns used by several layers:
//
//   project_root.rs  - where every input and output lives,
//                      resolved from one root directory
//
//   feature_store.rs - .npy / .npz reading and writing of
//                      feature arrays
//
//   results.rs       - CSV and JSON result tables
//
//   ids.rs           - random participant IDs
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Project-root path resolution
pub mod project_root;

/// Feature array persistence
pub mod feature_store;

/// Result table writers
pub mod results;

/// Anonymous participant identifiers
pub mod ids;
