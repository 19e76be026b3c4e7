// ============================================================
// Layer 5 - Representational Similarity Tools
// ============================================================
// Pure numeric functions over [observations, features] arrays.
// Nothing in here reads or writes files; the application layer
// loads the arrays and stores the results.
//
//   cka.rs              - linear centred kernel alignment
//   class_separation.rs - cosine-distance class separation R²
//   intrinsic_dim.rs    - TwoNN intrinsic dimension
//   agreement.rs        - model vs. human triplet choices (NIGHTS)
//   correlation.rs      - Spearman ρ between similarity matrices
//
// Reference: Kriegeskorte et al. (2008) Representational similarity
//            analysis

pub mod cka;
pub mod class_separation;
pub mod intrinsic_dim;

/// Triplet agreement between a representation and human votes
pub mod agreement;

/// Rank correlation of similarity structure
pub mod correlation;
