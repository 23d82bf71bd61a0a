//! Analysis and result aggregation modules
//!
//! Combines feature extraction results into final analysis:
//! - Consensus between key estimates
//! - Result types
//! - Batch orchestration and key transitions

pub mod batch;
pub mod consensus;
pub mod result;
