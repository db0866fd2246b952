//! Replica of a legacy travel reimbursement calculator.
//!
//! The [`model`] module holds the deterministic scoring pipeline (features,
//! clusters, tiers, multiplicative and additive adjustments). The
//! [`optimizer`] module searches the pipeline's parameters against labeled
//! cases, and [`dataset`] moves cases and batch results in and out of files.

pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod optimizer;
pub mod telemetry;
