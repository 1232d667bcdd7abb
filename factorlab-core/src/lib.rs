//! FactorLab Core: domain types, data sources, cleaning, and OLS.
//!
//! This crate contains everything below the pipeline:
//! - Domain types (month keys, price bars, factor rows, joined sample)
//! - Data sources (Yahoo Finance, Ken French data library, local files, snapshots)
//! - Return computation and the month-keyed inner join
//! - Closed-form OLS with in-crate distribution math
//! - Sample fingerprinting for reproducibility checks

pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod model;
