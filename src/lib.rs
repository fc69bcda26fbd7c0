//! repos-health - pluggable health checks across many repositories
//!
//! Checkers (complexity, git state, secrets, permissions, dependencies,
//! documentation) are registered in a [`checkers::CheckerRegistry`], run by
//! the [`engine::HealthEngine`] over a bounded worker pool with per-task
//! timeouts, retries and a TTL result cache, and aggregated into a
//! [`models::HealthReport`] that any reporter can render.
//!
//! ```no_run
//! use repos_health::checkers::CheckerRegistry;
//! use repos_health::engine::{EngineOptions, EngineSettings, HealthEngine};
//! use repos_health::models::Repository;
//! use std::sync::Arc;
//!
//! let engine = HealthEngine::new(Arc::new(CheckerRegistry::with_builtin()), EngineSettings::default());
//! let report = engine
//!     .run(&[Repository::from_path(".")], &EngineOptions::default())
//!     .unwrap();
//! std::process::exit(report.exit_code());
//! ```

pub mod aggregate;
pub mod cache;
pub mod checkers;
pub mod cli;
pub mod complexity;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod reporters;
