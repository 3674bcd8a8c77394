//! Strew Scheduler - spread-first Pod to Node placement
//!
//! This crate provides:
//! - Filter predicates (node label selector, taints, required node affinity)
//! - Spread scoring (fewest workloads, co-located workloads weighted)
//! - Pod binding with retry and conflict handling
//! - The event-driven scheduling loop

pub mod error;
pub mod types;
pub mod filter;
pub mod score;
pub mod binder;
pub mod scheduler;

// Re-export commonly used types
pub use binder::{BindOutcome, Binder, BinderConfig};
pub use error::{SchedulerError, Result};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use types::{SchedulingContext, FilterResult, ScheduleOutcome, SchedulerStats, ScoreResult};
