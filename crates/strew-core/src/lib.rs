//! Strew Core - shared types for the strew workload scheduler
//!
//! This crate provides:
//! - Pod identity and eligibility helpers
//! - Watch event types shared by the cluster client and the scheduling loop
//! - Re-exports of the Kubernetes resource types

pub mod events;
pub mod pod;

// Re-export commonly used types
pub use events::{WatchEvent, WatchEventType};
pub use pod::{is_unscheduled, primary_label, requests_scheduler, PodRef};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
