//! Strew Client - cluster API access for the strew scheduler
//!
//! This crate provides:
//! - The `ClusterClient` trait the scheduling loop is written against
//! - An HTTP implementation speaking Kubernetes-style REST and watch streams
//! - An in-memory mock for tests

pub mod error;
pub mod http;
pub mod mock;
pub mod traits;
pub mod watch;

// Re-export primary types
pub use error::{ClientError, Result};
pub use http::HttpClusterClient;
pub use mock::MockClusterClient;
pub use traits::{ClusterClient, PodEventStream};
