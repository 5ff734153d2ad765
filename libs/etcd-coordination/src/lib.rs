//! # etcd-coordination
//!
//! Cluster bootstrap coordination on top of the etcd v2 keys API.
//!
//! This library provides:
//! - **Key namespace** for one cluster's nodes directory and seed lock.
//! - **Node codec** turning caller-defined node values into URL-safe key
//!   segments and back, through a pluggable [`NodeSerializer`].
//! - **Coordination operations**: list nodes, acquire the seed lock, register
//!   and refresh the caller's own entry, each with an explicit status-code
//!   decision table.
//! - **Transport seam** with a `reqwest`-backed implementation.
//!
//! ## Example
//!
//! ```no_run
//! use std::{net::SocketAddr, time::Duration};
//! use etcd_coordination::{
//!     Coordination, EtcdCoordination, FromStrSerializer, HttpTransport, KeyNamespace,
//! };
//!
//! # async fn run() -> Result<(), etcd_coordination::CoordinationError> {
//! let namespace = KeyNamespace::new("localhost", 2379, "constructr", "demo")?;
//! let coordination = EtcdCoordination::new(
//!     namespace,
//!     FromStrSerializer::<SocketAddr>::new(),
//!     HttpTransport::new(None)?,
//! );
//! let me: SocketAddr = "10.0.0.1:2552".parse().unwrap();
//! if coordination.list_nodes().await?.is_empty()
//!     && coordination.acquire_lock(Duration::from_secs(20)).await?.is_acquired()
//! {
//!     // seed the cluster
//! }
//! coordination.register_self(&me, Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod coordination;
pub mod error;
pub mod http;
pub mod keys;
pub mod models;
mod response;
pub mod transport;

// Re-export key types for convenient access
pub use codec::{FromStrSerializer, JsonSerializer, NodeCodec, NodeSerializer};
pub use coordination::{Coordination, EtcdCoordination};
pub use error::{CoordinationError, CoordinationResult};
pub use http::HttpTransport;
pub use keys::{DEFAULT_PREFIX, KeyNamespace};
pub use models::{LockResult, RegistrationOutcome, ttl_seconds};
pub use transport::{Body, Request, Response, Transport};
