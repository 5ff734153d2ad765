//! Coordination operations against the etcd v2 keys API.
//!
//! | operation       | request                                  | ok    | benign         |
//! |-----------------|------------------------------------------|-------|----------------|
//! | `list_nodes`    | GET  `<nodes>`                           | 200   | 404 -> empty   |
//! | `acquire_lock`  | PUT  `<lock>?prevExist=false&ttl=`       | 201   | 412 -> Failure |
//! | `register_self` | PUT  `<nodes>/<id>?ttl=&value=`          | 201   |                |
//! | `refresh_self`  | PUT  `<nodes>/<id>?ttl=&value=`          | 200   |                |
//!
//! Any other status is [`CoordinationError::UnexpectedStatusCode`]. Nothing
//! here retries; that is up to the caller.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::codec::{NodeCodec, NodeSerializer};
use crate::error::{CoordinationError, CoordinationResult};
use crate::keys::KeyNamespace;
use crate::models::{Listing, LockResult, RegistrationOutcome, ttl_seconds};
use crate::response::interpret;
use crate::transport::{Request, Transport};

/// Membership discovery, seed locking and self registration for one cluster.
///
/// Implemented by [`EtcdCoordination`]; bootstrap logic should be written
/// against this trait.
#[async_trait]
pub trait Coordination: Send + Sync + fmt::Debug {
    /// The node type being coordinated.
    type Node: Send + Sync;

    /// All currently registered nodes, in no particular order.
    ///
    /// A cluster nobody has registered with yet has no nodes; that is not an
    /// error.
    async fn list_nodes(&self) -> CoordinationResult<Vec<Self::Node>>;

    /// Try to take the seed lock for `ttl`. `LockResult::Failure` means the
    /// lock is currently held by someone else.
    async fn acquire_lock(&self, ttl: Duration) -> CoordinationResult<LockResult>;

    /// Create this node's entry. Only a fresh creation counts as success.
    async fn register_self(
        &self,
        node: &Self::Node,
        ttl: Duration,
    ) -> CoordinationResult<RegistrationOutcome>;

    /// Extend the lease on this node's existing entry. Only an update of an
    /// existing entry counts as success.
    async fn refresh_self(
        &self,
        node: &Self::Node,
        ttl: Duration,
    ) -> CoordinationResult<RegistrationOutcome>;
}

/// [`Coordination`] backed by etcd, over any [`Transport`].
#[derive(Debug)]
pub struct EtcdCoordination<T, S> {
    namespace: KeyNamespace,
    codec: NodeCodec<S>,
    transport: T,
}

impl<T, S> EtcdCoordination<T, S>
where
    T: Transport,
    S: NodeSerializer,
{
    /// Create a coordination instance for `namespace`.
    pub fn new(namespace: KeyNamespace, serializer: S, transport: T) -> Self {
        Self {
            namespace,
            codec: NodeCodec::new(serializer),
            transport,
        }
    }

    /// Returns the key namespace.
    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// Returns the node codec.
    pub fn codec(&self) -> &NodeCodec<S> {
        &self.codec
    }

    /// Fails on the first entry that does not decode.
    fn decode_listing(&self, body: &[u8]) -> CoordinationResult<Vec<S::Node>> {
        Listing::decode(body)?
            .node
            .nodes
            .iter()
            .map(|entry| {
                let id = self.namespace.extract_encoded_id(&entry.key)?;
                self.codec.decode_identity(id)
            })
            .collect()
    }

    fn self_request(&self, node: &S::Node, ttl: Duration) -> CoordinationResult<Request> {
        let url = self.namespace.node_url(&self.codec.encode_identity(node)?);
        Ok(Request::put(url)
            .query("ttl", &ttl_seconds(ttl).to_string())
            .query("value", &self.codec.serialize(node)?))
    }

    /// register and refresh send the same request and differ only in which
    /// status they accept
    async fn write_self(
        &self,
        node: &S::Node,
        ttl: Duration,
        accepted: StatusCode,
        outcome: RegistrationOutcome,
    ) -> CoordinationResult<RegistrationOutcome> {
        let request = self.self_request(node, ttl)?;
        let response = self.transport.send(request).await?;
        interpret(response, |drained| {
            if drained.status == accepted {
                debug!(?outcome, cluster = self.namespace.cluster_name(), "wrote self entry");
                Ok(outcome)
            } else {
                drained.unexpected()
            }
        })
        .await
    }
}

#[async_trait]
impl<T, S> Coordination for EtcdCoordination<T, S>
where
    T: Transport,
    S: NodeSerializer,
{
    type Node = S::Node;

    async fn list_nodes(&self) -> CoordinationResult<Vec<S::Node>> {
        let response = self
            .transport
            .send(Request::get(self.namespace.nodes_url()))
            .await?;
        interpret(response, |drained| {
            let status = drained.status;
            match status {
                StatusCode::OK => {
                    let nodes = self.decode_listing(&drained.into_body()?)?;
                    debug!(count = nodes.len(), "listed nodes");
                    Ok(nodes)
                }
                StatusCode::NOT_FOUND => {
                    debug!(
                        path = self.namespace.nodes_path(),
                        "nodes directory does not exist yet"
                    );
                    Ok(Vec::new())
                }
                _ => drained.unexpected(),
            }
        })
        .await
    }

    async fn acquire_lock(&self, ttl: Duration) -> CoordinationResult<LockResult> {
        if ttl.is_zero() {
            return Err(CoordinationError::InvalidTtl);
        }
        let request = Request::put(self.namespace.lock_url())
            .query("prevExist", "false")
            .query("ttl", &ttl_seconds(ttl).to_string());
        let response = self.transport.send(request).await?;
        interpret(response, |drained| {
            let status = drained.status;
            let result = match status {
                StatusCode::CREATED => LockResult::Success,
                StatusCode::PRECONDITION_FAILED => LockResult::Failure,
                _ => return drained.unexpected(),
            };
            debug!(?result, path = self.namespace.lock_path(), "lock attempt finished");
            Ok(result)
        })
        .await
    }

    async fn register_self(
        &self,
        node: &S::Node,
        ttl: Duration,
    ) -> CoordinationResult<RegistrationOutcome> {
        self.write_self(node, ttl, StatusCode::CREATED, RegistrationOutcome::SelfAdded)
            .await
    }

    async fn refresh_self(
        &self,
        node: &S::Node,
        ttl: Duration,
    ) -> CoordinationResult<RegistrationOutcome> {
        self.write_self(node, ttl, StatusCode::OK, RegistrationOutcome::Refreshed)
            .await
    }
}
