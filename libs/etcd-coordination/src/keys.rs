//! Key namespace for one coordination domain.
//!
//! Every key lives under `/<prefix>/<cluster_name>` inside the store's v2 keys
//! root. The namespace is a pure translator from (endpoint, prefix, cluster)
//! to URLs and holds no mutable state.

use reqwest::Url;

use crate::error::{CoordinationError, CoordinationResult};

/// Default namespace prefix.
pub const DEFAULT_PREFIX: &str = "constructr";

/// Path of the etcd v2 keys API relative to the endpoint.
const KEYS_ROOT: &str = "/v2/keys";

const NODES: &str = "nodes";
const LOCK: &str = "lock";

/// Hierarchical key builder for a coordination domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    endpoint: Url,
    keys_root: String,
    prefix: String,
    cluster_name: String,
    nodes_path: String,
    lock_path: String,
}

impl KeyNamespace {
    /// Create a namespace for the store at `http://<host>:<port>`.
    ///
    /// Returns an error if the host is unusable or if the prefix or cluster
    /// name contain characters the store would not echo back verbatim.
    pub fn new(host: &str, port: u16, prefix: &str, cluster_name: &str) -> CoordinationResult<Self> {
        if host.trim().is_empty() || host.contains(['/', '?', '#', '@']) {
            return Err(CoordinationError::Config(format!("invalid etcd host '{host}'")));
        }
        let endpoint = Url::parse(&format!("http://{host}:{port}/")).map_err(|e| {
            CoordinationError::Config(format!("invalid etcd address '{host}:{port}': {e}"))
        })?;
        Self::with_endpoint(endpoint, prefix, cluster_name)
    }

    /// Create a namespace for a store reachable at an arbitrary base URL
    /// (e.g. `https://etcd.internal/` or behind a path-routing proxy).
    pub fn with_endpoint(endpoint: Url, prefix: &str, cluster_name: &str) -> CoordinationResult<Self> {
        if endpoint.cannot_be_a_base() || endpoint.host_str().is_none() {
            return Err(CoordinationError::Config(format!(
                "etcd endpoint '{endpoint}' is not a base url"
            )));
        }
        validate_component("prefix", prefix)?;
        validate_component("cluster_name", cluster_name)?;

        let keys_root = format!("{}{KEYS_ROOT}", endpoint.path().trim_end_matches('/'));
        let base_path = format!("/{prefix}/{cluster_name}");
        Ok(Self {
            endpoint,
            keys_root,
            prefix: prefix.to_owned(),
            cluster_name: cluster_name.to_owned(),
            nodes_path: format!("{base_path}/{NODES}"),
            lock_path: format!("{base_path}/{LOCK}"),
        })
    }

    /// Returns the namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the cluster name.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Key of the nodes directory, as the store reports it in listings.
    pub fn nodes_path(&self) -> &str {
        &self.nodes_path
    }

    /// Key of the seed lock.
    pub fn lock_path(&self) -> &str {
        &self.lock_path
    }

    /// URL of the nodes directory.
    pub fn nodes_url(&self) -> Url {
        self.key_url(&self.nodes_path)
    }

    /// URL of the seed lock.
    pub fn lock_url(&self) -> Url {
        self.key_url(&self.lock_path)
    }

    /// URL of a single node entry, given its encoded identity.
    pub fn node_url(&self, encoded_id: &str) -> Url {
        self.key_url(&format!("{}/{encoded_id}", self.nodes_path))
    }

    /// Recover the encoded identity from a key returned by a nodes listing.
    ///
    /// Inverse of the suffix appended by [`node_url`](Self::node_url). Keys
    /// outside the nodes directory, or nested below a node entry, are rejected.
    pub fn extract_encoded_id<'a>(&self, raw_key: &'a str) -> CoordinationResult<&'a str> {
        raw_key
            .strip_prefix(self.nodes_path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .ok_or_else(|| {
                CoordinationError::Decode(format!(
                    "key '{raw_key}' is not a node entry under '{}'",
                    self.nodes_path
                ))
            })
    }

    fn key_url(&self, key_path: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_path(&format!("{}{key_path}", self.keys_root));
        url.set_query(None);
        url
    }
}

/// Each `/`-separated segment must be non-empty and made of unreserved URL
/// characters, so keys survive the trip through the store unchanged.
fn validate_component(name: &str, value: &str) -> CoordinationResult<()> {
    if value.trim().is_empty() {
        return Err(CoordinationError::Config(format!("{name} is empty")));
    }
    for segment in value.split('/') {
        if segment.is_empty() {
            return Err(CoordinationError::Config(format!(
                "{name} '{value}' contains an empty path segment"
            )));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
        {
            return Err(CoordinationError::Config(format!(
                "{name} '{value}' contains characters outside [A-Za-z0-9-._~]"
            )));
        }
    }
    Ok(())
}
