//! Shared response handling: drain the body, then decide on the status.
//!
//! Every operation goes through [`interpret`] so no branch can return while
//! leaving a response body unread.

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{trace, warn};

use crate::error::{CoordinationError, CoordinationResult};
use crate::transport::Response;

/// A fully drained response.
#[derive(Debug)]
pub(crate) struct Drained {
    pub(crate) status: StatusCode,
    body: CoordinationResult<Bytes>,
}

impl Drained {
    /// The body, for branches whose result depends on it. A failure while
    /// draining surfaces here and only here.
    pub(crate) fn into_body(self) -> CoordinationResult<Bytes> {
        self.body
    }

    /// The fallback branch of every decision table.
    pub(crate) fn unexpected<T>(self) -> CoordinationResult<T> {
        Err(CoordinationError::UnexpectedStatusCode(self.status))
    }
}

/// Consume the whole body of `response`, then hand status and body to
/// `decide`.
pub(crate) async fn interpret<T, F>(response: Response, decide: F) -> CoordinationResult<T>
where
    F: FnOnce(Drained) -> CoordinationResult<T>,
{
    let Response { status, body } = response;
    let body = body.bytes().await;
    match &body {
        Ok(bytes) => trace!(%status, len = bytes.len(), "drained response body"),
        Err(err) => warn!(%status, ?err, "failed to drain response body"),
    }
    decide(Drained { status, body })
}
