//! Abstract request/response transport.
//!
//! The coordination operations only ever need "send this request, give me the
//! status and a body I can consume". Anything else (pooling, TLS, retries,
//! timeouts) belongs to the [`Transport`] implementation.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode, Url};

use crate::error::CoordinationResult;

/// A request against the store. Query parameters are already part of `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
}

impl Request {
    /// A read of `url`.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
        }
    }

    /// A write to `url`.
    pub fn put(url: Url) -> Self {
        Self {
            method: Method::PUT,
            url,
        }
    }

    /// Append a query parameter, percent-encoding as needed.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }
}

/// A response body that has not been read yet.
///
/// Holding an unread body can pin a connection, so whoever receives a
/// [`Response`] must consume it.
#[async_trait]
pub trait Body: Send + fmt::Debug {
    /// Read the remainder of the body.
    async fn bytes(self: Box<Self>) -> CoordinationResult<Bytes>;
}

/// A response from the store.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub body: Box<dyn Body>,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Body + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }
}

/// Single-method transport seam. Errors are passed to the caller unchanged.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug + 'static {
    async fn send(&self, request: Request) -> CoordinationResult<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: Request) -> CoordinationResult<Response> {
        (**self).send(request).await
    }
}
