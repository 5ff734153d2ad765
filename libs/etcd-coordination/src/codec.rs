//! Node serialization and the reversible identity encoding used for node keys.
//!
//! Callers decide how a node value is written as a string by supplying a
//! [`NodeSerializer`]. [`NodeCodec`] turns that string into a key segment made
//! of URL-safe base64 characters only, and back.

use std::{fmt, marker::PhantomData, str::FromStr};

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{CoordinationError, CoordinationResult};

/// URL-safe base64, padded on encode and lenient about padding on decode so
/// that keys written by other clients without padding still decode.
const IDENTITY: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Caller-supplied conversion between a node value and its string form.
///
/// `deserialize(&serialize(node))` must give back an equal node for identities
/// to survive a listing.
pub trait NodeSerializer: Send + Sync + fmt::Debug + 'static {
    /// The node type being coordinated.
    type Node: Send + Sync;

    /// Write a node as a string.
    fn serialize(&self, node: &Self::Node) -> CoordinationResult<String>;

    /// Parse a node back from its string form.
    fn deserialize(&self, value: &str) -> CoordinationResult<Self::Node>;
}

/// Serializer for any type with matching `Display` and `FromStr`
/// implementations, e.g. `String` or `SocketAddr`.
pub struct FromStrSerializer<T>(PhantomData<fn() -> T>);

impl<T> FromStrSerializer<T> {
    /// Create a new serializer.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FromStrSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FromStrSerializer")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T> NodeSerializer for FromStrSerializer<T>
where
    T: fmt::Display + FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    type Node = T;

    fn serialize(&self, node: &T) -> CoordinationResult<String> {
        Ok(node.to_string())
    }

    fn deserialize(&self, value: &str) -> CoordinationResult<T> {
        value.parse::<T>().map_err(|e| {
            CoordinationError::Decode(format!("failed to parse node '{value}': {e}"))
        })
    }
}

/// Serializer that stores nodes as JSON documents.
pub struct JsonSerializer<T>(PhantomData<fn() -> T>);

impl<T> JsonSerializer<T> {
    /// Create a new serializer.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonSerializer")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T> NodeSerializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Node = T;

    fn serialize(&self, node: &T) -> CoordinationResult<String> {
        serde_json::to_string(node).map_err(|e| CoordinationError::Codec(e.to_string()))
    }

    fn deserialize(&self, value: &str) -> CoordinationResult<T> {
        serde_json::from_str(value).map_err(|e| CoordinationError::Decode(e.to_string()))
    }
}

/// Adapter from node values to namespace-safe key segments.
#[derive(Debug, Clone, Default)]
pub struct NodeCodec<S> {
    serializer: S,
}

impl<S: NodeSerializer> NodeCodec<S> {
    /// Wrap a caller-supplied serializer.
    pub fn new(serializer: S) -> Self {
        Self { serializer }
    }

    /// Returns the wrapped serializer.
    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// The serialized form of a node, as stored in its entry's value.
    pub fn serialize(&self, node: &S::Node) -> CoordinationResult<String> {
        self.serializer.serialize(node)
    }

    /// Encode a node as a key segment.
    ///
    /// An empty serialized form is rejected: its segment would be empty and
    /// the entry would land on the nodes directory key itself.
    pub fn encode_identity(&self, node: &S::Node) -> CoordinationResult<String> {
        let serialized = self.serializer.serialize(node)?;
        if serialized.is_empty() {
            return Err(CoordinationError::Codec(
                "node serializes to an empty string".into(),
            ));
        }
        Ok(encode_segment(&serialized))
    }

    /// Decode a key segment back into a node.
    pub fn decode_identity(&self, segment: &str) -> CoordinationResult<S::Node> {
        let serialized = decode_segment(segment)?;
        self.serializer.deserialize(&serialized)
    }
}

/// URL-safe base64 of the UTF-8 bytes of `value`.
pub fn encode_segment(value: &str) -> String {
    IDENTITY.encode(value.as_bytes())
}

/// Inverse of [`encode_segment`].
pub fn decode_segment(segment: &str) -> CoordinationResult<String> {
    let bytes = IDENTITY.decode(segment).map_err(|e| {
        CoordinationError::Decode(format!("node key '{segment}' is not url-safe base64: {e}"))
    })?;
    String::from_utf8(bytes).map_err(|e| {
        CoordinationError::Decode(format!("node key '{segment}' is not valid utf-8: {e}"))
    })
}
