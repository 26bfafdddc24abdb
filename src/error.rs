//! Error taxonomy for the protocol: codec failures, queue failures, and
//! config/schema failures. None of these are exceptions — every fallible
//! operation in this crate returns a `Result`, and these are the `E` side.

use std::fmt;

/// Failures that can occur while encoding or decoding a message envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The buffer ended before a primitive or tail could be fully read.
    Truncated,
    /// A CBOR major type didn't match what the field expected.
    UnexpectedMajorType { expected: &'static str, found: u8 },
    /// The leading `uint type` did not match any recognized message type.
    UnknownType(u32),
    /// An Inspector envelope's `kind` did not match any recognized kind.
    UnknownInspectorKind(i32),
    /// Channel-type messages are process-local only and never appear on the wire.
    ChannelNotOnWire,
    /// A string field was not valid UTF-8.
    InvalidUtf8,
    /// A length prefix (string, array, map) was larger than the remaining buffer
    /// could possibly hold.
    LengthOutOfRange { len: u64 },
    /// A nested config object (an Inspector OPEN/SET_CONFIG tail) failed to
    /// decode; boxed to avoid growing every `CodecError` by `ConfigError`'s size.
    Config(Box<ConfigError>),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "buffer truncated before value was fully read"),
            CodecError::UnexpectedMajorType { expected, found } => {
                write!(f, "expected {expected}, found major type {found}")
            }
            CodecError::UnknownType(t) => write!(f, "unknown message type: {t}"),
            CodecError::UnknownInspectorKind(k) => write!(f, "unknown inspector kind: {k}"),
            CodecError::ChannelNotOnWire => {
                write!(f, "channel-type messages are not supported on the wire")
            }
            CodecError::InvalidUtf8 => write!(f, "string field was not valid utf-8"),
            CodecError::LengthOutOfRange { len } => {
                write!(f, "length prefix {len} exceeds remaining buffer")
            }
            CodecError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<ConfigError> for CodecError {
    fn from(e: ConfigError) -> Self {
        CodecError::Config(Box::new(e))
    }
}

/// Failures from the blocking message queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueError {
    /// The consumer side has been dropped; no further messages can be written.
    Disconnected,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Disconnected => write!(f, "queue consumer has disconnected"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Failures from the embedded configuration object's schema registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A field's declared type in the known schema disagreed with the value
    /// actually present on the wire.
    FieldTypeMismatch { field: String },
    /// The config referenced a field name not present in its schema.
    UnknownField { field: String },
    /// A concurrent registration under the same `global_name` raced this one;
    /// per the registry's append-only contract, the loser fails rather than
    /// clobbering the winner's schema.
    SchemaCollision { global_name: String },
    /// The wire payload used a CBOR major type `populate_from_cbor` doesn't
    /// know how to infer a field type from (only uint/nint, text, and
    /// float/bool-as-float-subtype are valid for creative mode).
    UninferableFieldType { field: String },
    Codec(CodecError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FieldTypeMismatch { field } => {
                write!(f, "field '{field}' did not match its declared schema type")
            }
            ConfigError::UnknownField { field } => {
                write!(f, "field '{field}' is not part of this config's schema")
            }
            ConfigError::SchemaCollision { global_name } => write!(
                f,
                "schema '{global_name}' was registered concurrently by another decode"
            ),
            ConfigError::UninferableFieldType { field } => write!(
                f,
                "field '{field}' has a wire type creative mode cannot infer a schema type from"
            ),
            ConfigError::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<CodecError> for ConfigError {
    fn from(e: CodecError) -> Self {
        ConfigError::Codec(e)
    }
}
