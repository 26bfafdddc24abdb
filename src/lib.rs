//! The Analyzer Control and Data Protocol (ACDP): a typed message algebra,
//! a self-describing CBOR-like binary codec, and a queue-driven exchange
//! between an analyzer worker and its client.
//!
//! The crate is organized bottom-up:
//!
//! - [`packer`] — C1, the length-prefixed CBOR-style primitives.
//! - [`time`], [`channel`], [`config`], [`inspector`], [`message`] — C2, the
//!   typed message values, including the Inspector sub-protocol and the
//!   embedded configuration object's schema registry.
//! - [`codec`] — C3, per-variant serialize/deserialize dispatch.
//! - [`queue`] — C4, the blocking multi-producer FIFO and its perishable
//!   message expiry policy.
//! - [`sender`] — C5, convenience constructors from DSP/source outputs.
//! - [`source`] — the trait boundary toward external collaborators (DSP
//!   pipelines, SDR hardware/file drivers), neither implemented here.
//!
//! Concurrency is synchronous and thread-based throughout; there is no
//! async runtime in the core.

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod inspector;
pub mod message;
pub mod packer;
pub mod queue;
pub mod sender;
pub mod source;
pub mod time;

pub use channel::Channel;
pub use codec::{deserialize, deserialize_partial, dispose, serialize};
pub use config::{ConfigDescriptor, ConfigObject, FieldType, FieldValue, SchemaRegistry};
pub use error::{CodecError, ConfigError, QueueError};
pub use inspector::{Inspector, InspectorKind, InspectorMessage};
pub use message::{Message, MessageType, PsdHeader, PsdMessage, SamplesMessage, Status};
pub use packer::{Packer, Unpacker};
pub use queue::{ExpiryTracker, MessageQueue, DEFAULT_EXPIRE_DELTA};
pub use time::Timestamp;
