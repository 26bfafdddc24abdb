//! Per-variant serialize/deserialize dispatch (C3): the envelope serializer
//! contract and the disposer contract from the external-interfaces section,
//! built on top of the C1 packer and the C2 message values.

use crate::config::SchemaRegistry;
use crate::error::CodecError;
use crate::inspector::InspectorMessage;
use crate::message::{Message, MessageType, PsdMessage, SamplesMessage};
use crate::packer::{Packer, Unpacker};
use crate::time::Timestamp;

/// Writes `uint type` followed by the variant's tail. Channel-type messages
/// are rejected here with a warning: channel updates carry process-local
/// cross-references and were never meant to cross the wire.
pub fn serialize(msg: &Message, registry: &SchemaRegistry) -> Result<Vec<u8>, CodecError> {
    if matches!(msg, Message::Channel(_)) {
        tracing::warn!("channel-type messages are not supported on the wire");
        return Err(CodecError::ChannelNotOnWire);
    }

    let mut p = Packer::new();
    p.uint(msg.message_type().as_u32() as u64)?;
    match msg {
        Message::Channel(_) => unreachable!("rejected above"),
        Message::SourceInfo(blob) => p.bytes(blob)?,
        Message::SourceInit(s) | Message::Eos(s) | Message::ReadError(s) | Message::Internal(s)
        | Message::SamplesLost(s) => Message::pack_status(s, &mut p)?,
        Message::Inspector(insp) => insp.pack(&mut p)?,
        Message::Psd(psd) => psd.pack(&mut p)?,
        Message::Samples(samples) => Message::pack_samples(samples, &mut p)?,
        Message::Throttle { samp_rate } => p.uint(*samp_rate)?,
        Message::Params | Message::GetParams => {}
        Message::Seek(ts) => ts.pack(&mut p)?,
        Message::HistorySize { buffer_length } => p.uint(*buffer_length)?,
        Message::Replay { replay } => p.boolean(*replay)?,
    }
    let _ = registry; // no variant above needs the registry on encode (configs carry their own values)
    Ok(p.into_bytes())
}

/// Peeks the leading `uint type` without decoding a tail.
pub fn deserialize_partial(buffer: &[u8]) -> Result<(MessageType, usize), CodecError> {
    let mut u = Unpacker::new(buffer);
    let raw = u.uint()?;
    let raw = u32::try_from(raw).map_err(|_| CodecError::UnknownType(u32::MAX))?;
    if raw == crate::message::INVALID_MESSAGE_TYPE {
        return Err(CodecError::UnknownType(raw));
    }
    let ty = MessageType::from_u32(raw).ok_or(CodecError::UnknownType(raw))?;
    Ok((ty, u.position()))
}

/// Allocates and returns a freshly owned value on success. On any failure
/// nothing is returned — there is no partially built `Message` to dispose,
/// since construction happens only after every sub-decode has already
/// succeeded.
pub fn deserialize(buffer: &[u8], registry: &SchemaRegistry) -> Result<Message, CodecError> {
    let mut u = Unpacker::new(buffer);
    let raw = u.uint()?;
    let raw = u32::try_from(raw).map_err(|_| CodecError::UnknownType(u32::MAX))?;
    let ty = match MessageType::from_u32(raw) {
        Some(ty) => ty,
        None => {
            tracing::warn!(type_tag = raw, "unknown message type");
            return Err(CodecError::UnknownType(raw));
        }
    };

    Ok(match ty {
        MessageType::Channel => {
            tracing::warn!("channel-type messages are not supported on the wire");
            return Err(CodecError::ChannelNotOnWire);
        }
        MessageType::SourceInfo => Message::SourceInfo(u.bytes()?),
        MessageType::SourceInit => Message::SourceInit(Message::unpack_status(&mut u)?),
        MessageType::Eos => Message::Eos(Message::unpack_status(&mut u)?),
        MessageType::ReadError => Message::ReadError(Message::unpack_status(&mut u)?),
        MessageType::Internal => Message::Internal(Message::unpack_status(&mut u)?),
        MessageType::SamplesLost => Message::SamplesLost(Message::unpack_status(&mut u)?),
        MessageType::Inspector => {
            Message::Inspector(InspectorMessage::unpack(&mut u, registry)?)
        }
        MessageType::Psd => Message::Psd(PsdMessage::unpack(&mut u)?),
        MessageType::Samples => Message::Samples(Message::unpack_samples(&mut u)?),
        MessageType::Throttle => Message::Throttle {
            samp_rate: u.uint()?,
        },
        MessageType::Params => Message::Params,
        MessageType::GetParams => Message::GetParams,
        MessageType::Seek => Message::Seek(Timestamp::unpack(&mut u)?),
        MessageType::HistorySize => Message::HistorySize {
            buffer_length: u.uint()?,
        },
        MessageType::Replay => Message::Replay {
            replay: u.boolean()?,
        },
    })
}

/// Idempotent disposer for symmetry with the envelope contract this codec
/// mirrors. Rust's ownership already frees every owned buffer reachable
/// from `msg` when it's dropped — including a value whose `psd_data` was
/// already `take`n, since that field is simply an empty `Vec` by then — so
/// this function exists only to give callers the explicit two-step
/// "received then disposed" shape, not because anything here leaks without
/// it.
pub fn dispose(msg: Message) {
    drop(msg);
}
