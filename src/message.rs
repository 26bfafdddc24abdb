//! Message envelope type tags and the per-variant payload types (C2):
//! status, channel list, PSD frame, sample batch, throttle, seek, history
//! size, replay flag, source info, and inspector sub-messages.

use std::fmt;

use crate::channel::Channel;
use crate::error::CodecError;
use crate::inspector::InspectorMessage;
use crate::packer::{Packer, Unpacker};
use crate::time::Timestamp;

/// Reserved sentinel type tag meaning "no valid message" — never produced
/// by `serialize`, only used by callers to mark an empty slot.
pub const INVALID_MESSAGE_TYPE: u32 = 0x8000000;

/// Stable wire values for each recognized message type.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    SourceInfo = 0x0,
    SourceInit = 0x1,
    Channel = 0x2,
    Eos = 0x3,
    ReadError = 0x4,
    Internal = 0x5,
    SamplesLost = 0x6,
    Inspector = 0x7,
    Psd = 0x8,
    Samples = 0x9,
    Throttle = 0xa,
    Params = 0xb,
    GetParams = 0xc,
    Seek = 0xd,
    HistorySize = 0xe,
    Replay = 0xf,
}

impl MessageType {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0x0 => Self::SourceInfo,
            0x1 => Self::SourceInit,
            0x2 => Self::Channel,
            0x3 => Self::Eos,
            0x4 => Self::ReadError,
            0x5 => Self::Internal,
            0x6 => Self::SamplesLost,
            0x7 => Self::Inspector,
            0x8 => Self::Psd,
            0x9 => Self::Samples,
            0xa => Self::Throttle,
            0xb => Self::Params,
            0xc => Self::GetParams,
            0xd => Self::Seek,
            0xe => Self::HistorySize,
            0xf => Self::Replay,
            _ => return None,
        })
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::SourceInfo => "source-info",
            MessageType::SourceInit => "source-init",
            MessageType::Channel => "channel",
            MessageType::Eos => "eos",
            MessageType::ReadError => "read-error",
            MessageType::Internal => "internal",
            MessageType::SamplesLost => "samples-lost",
            MessageType::Inspector => "inspector",
            MessageType::Psd => "psd",
            MessageType::Samples => "samples",
            MessageType::Throttle => "throttle",
            MessageType::Params => "params",
            MessageType::GetParams => "get-params",
            MessageType::Seek => "seek",
            MessageType::HistorySize => "history-size",
            MessageType::Replay => "replay",
        };
        write!(f, "{s}")
    }
}

/// A status update: init progress/success/failure, read errors, EOS, or an
/// internal error, all carrying a code and an optional human-readable
/// message.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub code: i32,
    pub message: Option<String>,
}

impl Status {
    pub fn new(code: i32, message: impl Into<Option<String>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.int(self.code as i64)?;
        p.str(self.message.as_deref().unwrap_or(""))?;
        Ok(())
    }

    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let code = u.int()? as i32;
        let raw = u.str()?;
        let message = if raw.is_empty() { None } else { Some(raw) };
        Ok(Self { code, message })
    }
}

/// The fixed header of a PSD frame — every field but the float array
/// itself. Returned by [`PsdMessage::unpack_partial`] so a consumer can
/// route on `fc`/`inspector_id`/timestamps before paying for the array
/// allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsdHeader {
    pub fc: i64,
    pub inspector_id: u64,
    pub timestamp: Timestamp,
    pub rt_time: Timestamp,
    pub looped: bool,
    pub history_size: u64,
    pub samp_rate: f32,
    pub measured_samp_rate: f32,
    pub n0: f32,
}

impl PsdHeader {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.int(self.fc)?;
        p.uint(self.inspector_id)?;
        self.timestamp.pack(p)?;
        self.rt_time.pack(p)?;
        p.boolean(self.looped)?;
        p.uint(self.history_size)?;
        p.float(self.samp_rate)?;
        p.float(self.measured_samp_rate)?;
        p.float(self.n0)?;
        Ok(())
    }

    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            fc: u.int()?,
            inspector_id: u.uint()?,
            timestamp: Timestamp::unpack(u)?,
            rt_time: Timestamp::unpack(u)?,
            looped: u.boolean()?,
            history_size: u.uint()?,
            samp_rate: u.float()?,
            measured_samp_rate: u.float()?,
            n0: u.float()?,
        })
    }
}

/// A Power Spectral Density frame: the fixed header plus an owned float
/// array. The array is the one field this variant allows taking ownership
/// of without disposing the rest of the message.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdMessage {
    pub header: PsdHeader,
    psd_data: Vec<f32>,
}

impl PsdMessage {
    pub fn new(header: PsdHeader, psd_data: Vec<f32>) -> Self {
        Self { header, psd_data }
    }

    pub fn psd_data(&self) -> &[f32] {
        &self.psd_data
    }

    /// Transfers ownership of the float array to the caller, leaving this
    /// message's array empty. A later `dispose` of the message is then a
    /// no-op on this field — mirrors `mem::take` rather than a raw
    /// null-and-free.
    pub fn take_psd(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.psd_data)
    }

    pub fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.header.pack(p)?;
        p.compact_float_array(&self.psd_data)?;
        Ok(())
    }

    /// Decodes every field up to and including `N0`, leaving the unpacker
    /// positioned right before the compact float array.
    pub fn unpack_partial(u: &mut Unpacker<'_>) -> Result<PsdHeader, CodecError> {
        PsdHeader::unpack(u)
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let header = Self::unpack_partial(u)?;
        let psd_data = u.compact_float_array()?;
        Ok(Self { header, psd_data })
    }
}

/// A batch of interleaved-IQ samples produced by one inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplesMessage {
    pub inspector_id: u64,
    pub samples: Vec<(f32, f32)>,
}

impl SamplesMessage {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.uint(self.inspector_id)?;
        p.compact_complex_array(&self.samples)?;
        Ok(())
    }

    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            inspector_id: u.uint()?,
            samples: u.compact_complex_array()?,
        })
    }
}

/// Every recognized message value, tagged by [`MessageType`] in `codec`.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SourceInfo(Vec<u8>),
    SourceInit(Status),
    Channel(Vec<Channel>),
    Eos(Status),
    ReadError(Status),
    Internal(Status),
    SamplesLost(Status),
    Inspector(InspectorMessage),
    Psd(PsdMessage),
    Samples(SamplesMessage),
    Throttle { samp_rate: u64 },
    Params,
    GetParams,
    Seek(Timestamp),
    HistorySize { buffer_length: u64 },
    Replay { replay: bool },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::SourceInfo(_) => MessageType::SourceInfo,
            Message::SourceInit(_) => MessageType::SourceInit,
            Message::Channel(_) => MessageType::Channel,
            Message::Eos(_) => MessageType::Eos,
            Message::ReadError(_) => MessageType::ReadError,
            Message::Internal(_) => MessageType::Internal,
            Message::SamplesLost(_) => MessageType::SamplesLost,
            Message::Inspector(_) => MessageType::Inspector,
            Message::Psd(_) => MessageType::Psd,
            Message::Samples(_) => MessageType::Samples,
            Message::Throttle { .. } => MessageType::Throttle,
            Message::Params => MessageType::Params,
            Message::GetParams => MessageType::GetParams,
            Message::Seek(_) => MessageType::Seek,
            Message::HistorySize { .. } => MessageType::HistorySize,
            Message::Replay { .. } => MessageType::Replay,
        }
    }

    pub(crate) fn pack_status(status: &Status, p: &mut Packer) -> Result<(), CodecError> {
        status.pack(p)
    }

    pub(crate) fn unpack_status(u: &mut Unpacker<'_>) -> Result<Status, CodecError> {
        Status::unpack(u)
    }

    pub(crate) fn pack_channels(channels: &[Channel], p: &mut Packer) -> Result<(), CodecError> {
        p.array_start(channels.len() as u64)?;
        for ch in channels {
            ch.pack(p)?;
        }
        Ok(())
    }

    pub(crate) fn unpack_channels(u: &mut Unpacker<'_>) -> Result<Vec<Channel>, CodecError> {
        let n = u.array_start()?;
        let mut out = Vec::with_capacity(n as usize);
        for _ in 0..n {
            out.push(Channel::unpack(u)?);
        }
        Ok(out)
    }

    pub(crate) fn pack_samples(msg: &SamplesMessage, p: &mut Packer) -> Result<(), CodecError> {
        msg.pack(p)
    }

    pub(crate) fn unpack_samples(u: &mut Unpacker<'_>) -> Result<SamplesMessage, CodecError> {
        SamplesMessage::unpack(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrip() {
        for v in 0x0u32..=0xf {
            let t = MessageType::from_u32(v).unwrap();
            assert_eq!(t.as_u32(), v);
        }
        assert!(MessageType::from_u32(0x10).is_none());
        assert!(MessageType::from_u32(INVALID_MESSAGE_TYPE).is_none());
    }

    #[test]
    fn status_roundtrip_with_and_without_message() {
        for status in [
            Status::new(0, Some("ok".to_string())),
            Status::new(-1, None),
        ] {
            let mut p = Packer::new();
            status.pack(&mut p).unwrap();
            let bytes = p.into_bytes();
            let mut u = Unpacker::new(&bytes);
            assert_eq!(Status::unpack(&mut u).unwrap(), status);
        }
    }

    #[test]
    fn psd_roundtrip_s1_scenario() {
        let header = PsdHeader {
            fc: 100_000_000,
            inspector_id: 0,
            timestamp: Timestamp::new(1_700_000_000, 0),
            rt_time: Timestamp::new(1_700_000_000, 1000),
            looped: false,
            history_size: 0,
            samp_rate: 2_000_000.0,
            measured_samp_rate: 2_000_000.0,
            n0: -90.0,
        };
        let msg = PsdMessage::new(header, vec![1.0, 2.0, 3.0, 4.0]);
        let mut p = Packer::new();
        msg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        let decoded = PsdMessage::unpack(&mut u).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.psd_data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn psd_partial_decode_stops_before_array() {
        let header = PsdHeader {
            fc: 1,
            inspector_id: 2,
            timestamp: Timestamp::new(3, 4),
            rt_time: Timestamp::new(5, 6),
            looped: true,
            history_size: 7,
            samp_rate: 8.0,
            measured_samp_rate: 9.0,
            n0: 10.0,
        };
        let msg = PsdMessage::new(header, vec![1.0, 2.0]);
        let mut p = Packer::new();
        msg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        let decoded_header = PsdMessage::unpack_partial(&mut u).unwrap();
        assert_eq!(decoded_header, header);
        // array not yet consumed
        assert_eq!(u.compact_float_array().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn take_psd_empties_array_and_is_idempotent_on_dispose() {
        let header = PsdHeader {
            fc: 0,
            inspector_id: 0,
            timestamp: Timestamp::default(),
            rt_time: Timestamp::default(),
            looped: false,
            history_size: 0,
            samp_rate: 0.0,
            measured_samp_rate: 0.0,
            n0: 0.0,
        };
        let mut msg = PsdMessage::new(header, vec![9.0, 9.0]);
        let taken = msg.take_psd();
        assert_eq!(taken, vec![9.0, 9.0]);
        assert!(msg.psd_data().is_empty());
        drop(msg);
        drop(taken);
    }

    #[test]
    fn samples_roundtrip() {
        let msg = SamplesMessage {
            inspector_id: 3,
            samples: vec![(1.0, -1.0), (0.5, 0.5)],
        };
        let mut p = Packer::new();
        msg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(SamplesMessage::unpack(&mut u).unwrap(), msg);
    }

    #[test]
    fn channel_list_roundtrip() {
        let channels = vec![
            Channel::new(1_000_000, -50_000, 50_000),
            Channel::new(2_000_000, -25_000, 25_000),
        ];
        let mut p = Packer::new();
        Message::pack_channels(&channels, &mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(Message::unpack_channels(&mut u).unwrap(), channels);
    }
}
