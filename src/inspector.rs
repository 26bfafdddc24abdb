//! The Inspector sub-protocol: a tagged union keyed on `kind`, modeled as an
//! enum whose arms name their own tails rather than as overlapping memory
//! the way the analyzer this protocol was distilled from does it in C.

use crate::channel::Channel;
use crate::config::{ConfigObject, SchemaRegistry};
use crate::error::CodecError;
use crate::packer::{Packer, Unpacker};
use crate::time::Timestamp;

/// Fifteen-field orbit descriptor carried by `SET_TLE` when enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct TleOrbit {
    pub name: String,
    pub ep_year: i32,
    pub ep_day: f64,
    pub rev: f64,
    pub drevdt: f64,
    pub d2revdt2: f64,
    pub bstar: f64,
    pub eqinc: f64,
    pub ecc: f64,
    pub mnan: f64,
    pub argp: f64,
    pub ascn: f64,
    pub smjaxs: f64,
    pub norb: i32,
    pub satno: i32,
}

impl TleOrbit {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.str(&self.name)?;
        p.int(self.ep_year as i64)?;
        p.double(self.ep_day)?;
        p.double(self.rev)?;
        p.double(self.drevdt)?;
        p.double(self.d2revdt2)?;
        p.double(self.bstar)?;
        p.double(self.eqinc)?;
        p.double(self.ecc)?;
        p.double(self.mnan)?;
        p.double(self.argp)?;
        p.double(self.ascn)?;
        p.double(self.smjaxs)?;
        p.int(self.norb as i64)?;
        p.int(self.satno as i64)?;
        Ok(())
    }

    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: u.str()?,
            ep_year: u.int()? as i32,
            ep_day: u.double()?,
            rev: u.double()?,
            drevdt: u.double()?,
            d2revdt2: u.double()?,
            bstar: u.double()?,
            eqinc: u.double()?,
            ecc: u.double()?,
            mnan: u.double()?,
            argp: u.double()?,
            ascn: u.double()?,
            smjaxs: u.double()?,
            norb: u.int()? as i32,
            satno: u.int()? as i32,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitReport {
    pub rx_time: Timestamp,
    pub azimuth: f64,
    pub elevation: f64,
    pub distance: f64,
    pub freq_corr: f32,
    pub vlos_vel: f64,
}

impl OrbitReport {
    fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        self.rx_time.pack(p)?;
        p.double(self.azimuth)?;
        p.double(self.elevation)?;
        p.double(self.distance)?;
        p.float(self.freq_corr)?;
        p.double(self.vlos_vel)?;
        Ok(())
    }

    fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            rx_time: Timestamp::unpack(u)?,
            azimuth: u.double()?,
            elevation: u.double()?,
            distance: u.double()?,
            freq_corr: u.float()?,
            vlos_vel: u.double()?,
        })
    }
}

/// The OPEN tail: everything needed to stand up a new inspector instance.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTail {
    pub class_name: String,
    pub channel: Channel,
    pub config: Option<ConfigObject>,
    pub handle: u64,
    pub precise: bool,
    pub fs: u64,
    pub equiv_fs: f32,
    pub bandwidth: f32,
    pub lo: f32,
    pub estimators: Vec<String>,
    pub spectsrcs: Vec<String>,
}

/// Every recognized `kind` of an Inspector message and its tail, as a sum
/// type rather than a C-style overlapping union. Adding a kind means adding
/// an arm here, a pack/unpack arm, and nothing else — there is no separate
/// disposer, since each arm owns exactly what it names and Rust drops it.
#[derive(Debug, Clone, PartialEq)]
pub enum Inspector {
    Noop,
    Open(OpenTail),
    SetId,
    GetConfig,
    SetConfig(ConfigObject),
    Estimator { id: u64, enabled: bool, value: f32 },
    ResetEqualizer,
    Close,
    SetFreq { fc: i64, ft: i64 },
    SetBandwidth { bw: f32 },
    SetWatermark { watermark: u64 },
    WrongHandle,
    WrongObject,
    InvalidArgument,
    WrongKind,
    InvalidChannel,
    SetTle(Option<TleOrbit>),
    OrbitReport(OrbitReport),
    InvalidCorrection,
    Spectrum {
        spectsrc_id: u64,
        fc: i64,
        n0: f32,
        samp_rate: u64,
        psd: Vec<f32>,
    },
    /// Not reproduced here is the source's fall-through bug where this
    /// kind's serializer lacked a `break` and spilled into the empty-tail
    /// arms below it; SIGNAL always carries its own `(name, value)` pair.
    Signal { name: String, value: f64 },
}

impl Inspector {
    pub fn kind(&self) -> InspectorKind {
        match self {
            Inspector::Noop => InspectorKind::Noop,
            Inspector::Open(_) => InspectorKind::Open,
            Inspector::SetId => InspectorKind::SetId,
            Inspector::GetConfig => InspectorKind::GetConfig,
            Inspector::SetConfig(_) => InspectorKind::SetConfig,
            Inspector::Estimator { .. } => InspectorKind::Estimator,
            Inspector::ResetEqualizer => InspectorKind::ResetEqualizer,
            Inspector::Close => InspectorKind::Close,
            Inspector::SetFreq { .. } => InspectorKind::SetFreq,
            Inspector::SetBandwidth { .. } => InspectorKind::SetBandwidth,
            Inspector::SetWatermark { .. } => InspectorKind::SetWatermark,
            Inspector::WrongHandle => InspectorKind::WrongHandle,
            Inspector::WrongObject => InspectorKind::WrongObject,
            Inspector::InvalidArgument => InspectorKind::InvalidArgument,
            Inspector::WrongKind => InspectorKind::WrongKind,
            Inspector::InvalidChannel => InspectorKind::InvalidChannel,
            Inspector::SetTle(_) => InspectorKind::SetTle,
            Inspector::OrbitReport(_) => InspectorKind::OrbitReport,
            Inspector::InvalidCorrection => InspectorKind::InvalidCorrection,
            Inspector::Spectrum { .. } => InspectorKind::Spectrum,
            Inspector::Signal { .. } => InspectorKind::Signal,
        }
    }

    fn pack_tail(&self, p: &mut Packer) -> Result<(), CodecError> {
        match self {
            Inspector::Noop
            | Inspector::SetId
            | Inspector::GetConfig
            | Inspector::ResetEqualizer
            | Inspector::Close
            | Inspector::WrongHandle
            | Inspector::WrongObject
            | Inspector::InvalidArgument
            | Inspector::WrongKind
            | Inspector::InvalidChannel
            | Inspector::InvalidCorrection => {}
            Inspector::Open(tail) => {
                p.str(&tail.class_name)?;
                tail.channel.pack(p)?;
                ConfigObject::pack_opt(tail.config.as_ref(), p)?;
                p.uint(tail.handle)?;
                p.boolean(tail.precise)?;
                p.uint(tail.fs)?;
                p.float(tail.equiv_fs)?;
                p.float(tail.bandwidth)?;
                p.float(tail.lo)?;
                p.array_start(tail.estimators.len() as u64)?;
                for e in &tail.estimators {
                    p.str(e)?;
                }
                p.array_start(tail.spectsrcs.len() as u64)?;
                for s in &tail.spectsrcs {
                    p.str(s)?;
                }
            }
            Inspector::SetConfig(cfg) => cfg.pack(p)?,
            Inspector::Estimator { id, enabled, value } => {
                p.uint(*id)?;
                p.boolean(*enabled)?;
                p.float(*value)?;
            }
            Inspector::SetFreq { fc, ft } => {
                p.freq(*fc)?;
                p.freq(*ft)?;
            }
            Inspector::SetBandwidth { bw } => p.float(*bw)?,
            Inspector::SetWatermark { watermark } => p.uint(*watermark)?,
            Inspector::SetTle(orbit) => match orbit {
                Some(o) => {
                    p.boolean(true)?;
                    o.pack(p)?;
                }
                None => p.boolean(false)?,
            },
            Inspector::OrbitReport(report) => report.pack(p)?,
            Inspector::Spectrum {
                spectsrc_id,
                fc,
                n0,
                samp_rate,
                psd,
            } => {
                p.uint(*spectsrc_id)?;
                p.freq(*fc)?;
                p.float(*n0)?;
                p.uint(*samp_rate)?;
                p.compact_float_array(psd)?;
            }
            Inspector::Signal { name, value } => {
                p.str(name)?;
                p.double(*value)?;
            }
        }
        Ok(())
    }

    fn unpack_tail(kind: InspectorKind, u: &mut Unpacker<'_>, registry: &SchemaRegistry) -> Result<Self, CodecError> {
        Ok(match kind {
            InspectorKind::Noop => Inspector::Noop,
            InspectorKind::SetId => Inspector::SetId,
            InspectorKind::GetConfig => Inspector::GetConfig,
            InspectorKind::ResetEqualizer => Inspector::ResetEqualizer,
            InspectorKind::Close => Inspector::Close,
            InspectorKind::WrongHandle => Inspector::WrongHandle,
            InspectorKind::WrongObject => Inspector::WrongObject,
            InspectorKind::InvalidArgument => Inspector::InvalidArgument,
            InspectorKind::WrongKind => Inspector::WrongKind,
            InspectorKind::InvalidChannel => Inspector::InvalidChannel,
            InspectorKind::InvalidCorrection => Inspector::InvalidCorrection,
            InspectorKind::Open => {
                let class_name = u.str()?;
                let channel = Channel::unpack(u)?;
                let config = ConfigObject::unpack_opt(u, registry)?;
                let handle = u.uint()?;
                let precise = u.boolean()?;
                let fs = u.uint()?;
                let equiv_fs = u.float()?;
                let bandwidth = u.float()?;
                let lo = u.float()?;
                let n_est = u.array_start()?;
                let mut estimators = Vec::with_capacity(n_est as usize);
                for _ in 0..n_est {
                    estimators.push(u.str()?);
                }
                let n_spec = u.array_start()?;
                let mut spectsrcs = Vec::with_capacity(n_spec as usize);
                for _ in 0..n_spec {
                    spectsrcs.push(u.str()?);
                }
                Inspector::Open(OpenTail {
                    class_name,
                    channel,
                    config,
                    handle,
                    precise,
                    fs,
                    equiv_fs,
                    bandwidth,
                    lo,
                    estimators,
                    spectsrcs,
                })
            }
            InspectorKind::SetConfig => Inspector::SetConfig(ConfigObject::unpack(u, registry)?),
            InspectorKind::Estimator => Inspector::Estimator {
                id: u.uint()?,
                enabled: u.boolean()?,
                value: u.float()?,
            },
            InspectorKind::SetFreq => Inspector::SetFreq {
                fc: u.freq()?,
                ft: u.freq()?,
            },
            InspectorKind::SetBandwidth => Inspector::SetBandwidth { bw: u.float()? },
            InspectorKind::SetWatermark => Inspector::SetWatermark {
                watermark: u.uint()?,
            },
            InspectorKind::SetTle => {
                let enable = u.boolean()?;
                if enable {
                    Inspector::SetTle(Some(TleOrbit::unpack(u)?))
                } else {
                    Inspector::SetTle(None)
                }
            }
            InspectorKind::OrbitReport => Inspector::OrbitReport(OrbitReport::unpack(u)?),
            InspectorKind::Spectrum => Inspector::Spectrum {
                spectsrc_id: u.uint()?,
                fc: u.freq()?,
                n0: u.float()?,
                samp_rate: u.uint()?,
                psd: u.compact_float_array()?,
            },
            InspectorKind::Signal => Inspector::Signal {
                name: u.str()?,
                value: u.double()?,
            },
        })
    }
}

/// `kind` discriminant, `#[repr(i32)]` to match the wire's `int kind` field.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorKind {
    Noop = 0,
    Open = 1,
    SetId = 2,
    GetConfig = 3,
    SetConfig = 4,
    Estimator = 5,
    Spectrum = 6,
    ResetEqualizer = 7,
    Close = 8,
    SetFreq = 9,
    SetBandwidth = 10,
    SetWatermark = 11,
    WrongHandle = 12,
    WrongObject = 13,
    InvalidArgument = 14,
    WrongKind = 15,
    InvalidChannel = 16,
    SetTle = 17,
    OrbitReport = 18,
    InvalidCorrection = 19,
    Signal = 20,
}

impl InspectorKind {
    pub fn from_i32(v: i32) -> Option<Self> {
        Some(match v {
            0 => Self::Noop,
            1 => Self::Open,
            2 => Self::SetId,
            3 => Self::GetConfig,
            4 => Self::SetConfig,
            5 => Self::Estimator,
            6 => Self::Spectrum,
            7 => Self::ResetEqualizer,
            8 => Self::Close,
            9 => Self::SetFreq,
            10 => Self::SetBandwidth,
            11 => Self::SetWatermark,
            12 => Self::WrongHandle,
            13 => Self::WrongObject,
            14 => Self::InvalidArgument,
            15 => Self::WrongKind,
            16 => Self::InvalidChannel,
            17 => Self::SetTle,
            18 => Self::OrbitReport,
            19 => Self::InvalidCorrection,
            20 => Self::Signal,
            _ => return None,
        })
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// The full Inspector envelope: header fields common to every kind, plus
/// the kind-specific tail.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorMessage {
    pub inspector_id: i32,
    pub req_id: i32,
    pub handle: i32,
    pub status: i32,
    pub rt_time: Timestamp,
    pub body: Inspector,
}

impl InspectorMessage {
    pub fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.int(self.body.kind().as_i32() as i64)?;
        p.int(self.inspector_id as i64)?;
        p.int(self.req_id as i64)?;
        p.int(self.handle as i64)?;
        p.int(self.status as i64)?;
        self.rt_time.pack(p)?;
        self.body.pack_tail(p)
    }

    pub fn unpack(u: &mut Unpacker<'_>, registry: &SchemaRegistry) -> Result<Self, CodecError> {
        let raw_kind = u.int()? as i32;
        let kind = InspectorKind::from_i32(raw_kind)
            .ok_or(CodecError::UnknownInspectorKind(raw_kind))?;
        let inspector_id = u.int()? as i32;
        let req_id = u.int()? as i32;
        let handle = u.int()? as i32;
        let status = u.int()? as i32;
        let rt_time = Timestamp::unpack(u)?;
        let body = Inspector::unpack_tail(kind, u, registry)?;
        Ok(Self {
            inspector_id,
            req_id,
            handle,
            status,
            rt_time,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldValue;

    fn header(body: Inspector) -> InspectorMessage {
        InspectorMessage {
            inspector_id: 7,
            req_id: 1,
            handle: 7,
            status: 0,
            rt_time: Timestamp::new(1_700_000_000, 0),
            body,
        }
    }

    fn roundtrip(msg: &InspectorMessage, registry: &SchemaRegistry) -> InspectorMessage {
        let mut p = Packer::new();
        msg.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        InspectorMessage::unpack(&mut u, registry).unwrap()
    }

    #[test]
    fn empty_tail_kinds_roundtrip() {
        let registry = SchemaRegistry::new();
        for body in [
            Inspector::Noop,
            Inspector::SetId,
            Inspector::GetConfig,
            Inspector::ResetEqualizer,
            Inspector::Close,
            Inspector::WrongHandle,
            Inspector::WrongObject,
            Inspector::InvalidArgument,
            Inspector::WrongKind,
            Inspector::InvalidChannel,
            Inspector::InvalidCorrection,
        ] {
            let msg = header(body);
            assert_eq!(roundtrip(&msg, &registry), msg);
        }
    }

    #[test]
    fn open_roundtrip_s2_scenario() {
        let registry = SchemaRegistry::new();
        let tail = OpenTail {
            class_name: "QPSK".to_string(),
            channel: Channel {
                fc: 1_000_000,
                f_lo: -50_000,
                f_hi: 50_000,
                bw: 50_000.0,
                snr: 20.0,
                s0: 0.0,
                n0: -100.0,
                ft: 0,
                age: 0,
                present: 1,
            },
            config: None,
            handle: 7,
            precise: true,
            fs: 240_000,
            equiv_fs: 48_000.0,
            bandwidth: 25_000.0,
            lo: 0.0,
            estimators: vec!["FAC".to_string()],
            spectsrcs: vec!["PSD".to_string(), "CYCLO".to_string()],
        };
        let msg = header(Inspector::Open(tail));
        assert_eq!(roundtrip(&msg, &registry), msg);
    }

    #[test]
    fn signal_always_roundtrips_name_and_value() {
        let registry = SchemaRegistry::new();
        let msg = header(Inspector::Signal {
            name: "carrier-lock".to_string(),
            value: 0.125,
        });
        assert_eq!(roundtrip(&msg, &registry), msg);
    }

    #[test]
    fn unknown_kind_is_rejected_but_does_not_poison_the_stream() {
        let registry = SchemaRegistry::new();
        let mut p = Packer::new();
        p.int(0xDEAD).unwrap();
        p.int(0).unwrap();
        p.int(0).unwrap();
        p.int(0).unwrap();
        p.int(0).unwrap();
        Timestamp::new(0, 0).pack(&mut p).unwrap();
        let bad = p.into_bytes();
        let mut u = Unpacker::new(&bad);
        assert!(matches!(
            InspectorMessage::unpack(&mut u, &registry),
            Err(CodecError::UnknownInspectorKind(0xDEAD))
        ));

        let good = header(Inspector::Noop);
        let mut p = Packer::new();
        good.pack(&mut p).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(InspectorMessage::unpack(&mut u, &registry).unwrap(), good);
    }

    #[test]
    fn set_tle_disabled_and_enabled() {
        let registry = SchemaRegistry::new();
        let disabled = header(Inspector::SetTle(None));
        assert_eq!(roundtrip(&disabled, &registry), disabled);

        let orbit = TleOrbit {
            name: "ISS (ZARYA)".to_string(),
            ep_year: 24,
            ep_day: 1.5,
            rev: 15.5,
            drevdt: 0.0001,
            d2revdt2: 0.0,
            bstar: 0.00002,
            eqinc: 51.6,
            ecc: 0.0003,
            mnan: 10.0,
            argp: 20.0,
            ascn: 30.0,
            smjaxs: 6780.0,
            norb: 12345,
            satno: 25544,
        };
        let enabled = header(Inspector::SetTle(Some(orbit)));
        assert_eq!(roundtrip(&enabled, &registry), enabled);
    }

    #[test]
    fn set_config_with_creative_mode_schema() {
        let registry = SchemaRegistry::new();
        let mut cfg = ConfigObject::new("noop-gain.v1");
        cfg.set("gain", FieldValue::Float(3.0));
        let msg = header(Inspector::SetConfig(cfg));
        assert_eq!(roundtrip(&msg, &registry), msg);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn spectrum_roundtrip() {
        let registry = SchemaRegistry::new();
        let msg = header(Inspector::Spectrum {
            spectsrc_id: 0,
            fc: 100_000_000,
            n0: -90.0,
            samp_rate: 2_000_000,
            psd: vec![1.0, 2.0, 3.0, 4.0],
        });
        assert_eq!(roundtrip(&msg, &registry), msg);
    }
}
