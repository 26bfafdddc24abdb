//! Detected-channel descriptors, as carried inside `Message::Channel` and
//! inside an Inspector's `OPEN` tail.

use crate::error::CodecError;
use crate::packer::{Packer, Unpacker};

/// One detected channel: center/edge frequencies, signal quality figures,
/// the translated (tuner-relative) frequency, and bookkeeping counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Channel {
    pub fc: i64,
    pub f_lo: i64,
    pub f_hi: i64,
    pub bw: f32,
    pub snr: f32,
    pub s0: f32,
    pub n0: f32,
    /// Translated (tuner-relative) center frequency. Zero until
    /// [`Channel::translate`] is applied.
    pub ft: i64,
    pub age: u64,
    pub present: u64,
}

impl Channel {
    pub fn new(fc: i64, f_lo: i64, f_hi: i64) -> Self {
        Self {
            fc,
            f_lo,
            f_hi,
            bw: 0.0,
            snr: 0.0,
            s0: 0.0,
            n0: 0.0,
            ft: 0,
            age: 0,
            present: 0,
        }
    }

    /// Shifts `fc`/`f_lo`/`f_hi` by the analyzer's current tuned frequency
    /// and records that shift in `ft`, mirroring the translation the sender
    /// façade applies before a channel list leaves the detector.
    pub fn translate(&mut self, source_fc: i64) {
        self.fc += source_fc;
        self.f_lo += source_fc;
        self.f_hi += source_fc;
        self.ft = source_fc;
    }

    pub fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.freq(self.fc)?;
        p.freq(self.f_lo)?;
        p.freq(self.f_hi)?;
        p.float(self.bw)?;
        p.float(self.snr)?;
        p.float(self.s0)?;
        p.float(self.n0)?;
        p.freq(self.ft)?;
        p.uint(self.age)?;
        p.uint(self.present)?;
        Ok(())
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let fc = u.freq()?;
        let f_lo = u.freq()?;
        let f_hi = u.freq()?;
        let bw = u.float()?;
        let snr = u.float()?;
        let s0 = u.float()?;
        let n0 = u.float()?;
        let ft = u.freq()?;
        let age = u.uint()?;
        let present = u.uint()?;
        Ok(Self {
            fc,
            f_lo,
            f_hi,
            bw,
            snr,
            s0,
            n0,
            ft,
            age,
            present,
        })
    }
}
