//! Wall-clock and real-time timestamp pairs shared by PSD, Inspector and
//! Seek variants.

use crate::error::CodecError;
use crate::packer::{Packer, Unpacker};

/// A `(seconds, microseconds)` pair. `usec` is always in `[0, 1_000_000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub sec: u64,
    pub usec: u32,
}

impl Timestamp {
    pub fn new(sec: u64, usec: u32) -> Self {
        debug_assert!(usec < 1_000_000, "usec must be < 1_000_000, got {usec}");
        Self { sec, usec }
    }

    pub fn pack(&self, p: &mut Packer) -> Result<(), CodecError> {
        p.uint(self.sec)?;
        p.uint(self.usec as u64)?;
        Ok(())
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let sec = u.uint()?;
        let usec = u.uint()? as u32;
        Ok(Self { sec, usec })
    }
}

impl std::ops::Sub for Timestamp {
    type Output = std::time::Duration;

    fn sub(self, rhs: Timestamp) -> std::time::Duration {
        let lhs_us = self.sec * 1_000_000 + self.usec as u64;
        let rhs_us = rhs.sec * 1_000_000 + rhs.usec as u64;
        std::time::Duration::from_micros(lhs_us.saturating_sub(rhs_us))
    }
}
