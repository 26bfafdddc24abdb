//! Length-prefixed CBOR-style primitives over a growable byte buffer.
//!
//! `Packer` is an append-only writer; `Unpacker` is a position-tracked reader
//! over a borrowed `&[u8]`. Every primitive here is all-or-nothing: an
//! encoding failure leaves the in-progress `Packer` buffer in an unspecified
//! but safe state (callers discard the whole buffer on error, never ship a
//! partial message), and a decoding failure never yields a partially built
//! value — callers propagate with `?` and build nothing.

use crate::error::CodecError;

pub(crate) const MAJOR_UINT: u8 = 0;
pub(crate) const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

pub(crate) const ADDL_FALSE: u8 = 20;
pub(crate) const ADDL_TRUE: u8 = 21;
const ADDL_1BYTE: u8 = 24;
const ADDL_2BYTE: u8 = 25;
pub(crate) const ADDL_SINGLE: u8 = 26;
pub(crate) const ADDL_DOUBLE: u8 = 27;

/// A growable, append-only CBOR-like writer.
#[derive(Debug, Default, Clone)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn push_header(&mut self, major: u8, value: u64) {
        let top = major << 5;
        if value < 24 {
            self.buf.push(top | value as u8);
        } else if value <= u8::MAX as u64 {
            self.buf.push(top | ADDL_1BYTE);
            self.buf.push(value as u8);
        } else if value <= u16::MAX as u64 {
            self.buf.push(top | ADDL_2BYTE);
            self.buf.extend_from_slice(&(value as u16).to_le_bytes());
        } else if value <= u32::MAX as u64 {
            self.buf.push(top | ADDL_SINGLE);
            self.buf.extend_from_slice(&(value as u32).to_le_bytes());
        } else {
            self.buf.push(top | ADDL_DOUBLE);
            self.buf.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Unsigned integer, CBOR major type 0.
    pub fn uint(&mut self, value: u64) -> Result<(), CodecError> {
        self.push_header(MAJOR_UINT, value);
        Ok(())
    }

    /// Signed integer. Non-negative values use major type 0; negative values
    /// use major type 1 with CBOR's `-1 - n` encoding.
    pub fn int(&mut self, value: i64) -> Result<(), CodecError> {
        if value >= 0 {
            self.push_header(MAJOR_UINT, value as u64);
        } else {
            let n = (-1 - value) as u64;
            self.push_header(MAJOR_NINT, n);
        }
        Ok(())
    }

    /// Alias for `int`: a signed 64-bit frequency value.
    pub fn freq(&mut self, value: i64) -> Result<(), CodecError> {
        self.int(value)
    }

    pub fn boolean(&mut self, value: bool) -> Result<(), CodecError> {
        let addl = if value { ADDL_TRUE } else { ADDL_FALSE };
        self.buf.push((MAJOR_SIMPLE << 5) | addl);
        Ok(())
    }

    /// IEEE-754 single precision, major type 7 additional info 26.
    pub fn float(&mut self, value: f32) -> Result<(), CodecError> {
        self.buf.push((MAJOR_SIMPLE << 5) | ADDL_SINGLE);
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// IEEE-754 double precision, major type 7 additional info 27.
    pub fn double(&mut self, value: f64) -> Result<(), CodecError> {
        self.buf.push((MAJOR_SIMPLE << 5) | ADDL_DOUBLE);
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Length-prefixed UTF-8 text. An absent/NULL string packs as a
    /// zero-length text item.
    pub fn str(&mut self, value: &str) -> Result<(), CodecError> {
        let bytes = value.as_bytes();
        self.push_header(MAJOR_TEXT, bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Length-prefixed opaque byte string (CBOR major type 2). Used for
    /// values this crate carries by value without interpreting, such as an
    /// external source-info bundle.
    pub fn bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.push_header(MAJOR_BYTES, value.len() as u64);
        self.buf.extend_from_slice(value);
        Ok(())
    }

    pub fn array_start(&mut self, len: u64) -> Result<(), CodecError> {
        self.push_header(MAJOR_ARRAY, len);
        Ok(())
    }

    pub fn map_start(&mut self, len: u64) -> Result<(), CodecError> {
        self.push_header(MAJOR_MAP, len);
        Ok(())
    }

    /// Compact single-precision float array: `uint length_in_elements`
    /// followed by raw little-endian `f32` bytes, with no per-element CBOR
    /// tagging.
    pub fn compact_float_array(&mut self, values: &[f32]) -> Result<(), CodecError> {
        self.uint(values.len() as u64)?;
        for v in values {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    /// Compact interleaved-IQ complex array: `uint length_in_elements`
    /// followed by `length * 2` raw little-endian `f32`s (re, im per sample).
    pub fn compact_complex_array(&mut self, values: &[(f32, f32)]) -> Result<(), CodecError> {
        self.uint(values.len() as u64)?;
        for (re, im) in values {
            self.buf.extend_from_slice(&re.to_le_bytes());
            self.buf.extend_from_slice(&im.to_le_bytes());
        }
        Ok(())
    }
}

/// A position-tracked CBOR-like reader over a borrowed buffer.
///
/// Cheaply `Clone`-able: a clone is a "loaned" view over the same bytes at
/// the same position, useful for a non-advancing probe pass (see the config
/// schema prober) that must not move the real read cursor.
#[derive(Debug, Clone, Copy)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated);
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn read_byte(&mut self) -> Result<u8, CodecError> {
        let s = self.take(1)?;
        Ok(s[0])
    }

    /// Reads the leading byte of an item without consuming it, returning
    /// `(major_type, additional_info)`. Used by the config decoder's
    /// creative-mode schema probe to branch on wire shape before deciding
    /// whether to unpack a value.
    pub fn peek_header(&self) -> Result<(u8, u8), CodecError> {
        if self.remaining() < 1 {
            return Err(CodecError::Truncated);
        }
        let b = self.buf[self.pos];
        Ok((b >> 5, b & 0x1f))
    }

    fn read_header(&mut self) -> Result<(u8, u8), CodecError> {
        let b = self.read_byte()?;
        Ok((b >> 5, b & 0x1f))
    }

    fn read_payload(&mut self, addl: u8) -> Result<u64, CodecError> {
        match addl {
            0..=23 => Ok(addl as u64),
            ADDL_1BYTE => Ok(self.read_byte()? as u64),
            ADDL_2BYTE => {
                let s = self.take(2)?;
                Ok(u16::from_le_bytes([s[0], s[1]]) as u64)
            }
            ADDL_SINGLE => {
                let s = self.take(4)?;
                Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]) as u64)
            }
            ADDL_DOUBLE => {
                let s = self.take(8)?;
                let mut a = [0u8; 8];
                a.copy_from_slice(s);
                Ok(u64::from_le_bytes(a))
            }
            _ => Err(CodecError::UnexpectedMajorType {
                expected: "length/value payload",
                found: addl,
            }),
        }
    }

    pub fn uint(&mut self) -> Result<u64, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_UINT {
            return Err(CodecError::UnexpectedMajorType {
                expected: "uint",
                found: major,
            });
        }
        self.read_payload(addl)
    }

    pub fn int(&mut self) -> Result<i64, CodecError> {
        let (major, addl) = self.read_header()?;
        match major {
            MAJOR_UINT => {
                let v = self.read_payload(addl)?;
                Ok(v as i64)
            }
            MAJOR_NINT => {
                let n = self.read_payload(addl)?;
                Ok(-1 - n as i64)
            }
            _ => Err(CodecError::UnexpectedMajorType {
                expected: "int",
                found: major,
            }),
        }
    }

    pub fn freq(&mut self) -> Result<i64, CodecError> {
        self.int()
    }

    pub fn boolean(&mut self) -> Result<bool, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_SIMPLE {
            return Err(CodecError::UnexpectedMajorType {
                expected: "bool",
                found: major,
            });
        }
        match addl {
            ADDL_FALSE => Ok(false),
            ADDL_TRUE => Ok(true),
            _ => Err(CodecError::UnexpectedMajorType {
                expected: "bool",
                found: addl,
            }),
        }
    }

    pub fn float(&mut self) -> Result<f32, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_SIMPLE || addl != ADDL_SINGLE {
            return Err(CodecError::UnexpectedMajorType {
                expected: "float32",
                found: major,
            });
        }
        let s = self.take(4)?;
        Ok(f32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn double(&mut self) -> Result<f64, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_SIMPLE || addl != ADDL_DOUBLE {
            return Err(CodecError::UnexpectedMajorType {
                expected: "float64",
                found: major,
            });
        }
        let s = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(s);
        Ok(f64::from_le_bytes(a))
    }

    pub fn str(&mut self) -> Result<String, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_TEXT {
            return Err(CodecError::UnexpectedMajorType {
                expected: "str",
                found: major,
            });
        }
        let len = self.read_payload(addl)?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOutOfRange { len })?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_BYTES {
            return Err(CodecError::UnexpectedMajorType {
                expected: "bytes",
                found: major,
            });
        }
        let len = self.read_payload(addl)?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOutOfRange { len })?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn array_start(&mut self) -> Result<u64, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_ARRAY {
            return Err(CodecError::UnexpectedMajorType {
                expected: "array",
                found: major,
            });
        }
        self.read_payload(addl)
    }

    pub fn map_start(&mut self) -> Result<u64, CodecError> {
        let (major, addl) = self.read_header()?;
        if major != MAJOR_MAP {
            return Err(CodecError::UnexpectedMajorType {
                expected: "map",
                found: major,
            });
        }
        self.read_payload(addl)
    }

    pub fn compact_float_array(&mut self) -> Result<Vec<f32>, CodecError> {
        let len = self.uint()?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOutOfRange { len })?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let s = self.take(4)?;
            out.push(f32::from_le_bytes([s[0], s[1], s[2], s[3]]));
        }
        Ok(out)
    }

    pub fn compact_complex_array(&mut self) -> Result<Vec<(f32, f32)>, CodecError> {
        let len = self.uint()?;
        let len = usize::try_from(len).map_err(|_| CodecError::LengthOutOfRange { len })?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let re = self.take(4)?;
            let re = f32::from_le_bytes([re[0], re[1], re[2], re[3]]);
            let im = self.take(4)?;
            let im = f32::from_le_bytes([im[0], im[1], im[2], im[3]]);
            out.push((re, im));
        }
        Ok(out)
    }

    /// Skips one CBOR-like value, including nested arrays/maps, without
    /// interpreting it. Used by the config schema prober to advance past a
    /// value it only peeked the type of on a loaned view.
    pub fn skip_value(&mut self) -> Result<(), CodecError> {
        let (major, addl) = self.read_header()?;
        match major {
            MAJOR_UINT | MAJOR_NINT => {
                self.read_payload(addl)?;
            }
            MAJOR_TEXT | MAJOR_BYTES => {
                let len = self.read_payload(addl)?;
                let len = usize::try_from(len).map_err(|_| CodecError::LengthOutOfRange { len })?;
                self.take(len)?;
            }
            MAJOR_ARRAY => {
                let n = self.read_payload(addl)?;
                for _ in 0..n {
                    self.skip_value()?;
                }
            }
            MAJOR_MAP => {
                let n = self.read_payload(addl)?;
                for _ in 0..(n * 2) {
                    self.skip_value()?;
                }
            }
            MAJOR_SIMPLE => match addl {
                ADDL_FALSE | ADDL_TRUE => {}
                ADDL_SINGLE => {
                    self.take(4)?;
                }
                ADDL_DOUBLE => {
                    self.take(8)?;
                }
                _ => {
                    return Err(CodecError::UnexpectedMajorType {
                        expected: "simple",
                        found: addl,
                    })
                }
            },
            _ => {
                return Err(CodecError::UnexpectedMajorType {
                    expected: "any",
                    found: major,
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_roundtrip_all_widths() {
        for v in [0u64, 23, 24, 255, 256, 65535, 65536, u32::MAX as u64, u32::MAX as u64 + 1, u64::MAX] {
            let mut p = Packer::new();
            p.uint(v).unwrap();
            let bytes = p.into_bytes();
            let mut u = Unpacker::new(&bytes);
            assert_eq!(u.uint().unwrap(), v);
            assert_eq!(u.position(), bytes.len());
        }
    }

    #[test]
    fn int_roundtrip_negative() {
        for v in [-1i64, -24, -25, -1000, i64::MIN, 0, 42, i64::MAX] {
            let mut p = Packer::new();
            p.int(v).unwrap();
            let bytes = p.into_bytes();
            let mut u = Unpacker::new(&bytes);
            assert_eq!(u.int().unwrap(), v);
        }
    }

    #[test]
    fn bool_roundtrip() {
        let mut p = Packer::new();
        p.boolean(true).unwrap();
        p.boolean(false).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert!(u.boolean().unwrap());
        assert!(!u.boolean().unwrap());
    }

    #[test]
    fn float_roundtrip() {
        let mut p = Packer::new();
        p.float(1.5).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.float().unwrap(), 1.5f32);
    }

    #[test]
    fn double_roundtrip() {
        let mut p = Packer::new();
        p.double(-2.25).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.double().unwrap(), -2.25f64);
    }

    #[test]
    fn bool_and_float_share_major_type_7() {
        let mut p = Packer::new();
        p.boolean(true).unwrap();
        let bool_bytes = p.into_bytes();
        let mut p = Packer::new();
        p.float(1.0).unwrap();
        let float_bytes = p.into_bytes();
        assert_eq!(bool_bytes[0] >> 5, MAJOR_SIMPLE);
        assert_eq!(float_bytes[0] >> 5, MAJOR_SIMPLE);
        assert_ne!(bool_bytes[0] & 0x1f, float_bytes[0] & 0x1f);
    }

    #[test]
    fn str_roundtrip_including_empty() {
        for s in ["", "hello", "utf8 \u{1f4e1}"] {
            let mut p = Packer::new();
            p.str(s).unwrap();
            let bytes = p.into_bytes();
            let mut u = Unpacker::new(&bytes);
            assert_eq!(u.str().unwrap(), s);
        }
    }

    #[test]
    fn compact_float_array_roundtrip() {
        let values = vec![1.0f32, 2.0, 3.0, 4.0];
        let mut p = Packer::new();
        p.compact_float_array(&values).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.compact_float_array().unwrap(), values);
    }

    #[test]
    fn compact_complex_array_roundtrip() {
        let values = vec![(1.0f32, -1.0f32), (2.0, 0.0)];
        let mut p = Packer::new();
        p.compact_complex_array(&values).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.compact_complex_array().unwrap(), values);
    }

    #[test]
    fn bytes_roundtrip_including_empty() {
        for b in [&b""[..], &b"\x00\x01\xffhello"[..]] {
            let mut p = Packer::new();
            p.bytes(b).unwrap();
            let bytes = p.into_bytes();
            let mut u = Unpacker::new(&bytes);
            assert_eq!(u.bytes().unwrap(), b);
        }
    }

    #[test]
    fn array_and_map_start_roundtrip() {
        let mut p = Packer::new();
        p.array_start(3).unwrap();
        p.map_start(2).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert_eq!(u.array_start().unwrap(), 3);
        assert_eq!(u.map_start().unwrap(), 2);
    }

    #[test]
    fn truncated_buffer_errors() {
        let mut u = Unpacker::new(&[]);
        assert_eq!(u.uint(), Err(CodecError::Truncated));
        let mut u = Unpacker::new(&[(0u8 << 5) | 26]);
        assert_eq!(u.uint(), Err(CodecError::Truncated));
    }

    #[test]
    fn wrong_major_type_errors() {
        let mut p = Packer::new();
        p.str("x").unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        assert!(matches!(
            u.uint(),
            Err(CodecError::UnexpectedMajorType { .. })
        ));
    }

    #[test]
    fn loaned_clone_does_not_advance_original() {
        let mut p = Packer::new();
        p.uint(7).unwrap();
        p.uint(9).unwrap();
        let bytes = p.into_bytes();
        let mut real = Unpacker::new(&bytes);
        let mut probe = real;
        assert_eq!(probe.uint().unwrap(), 7);
        assert_eq!(probe.uint().unwrap(), 9);
        assert_eq!(real.position(), 0);
        assert_eq!(real.uint().unwrap(), 7);
    }

    #[test]
    fn skip_value_handles_nested_containers() {
        let mut p = Packer::new();
        p.array_start(2).unwrap();
        p.uint(1).unwrap();
        p.str("x").unwrap();
        p.uint(999).unwrap();
        let bytes = p.into_bytes();
        let mut u = Unpacker::new(&bytes);
        u.skip_value().unwrap();
        assert_eq!(u.uint().unwrap(), 999);
    }
}
