//! Bounds-checked cursor over a byte slice.

use crate::domain::{DiscoveryError, PacketError};
use thiserror::Error;

/// Input ended before a field could be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("truncated {field}: need {needed} bytes, {remaining} left")]
pub struct Truncated {
    field: &'static str,
    needed: usize,
    remaining: usize,
}

impl From<Truncated> for PacketError {
    fn from(err: Truncated) -> Self {
        PacketError::Decode(err.to_string())
    }
}

impl From<Truncated> for DiscoveryError {
    fn from(err: Truncated) -> Self {
        DiscoveryError::Message(err.to_string())
    }
}

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], Truncated> {
        if self.remaining() < len {
            return Err(Truncated {
                field,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], Truncated> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, field: &'static str) -> Result<u8, Truncated> {
        Ok(self.array::<1>(field)?[0])
    }

    pub(crate) fn u16(&mut self, field: &'static str) -> Result<u16, Truncated> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    pub(crate) fn u64(&mut self, field: &'static str) -> Result<u64, Truncated> {
        Ok(u64::from_be_bytes(self.array(field)?))
    }

    /// Everything not yet consumed.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian_fields() {
        let bytes = [0x01, 0x02, 0x03, 0, 0, 0, 0, 0, 0, 0, 0x09, 0xAA];
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(reader.u8("a").unwrap(), 0x01);
        assert_eq!(reader.u16("b").unwrap(), 0x0203);
        assert_eq!(reader.u64("c").unwrap(), 9);
        assert_eq!(reader.rest(), &[0xAA]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncation_reports_field() {
        let mut reader = ByteReader::new(&[0x01]);
        let err = reader.u16("port").unwrap_err();

        assert_eq!(err.to_string(), "truncated port: need 2 bytes, 1 left");
        assert_eq!(reader.remaining(), 1);
    }
}
