//! Length-prefixed binary primitives.
//!
//! All multibyte integers are big-endian. `data` is a u32 length followed by
//! that many opaque bytes. Points are the 57-byte compressed ed448 encoding,
//! scalars 56 little-endian bytes, MPIs a u32 length plus the minimal
//! big-endian magnitude. The decoder borrows its input and reports how many
//! bytes it has consumed, so callers can account for every byte and capture
//! raw sub-slices (the DAKE transcript needs the composite identity
//! verbatim).

use ed448_goldilocks::{EdwardsPoint, EdwardsScalar};
use num_bigint::BigUint;

use otrng_crypto::dh;
use otrng_crypto::ed448::{
    point_from_bytes, point_to_bytes, scalar_from_bytes, scalar_to_bytes, ED448_POINT_BYTES,
    ED448_SCALAR_BYTES,
};
use otrng_crypto::rsig::{RingSignature, RING_SIG_BYTES};

use crate::error::ProtoError;

// ── Encoder ──────────────────────────────────────────────────────────────────

/// Append-only big-endian encoder.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Raw bytes, no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// `DATA`: u32 length followed by the bytes.
    pub fn write_data(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes)
    }

    pub fn write_point(&mut self, point: &EdwardsPoint) -> &mut Self {
        self.write_bytes(&point_to_bytes(point))
    }

    pub fn write_scalar(&mut self, scalar: &EdwardsScalar) -> &mut Self {
        self.write_bytes(&scalar_to_bytes(scalar))
    }

    /// OTR MPI: u32 length plus minimal big-endian magnitude.
    pub fn write_mpi(&mut self, value: &BigUint) -> &mut Self {
        let magnitude = dh::mpi_bytes(value);
        self.write_data(&magnitude)
    }

    pub fn write_ring_sig(&mut self, sig: &RingSignature) -> &mut Self {
        self.write_bytes(&sig.to_bytes())
    }
}

// ── Decoder ──────────────────────────────────────────────────────────────────

/// Borrowing big-endian decoder with consumed-byte accounting.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes read so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fixed-size read; ending early is `UnexpectedEof`.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtoError> {
        if self.remaining() < n {
            return Err(ProtoError::UnexpectedEof {
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtoError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtoError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtoError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, ProtoError> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// `DATA`: a declared length that overflows the buffer is malformed, not
    /// a truncation.
    pub fn read_data(&mut self) -> Result<&'a [u8], ProtoError> {
        let len = self.read_u32()? as usize;
        if len > self.remaining() {
            return Err(ProtoError::MalformedInput("data length exceeds buffer"));
        }
        self.read_bytes(len)
    }

    pub fn read_point(&mut self) -> Result<EdwardsPoint, ProtoError> {
        let bytes = self.read_bytes(ED448_POINT_BYTES)?;
        let mut fixed = [0u8; ED448_POINT_BYTES];
        fixed.copy_from_slice(bytes);
        point_from_bytes(&fixed).map_err(|_| ProtoError::InvalidEncoding("ed448 point"))
    }

    pub fn read_scalar(&mut self) -> Result<EdwardsScalar, ProtoError> {
        let bytes = self.read_bytes(ED448_SCALAR_BYTES)?;
        let mut fixed = [0u8; ED448_SCALAR_BYTES];
        fixed.copy_from_slice(bytes);
        scalar_from_bytes(&fixed).map_err(|_| ProtoError::InvalidEncoding("ed448 scalar"))
    }

    pub fn read_mpi(&mut self) -> Result<BigUint, ProtoError> {
        let magnitude = self.read_data()?;
        Ok(BigUint::from_bytes_be(magnitude))
    }

    pub fn read_ring_sig(&mut self) -> Result<RingSignature, ProtoError> {
        let bytes = self.read_bytes(RING_SIG_BYTES)?;
        let mut fixed = [0u8; RING_SIG_BYTES];
        fixed.copy_from_slice(bytes);
        RingSignature::from_bytes(&fixed)
            .map_err(|_| ProtoError::InvalidEncoding("ring signature scalar"))
    }

    /// Slice of the input between two consumed offsets; used to capture raw
    /// composite fields for transcript hashing.
    pub fn slice_between(&self, start: usize, end: usize) -> &'a [u8] {
        &self.buf[start..end]
    }
}
