//! Bounds-checked cursor over a received frame.

use super::address::{Address, Credential, PortPair, ADDRESS_SIZE, CREDENTIAL_SIZE, PORT_PAIR_SIZE};
use super::ProtocolError;
use std::net::Ipv4Addr;

/// Size of an encoded IPv4 address.
pub const IPV4_SIZE: usize = 4;

/// Forward-only reader over a byte slice.
///
/// Every field read checks the remaining length first and fails with
/// [`ProtocolError::TruncatedMessage`] instead of reading past the end.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check if every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::TruncatedMessage {
                expected: self.pos + len,
                got: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_address(&mut self) -> Result<Address, ProtocolError> {
        Ok(Address::from_bytes(self.take_array::<ADDRESS_SIZE>()?))
    }

    /// Read a 20-byte credential.
    ///
    /// A short credential field is reported as
    /// [`ProtocolError::MalformedCredential`] rather than a truncation.
    pub fn read_credential(&mut self) -> Result<Credential, ProtocolError> {
        if self.remaining() < CREDENTIAL_SIZE {
            return Err(ProtocolError::MalformedCredential {
                expected: CREDENTIAL_SIZE,
                got: self.remaining(),
            });
        }
        Ok(Credential::from_bytes(self.take_array()?))
    }

    pub fn read_port_pair(&mut self) -> Result<PortPair, ProtocolError> {
        Ok(PortPair::from_bytes(self.take_array::<PORT_PAIR_SIZE>()?))
    }

    pub fn read_ipv4(&mut self) -> Result<Ipv4Addr, ProtocolError> {
        Ok(Ipv4Addr::from(self.take_array::<IPV4_SIZE>()?))
    }

    /// Consume and return everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}
