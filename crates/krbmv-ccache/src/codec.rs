//! MIT credential cache file format, versions 3 and 4.
//!
//! All integers are big-endian. Layout:
//!
//! ```text
//! u16 version                  0x0503 or 0x0504
//! [v4] u16 header_len, then (u16 tag, u16 len, bytes)*
//! principal                    default principal
//! credential*                  until end of file
//! ```
//!
//! Counted data is a `u32` length followed by that many bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use krbmv_types::{Address, AuthData, Credential, KeyBlock, Principal, TicketTimes};

use crate::error::{CcacheError, CcacheResult};

pub const FCC_VERSION_3: u16 = 0x0503;
pub const FCC_VERSION_4: u16 = 0x0504;

/// A decoded cache image: format version, default principal and a lazy
/// reader over the credential records that follow.
///
/// v4 header fields (such as the KDC time offset) are skipped; caches
/// written here carry an empty header.
#[derive(Debug)]
pub struct CacheImage {
    pub version: u16,
    pub principal: Principal,
    pub credentials: CredentialReader,
}

/// Decode a non-empty cache image.
pub fn decode(data: Bytes) -> CcacheResult<CacheImage> {
    let mut dec = Decoder::new(data);
    let version = dec.header()?;
    let principal = dec.principal()?;
    Ok(CacheImage {
        credentials: CredentialReader {
            dec,
            version,
            done: false,
        },
        version,
        principal,
    })
}

/// Read the format version from the first two bytes of an image.
pub fn peek_version(data: &[u8]) -> CcacheResult<u16> {
    let mut dec = Decoder::new(Bytes::copy_from_slice(data.get(..2).unwrap_or(data)));
    let version = dec.u16()?;
    check_version(version)?;
    Ok(version)
}

fn check_version(version: u16) -> CcacheResult<()> {
    match version {
        FCC_VERSION_3 | FCC_VERSION_4 => Ok(()),
        other => Err(CcacheError::UnsupportedVersion(other)),
    }
}

/// Encode a fresh v4 image holding only the default principal.
pub fn encode_header(principal: &Principal) -> CcacheResult<Bytes> {
    let mut out = BytesMut::new();
    out.put_u16(FCC_VERSION_4);
    out.put_u16(0);
    put_principal(&mut out, principal)?;
    Ok(out.freeze())
}

/// Encode one credential record in the given format version.
pub fn encode_credential(credential: &Credential, version: u16) -> CcacheResult<Bytes> {
    check_version(version)?;
    let mut out = BytesMut::new();
    put_principal(&mut out, &credential.client)?;
    put_principal(&mut out, &credential.server)?;

    out.put_u16(credential.keyblock.enctype);
    if version == FCC_VERSION_3 {
        out.put_u16(credential.keyblock.enctype);
    }
    put_data(&mut out, &credential.keyblock.contents)?;

    let times = &credential.times;
    out.put_u32(times.authtime);
    out.put_u32(times.starttime);
    out.put_u32(times.endtime);
    out.put_u32(times.renew_till);
    out.put_u8(u8::from(credential.is_skey));
    out.put_u32(credential.ticket_flags);

    out.put_u32(count(credential.addresses.len())?);
    for addr in &credential.addresses {
        out.put_u16(addr.addrtype);
        put_data(&mut out, &addr.contents)?;
    }
    out.put_u32(count(credential.authdata.len())?);
    for ad in &credential.authdata {
        out.put_u16(ad.ad_type);
        put_data(&mut out, &ad.contents)?;
    }

    put_data(&mut out, &credential.ticket)?;
    put_data(&mut out, &credential.second_ticket)?;
    Ok(out.freeze())
}

fn count(len: usize) -> CcacheResult<u32> {
    u32::try_from(len).map_err(|_| CcacheError::FieldTooLarge(len))
}

fn put_data(out: &mut BytesMut, data: &[u8]) -> CcacheResult<()> {
    out.put_u32(count(data.len())?);
    out.put_slice(data);
    Ok(())
}

fn put_principal(out: &mut BytesMut, principal: &Principal) -> CcacheResult<()> {
    out.put_u32(principal.name_type());
    out.put_u32(count(principal.components().len())?);
    put_data(out, principal.realm())?;
    for component in principal.components() {
        put_data(out, component)?;
    }
    Ok(())
}

/// Lazy, single-pass reader over the credential records of an image.
///
/// Yields one `Err` and then stops if a record is truncated or malformed.
#[derive(Debug)]
pub struct CredentialReader {
    dec: Decoder,
    version: u16,
    done: bool,
}

impl CredentialReader {
    /// A reader that yields nothing.
    pub fn empty() -> Self {
        Self {
            dec: Decoder::new(Bytes::new()),
            version: FCC_VERSION_4,
            done: true,
        }
    }
}

impl Iterator for CredentialReader {
    type Item = CcacheResult<Credential>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || !self.dec.buf.has_remaining() {
            return None;
        }
        let result = self.dec.credential(self.version);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[derive(Debug)]
struct Decoder {
    buf: Bytes,
    total: usize,
}

impl Decoder {
    fn new(buf: Bytes) -> Self {
        let total = buf.len();
        Self { buf, total }
    }

    fn offset(&self) -> usize {
        self.total - self.buf.remaining()
    }

    fn corrupt(&self, reason: impl Into<String>) -> CcacheError {
        CcacheError::Corrupt {
            offset: self.offset(),
            reason: reason.into(),
        }
    }

    fn need(&self, n: usize) -> CcacheResult<()> {
        if self.buf.remaining() < n {
            return Err(self.corrupt(format!(
                "truncated: need {n} bytes, have {}",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self) -> CcacheResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self) -> CcacheResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    fn u32(&mut self) -> CcacheResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn bytes(&mut self, len: usize) -> CcacheResult<Bytes> {
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    fn data(&mut self) -> CcacheResult<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.bytes(len)?.to_vec())
    }

    /// Read an element count, rejecting counts the remaining input cannot hold.
    fn count(&mut self, min_element_size: usize) -> CcacheResult<usize> {
        let n = self.u32()? as usize;
        if n.saturating_mul(min_element_size) > self.buf.remaining() {
            return Err(self.corrupt(format!("element count {n} exceeds remaining data")));
        }
        Ok(n)
    }

    /// Read the version and skip over the v4 header fields.
    fn header(&mut self) -> CcacheResult<u16> {
        let version = self.u16()?;
        check_version(version)?;
        if version == FCC_VERSION_4 {
            let len = self.u16()? as usize;
            let mut fields = Decoder::new(self.bytes(len)?);
            while fields.buf.has_remaining() {
                let _tag = fields.u16()?;
                let field_len = fields.u16()? as usize;
                fields.bytes(field_len)?;
            }
        }
        Ok(version)
    }

    fn principal(&mut self) -> CcacheResult<Principal> {
        let name_type = self.u32()?;
        let n = self.count(4)?;
        let realm = self.data()?;
        let mut components = Vec::with_capacity(n);
        for _ in 0..n {
            components.push(self.data()?);
        }
        Ok(Principal::new(name_type, realm, components))
    }

    fn credential(&mut self, version: u16) -> CcacheResult<Credential> {
        let client = self.principal()?;
        let server = self.principal()?;

        let enctype = self.u16()?;
        if version == FCC_VERSION_3 {
            self.u16()?;
        }
        let keyblock = KeyBlock {
            enctype,
            contents: self.data()?,
        };

        let times = TicketTimes {
            authtime: self.u32()?,
            starttime: self.u32()?,
            endtime: self.u32()?,
            renew_till: self.u32()?,
        };
        let is_skey = self.u8()? != 0;
        let ticket_flags = self.u32()?;

        let n = self.count(6)?;
        let mut addresses = Vec::with_capacity(n);
        for _ in 0..n {
            addresses.push(Address {
                addrtype: self.u16()?,
                contents: self.data()?,
            });
        }

        let n = self.count(6)?;
        let mut authdata = Vec::with_capacity(n);
        for _ in 0..n {
            authdata.push(AuthData {
                ad_type: self.u16()?,
                contents: self.data()?,
            });
        }

        Ok(Credential {
            client,
            server,
            keyblock,
            times,
            is_skey,
            ticket_flags,
            addresses,
            authdata,
            ticket: self.data()?,
            second_ticket: self.data()?,
        })
    }
}
