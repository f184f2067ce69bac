//! Basic Encoding Rules, restricted to what SNMP GET traffic uses.
//!
//! Only definite lengths are produced or accepted. Long-form lengths are
//! limited to four octets, far above any UDP datagram.

use bytes::{BufMut, BytesMut};

use crate::{error::BerError, oid::Oid};

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

pub const TAG_IP_ADDRESS: u8 = 0x40;
pub const TAG_COUNTER32: u8 = 0x41;
pub const TAG_GAUGE32: u8 = 0x42;
pub const TAG_TIMETICKS: u8 = 0x43;
pub const TAG_OPAQUE: u8 = 0x44;
pub const TAG_COUNTER64: u8 = 0x46;

pub const TAG_NO_SUCH_OBJECT: u8 = 0x80;
pub const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
pub const TAG_END_OF_MIB_VIEW: u8 = 0x82;

pub const TAG_GET_REQUEST: u8 = 0xa0;
pub const TAG_RESPONSE: u8 = 0xa2;

/// Appends a complete TLV.
pub fn put_tlv(out: &mut BytesMut, tag: u8, content: &[u8]) {
    out.put_u8(tag);
    put_length(out, content.len());
    out.put_slice(content);
}

fn put_length(out: &mut BytesMut, len: usize) {
    if len < 0x80 {
        out.put_u8(len as u8);
        return;
    }
    let bytes = (len as u32).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.put_u8(0x80 | (bytes.len() - skip) as u8);
    out.put_slice(&bytes[skip..]);
}

/// Minimal two's complement content octets of a signed integer.
pub fn integer_content(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

pub fn put_integer(out: &mut BytesMut, value: i64) {
    put_tlv(out, TAG_INTEGER, &integer_content(value));
}

pub fn oid_content(oid: &Oid) -> Vec<u8> {
    let arcs = oid.arcs();
    let mut out = Vec::with_capacity(arcs.len() + 4);
    // The first two arcs share one sub-identifier.
    put_base128(&mut out, arcs[0] * 40 + arcs[1]);
    for arc in &arcs[2..] {
        put_base128(&mut out, *arc);
    }
    out
}

fn put_base128(out: &mut Vec<u8>, mut value: u32) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

pub fn decode_integer(content: &[u8]) -> Result<i64, BerError> {
    if content.is_empty() || content.len() > 8 {
        return Err(BerError::IntegerOverflow(content.len()));
    }
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for b in content {
        value = (value << 8) | i64::from(*b);
    }
    Ok(value)
}

/// Unsigned application types (Counter32, Gauge32, TimeTicks, Counter64).
///
/// Agents prefix a zero octet when the high bit is set, so nine octets are
/// legal for a 64-bit value as long as the first is zero.
pub fn decode_unsigned(content: &[u8]) -> Result<u64, BerError> {
    let significant = match content {
        [] => return Err(BerError::IntegerOverflow(0)),
        [0, rest @ ..] => rest,
        all => all,
    };
    if significant.len() > 8 {
        return Err(BerError::IntegerOverflow(content.len()));
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

pub fn decode_oid(content: &[u8]) -> Result<Oid, BerError> {
    let mut sub_ids = Vec::with_capacity(content.len() + 1);
    let mut current: u32 = 0;
    let mut pending = false;
    for b in content {
        if current > (u32::MAX >> 7) {
            return Err(BerError::BadOid);
        }
        current = (current << 7) | u32::from(b & 0x7f);
        pending = true;
        if b & 0x80 == 0 {
            sub_ids.push(current);
            current = 0;
            pending = false;
        }
    }
    if pending || sub_ids.is_empty() {
        return Err(BerError::BadOid);
    }

    let first = sub_ids[0];
    let mut arcs = Vec::with_capacity(sub_ids.len() + 1);
    match first {
        0..=39 => arcs.extend([0, first]),
        40..=79 => arcs.extend([1, first - 40]),
        _ => arcs.extend([2, first - 80]),
    }
    arcs.extend_from_slice(&sub_ids[1..]);
    Oid::from_arcs(arcs).map_err(|_| BerError::BadOid)
}

/// Cursor over a buffer of concatenated TLVs.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Reads the next TLV, returning its tag and content.
    pub fn read_tlv(&mut self) -> Result<(u8, &'a [u8]), BerError> {
        let tag = *self.buf.get(self.pos).ok_or(BerError::Truncated(self.pos))?;
        self.pos += 1;
        let len = self.read_length()?;
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(BerError::Truncated(self.pos))?;
        let content = &self.buf[self.pos..end];
        self.pos = end;
        Ok((tag, content))
    }

    /// Reads the next TLV and checks its tag.
    pub fn expect(&mut self, expected: u8) -> Result<&'a [u8], BerError> {
        let (found, content) = self.read_tlv()?;
        if found != expected {
            return Err(BerError::UnexpectedTag { expected, found });
        }
        Ok(content)
    }

    pub fn read_integer(&mut self) -> Result<i64, BerError> {
        decode_integer(self.expect(TAG_INTEGER)?)
    }

    fn read_length(&mut self) -> Result<usize, BerError> {
        let first = *self.buf.get(self.pos).ok_or(BerError::Truncated(self.pos))?;
        self.pos += 1;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let count = usize::from(first & 0x7f);
        if count == 0 || count > 4 {
            return Err(BerError::BadLength(self.pos - 1));
        }
        let bytes = self
            .buf
            .get(self.pos..self.pos + count)
            .ok_or(BerError::Truncated(self.pos))?;
        self.pos += count;
        Ok(bytes.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_use_minimal_encoding() {
        assert_eq!(integer_content(0), vec![0x00]);
        assert_eq!(integer_content(127), vec![0x7f]);
        assert_eq!(integer_content(128), vec![0x00, 0x80]);
        assert_eq!(integer_content(256), vec![0x01, 0x00]);
        assert_eq!(integer_content(-1), vec![0xff]);
        assert_eq!(integer_content(-129), vec![0xff, 0x7f]);
    }

    #[test]
    fn signed_decode_inverts_encode_at_the_edges() {
        for v in [0, 1, -1, 127, 128, -128, -129, i64::from(i32::MAX), i64::MIN, i64::MAX] {
            assert_eq!(decode_integer(&integer_content(v)).unwrap(), v);
        }
    }

    #[test]
    fn unsigned_accepts_leading_zero_octet() {
        assert_eq!(decode_unsigned(&[0x00, 0xff, 0xff, 0xff, 0xff]).unwrap(), 4_294_967_295);
        let max64 = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(decode_unsigned(&max64).unwrap(), u64::MAX);
        assert!(decode_unsigned(&[0x01; 9]).is_err());
    }

    #[test]
    fn oid_encoding_matches_known_bytes() {
        // 1.3.6.1.2.1.1.3.0 (sysUpTime.0)
        let oid: Oid = "1.3.6.1.2.1.1.3.0".parse().unwrap();
        assert_eq!(
            oid_content(&oid),
            vec![0x2b, 0x06, 0x01, 0x02, 0x01, 0x01, 0x03, 0x00]
        );
        // Multi-byte arc: 1.3.6.1.4.1.2021 (ucdavis)
        let oid: Oid = "1.3.6.1.4.1.2021".parse().unwrap();
        let content = oid_content(&oid);
        assert_eq!(&content[content.len() - 2..], &[0x8f, 0x65]);
        assert_eq!(decode_oid(&content).unwrap(), oid);
    }

    #[test]
    fn truncated_oid_is_rejected() {
        assert_eq!(decode_oid(&[0x2b, 0x86]), Err(BerError::BadOid));
        assert_eq!(decode_oid(&[]), Err(BerError::BadOid));
    }

    #[test]
    fn long_form_lengths_are_read_back() {
        let content = vec![0xaa; 300];
        let mut out = BytesMut::new();
        put_tlv(&mut out, TAG_OCTET_STRING, &content);
        assert_eq!(&out[..4], &[TAG_OCTET_STRING, 0x82, 0x01, 0x2c]);

        let mut reader = Reader::new(&out);
        assert_eq!(reader.expect(TAG_OCTET_STRING).unwrap(), content.as_slice());
        assert!(reader.is_empty());
    }

    #[test]
    fn reader_reports_truncation_and_wrong_tags() {
        let mut reader = Reader::new(&[TAG_INTEGER, 0x04, 0x00]);
        assert!(matches!(reader.read_tlv(), Err(BerError::Truncated(_))));

        let mut reader = Reader::new(&[TAG_NULL, 0x00]);
        assert_eq!(
            reader.expect(TAG_INTEGER),
            Err(BerError::UnexpectedTag {
                expected: TAG_INTEGER,
                found: TAG_NULL
            })
        );
    }
}
