//! SNMPv2c messages: GetRequest encoding and Response decoding.
//!
//! ```text
//! Message  ::= SEQUENCE { version INTEGER, community OCTET STRING, pdu }
//! pdu      ::= [tag] SEQUENCE { request-id, error-status, error-index, varbinds }
//! varbinds ::= SEQUENCE OF SEQUENCE { name OID, value ANY }
//! ```

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::{
    ber::{self, Reader},
    error::BerError,
    oid::Oid,
};

/// Protocol version field value for SNMPv2c.
pub const VERSION_2C: i64 = 1;

/// A value bound to an OID in a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// Any tag this client does not interpret, kept for diagnostics.
    Unknown { tag: u8, content: Vec<u8> },
}

impl Value {
    pub fn decode(tag: u8, content: &[u8]) -> Result<Self, BerError> {
        let value = match tag {
            ber::TAG_INTEGER => Value::Integer(ber::decode_integer(content)?),
            ber::TAG_OCTET_STRING => Value::OctetString(content.to_vec()),
            ber::TAG_NULL => Value::Null,
            ber::TAG_OID => Value::ObjectIdentifier(ber::decode_oid(content)?),
            ber::TAG_IP_ADDRESS => {
                let octets: [u8; 4] = content
                    .try_into()
                    .map_err(|_| BerError::IntegerOverflow(content.len()))?;
                Value::IpAddress(octets)
            }
            ber::TAG_COUNTER32 => Value::Counter32(narrow(ber::decode_unsigned(content)?, content)?),
            ber::TAG_GAUGE32 => Value::Gauge32(narrow(ber::decode_unsigned(content)?, content)?),
            ber::TAG_TIMETICKS => Value::TimeTicks(narrow(ber::decode_unsigned(content)?, content)?),
            ber::TAG_OPAQUE => Value::Opaque(content.to_vec()),
            ber::TAG_COUNTER64 => Value::Counter64(ber::decode_unsigned(content)?),
            ber::TAG_NO_SUCH_OBJECT => Value::NoSuchObject,
            ber::TAG_NO_SUCH_INSTANCE => Value::NoSuchInstance,
            ber::TAG_END_OF_MIB_VIEW => Value::EndOfMibView,
            other => Value::Unknown {
                tag: other,
                content: content.to_vec(),
            },
        };
        Ok(value)
    }

    /// True for the v2c exception values that stand in for a missing object.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }
}

fn narrow(value: u64, content: &[u8]) -> Result<u32, BerError> {
    u32::try_from(value).map_err(|_| BerError::IntegerOverflow(content.len()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "INTEGER: {}", v),
            Value::OctetString(bytes) => write!(f, "STRING: {}", String::from_utf8_lossy(bytes)),
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "OID: {}", oid),
            Value::IpAddress([a, b, c, d]) => write!(f, "IpAddress: {}.{}.{}.{}", a, b, c, d),
            Value::Counter32(v) => write!(f, "Counter32: {}", v),
            Value::Gauge32(v) => write!(f, "Gauge32: {}", v),
            Value::TimeTicks(v) => write!(f, "Timeticks: {}", v),
            Value::Opaque(bytes) => write!(f, "Opaque: {} bytes", bytes.len()),
            Value::Counter64(v) => write!(f, "Counter64: {}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { tag, .. } => write!(f, "unknown type 0x{:02x}", tag),
        }
    }
}

/// One `name = value` pair of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: Value,
}

/// Encodes a complete GetRequest message ready to be sent as one datagram.
pub fn encode_get_request(community: &str, request_id: i32, oids: &[Oid]) -> Bytes {
    let mut varbinds = BytesMut::new();
    for oid in oids {
        let mut varbind = BytesMut::new();
        ber::put_tlv(&mut varbind, ber::TAG_OID, &ber::oid_content(oid));
        ber::put_tlv(&mut varbind, ber::TAG_NULL, &[]);
        ber::put_tlv(&mut varbinds, ber::TAG_SEQUENCE, &varbind);
    }

    let mut pdu = BytesMut::new();
    ber::put_integer(&mut pdu, i64::from(request_id));
    ber::put_integer(&mut pdu, 0);
    ber::put_integer(&mut pdu, 0);
    ber::put_tlv(&mut pdu, ber::TAG_SEQUENCE, &varbinds);

    let mut message = BytesMut::new();
    ber::put_integer(&mut message, VERSION_2C);
    ber::put_tlv(&mut message, ber::TAG_OCTET_STRING, community.as_bytes());
    ber::put_tlv(&mut message, ber::TAG_GET_REQUEST, &pdu);

    let mut out = BytesMut::with_capacity(message.len() + 4);
    ber::put_tlv(&mut out, ber::TAG_SEQUENCE, &message);
    out.freeze()
}

/// A decoded GetRequest, as seen by an agent or a local responder.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    pub community: Vec<u8>,
    pub request_id: i64,
    pub oids: Vec<Oid>,
}

impl GetRequest {
    /// Decodes a GetRequest message; the placeholder values are skipped.
    pub fn decode(datagram: &[u8]) -> Result<Self, BerError> {
        let mut outer = Reader::new(datagram);
        let mut message = Reader::new(outer.expect(ber::TAG_SEQUENCE)?);

        message.read_integer()?;
        let community = message.expect(ber::TAG_OCTET_STRING)?.to_vec();
        let mut pdu = Reader::new(message.expect(ber::TAG_GET_REQUEST)?);

        let request_id = pdu.read_integer()?;
        pdu.read_integer()?;
        pdu.read_integer()?;

        let mut list = Reader::new(pdu.expect(ber::TAG_SEQUENCE)?);
        let mut oids = Vec::new();
        while !list.is_empty() {
            let mut varbind = Reader::new(list.expect(ber::TAG_SEQUENCE)?);
            oids.push(ber::decode_oid(varbind.expect(ber::TAG_OID)?)?);
        }

        Ok(Self {
            community,
            request_id,
            oids,
        })
    }
}

/// A decoded Response PDU.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub version: i64,
    pub community: Vec<u8>,
    pub request_id: i64,
    pub error_status: i64,
    pub error_index: i64,
    pub varbinds: Vec<VarBind>,
}

impl Response {
    pub fn decode(datagram: &[u8]) -> Result<Self, BerError> {
        let mut outer = Reader::new(datagram);
        let mut message = Reader::new(outer.expect(ber::TAG_SEQUENCE)?);

        let version = message.read_integer()?;
        let community = message.expect(ber::TAG_OCTET_STRING)?.to_vec();
        let mut pdu = Reader::new(message.expect(ber::TAG_RESPONSE)?);

        let request_id = pdu.read_integer()?;
        let error_status = pdu.read_integer()?;
        let error_index = pdu.read_integer()?;

        let mut list = Reader::new(pdu.expect(ber::TAG_SEQUENCE)?);
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut varbind = Reader::new(list.expect(ber::TAG_SEQUENCE)?);
            let oid = ber::decode_oid(varbind.expect(ber::TAG_OID)?)?;
            let (tag, content) = varbind.read_tlv()?;
            varbinds.push(VarBind {
                oid,
                value: Value::decode(tag, content)?,
            });
        }

        Ok(Self {
            version,
            community,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Encodes a response; used by tests and local responders.
    pub fn encode(&self) -> Bytes {
        let mut varbinds = BytesMut::new();
        for vb in &self.varbinds {
            let mut varbind = BytesMut::new();
            ber::put_tlv(&mut varbind, ber::TAG_OID, &ber::oid_content(&vb.oid));
            encode_value(&mut varbind, &vb.value);
            ber::put_tlv(&mut varbinds, ber::TAG_SEQUENCE, &varbind);
        }

        let mut pdu = BytesMut::new();
        ber::put_integer(&mut pdu, self.request_id);
        ber::put_integer(&mut pdu, self.error_status);
        ber::put_integer(&mut pdu, self.error_index);
        ber::put_tlv(&mut pdu, ber::TAG_SEQUENCE, &varbinds);

        let mut message = BytesMut::new();
        ber::put_integer(&mut message, self.version);
        ber::put_tlv(&mut message, ber::TAG_OCTET_STRING, &self.community);
        ber::put_tlv(&mut message, ber::TAG_RESPONSE, &pdu);

        let mut out = BytesMut::new();
        ber::put_tlv(&mut out, ber::TAG_SEQUENCE, &message);
        out.freeze()
    }
}

fn encode_value(out: &mut BytesMut, value: &Value) {
    match value {
        Value::Integer(v) => ber::put_integer(out, *v),
        Value::OctetString(bytes) => ber::put_tlv(out, ber::TAG_OCTET_STRING, bytes),
        Value::Null => ber::put_tlv(out, ber::TAG_NULL, &[]),
        Value::ObjectIdentifier(oid) => ber::put_tlv(out, ber::TAG_OID, &ber::oid_content(oid)),
        Value::IpAddress(octets) => ber::put_tlv(out, ber::TAG_IP_ADDRESS, octets),
        Value::Counter32(v) => put_unsigned(out, ber::TAG_COUNTER32, u64::from(*v)),
        Value::Gauge32(v) => put_unsigned(out, ber::TAG_GAUGE32, u64::from(*v)),
        Value::TimeTicks(v) => put_unsigned(out, ber::TAG_TIMETICKS, u64::from(*v)),
        Value::Opaque(bytes) => ber::put_tlv(out, ber::TAG_OPAQUE, bytes),
        Value::Counter64(v) => put_unsigned(out, ber::TAG_COUNTER64, *v),
        Value::NoSuchObject => ber::put_tlv(out, ber::TAG_NO_SUCH_OBJECT, &[]),
        Value::NoSuchInstance => ber::put_tlv(out, ber::TAG_NO_SUCH_INSTANCE, &[]),
        Value::EndOfMibView => ber::put_tlv(out, ber::TAG_END_OF_MIB_VIEW, &[]),
        Value::Unknown { tag, content } => ber::put_tlv(out, *tag, content),
    }
}

fn put_unsigned(out: &mut BytesMut, tag: u8, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
    let mut content = Vec::with_capacity(9);
    if bytes[skip] & 0x80 != 0 {
        content.push(0);
    }
    content.extend_from_slice(&bytes[skip..]);
    ber::put_tlv(out, tag, &content);
}
