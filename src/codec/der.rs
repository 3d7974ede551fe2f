//! Hand-rolled canonical DER encoder and a minimal recursive decoder.
//!
//! The CMS/ESS/TSP structures this crate produces and consumes are a small,
//! fixed set (see [`crate::asn1`]), and the one property that matters most —
//! canonical `SET OF` ordering for `signedAttrs` (P3: the set's DER encoding
//! sorts its elements by their own encoded bytes, ascending) — is easiest to
//! guarantee by building the TLVs ourselves rather than trusting a derive
//! macro's tag ordering. `Builder` accumulates already-encoded TLVs; `Value`
//! is a parsed-back tree used to re-walk CMS/TSA DER during verification.

use crate::error::{Error, Result};

/// Universal class tags used directly by this crate.
pub mod tag {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const UTF8_STRING: u8 = 0x0c;
    pub const PRINTABLE_STRING: u8 = 0x13;
    pub const GENERALIZED_TIME: u8 = 0x18;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;
}

/// Encode a DER length in its minimal (short- or long-form) encoding.
fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else {
        let mut body = Vec::new();
        let mut n = len;
        while n > 0 {
            body.insert(0, (n & 0xff) as u8);
            n >>= 8;
        }
        let mut out = vec![0x80 | body.len() as u8];
        out.extend(body);
        out
    }
}

/// Wrap `contents` in a tag/length/value header. `tag` must already include
/// the constructed bit (0x20) for constructed types.
pub fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend(encode_length(contents.len()));
    out.extend_from_slice(contents);
    out
}

/// `INTEGER` from a non-negative big-endian magnitude, adding a leading
/// `0x00` pad byte if the high bit is set (DER forbids a leading sign-bit
/// ambiguity on unsigned values we intend as positive, e.g. RSA moduli,
/// serial numbers).
pub fn integer_unsigned(magnitude: &[u8]) -> Vec<u8> {
    let mut trimmed = magnitude;
    while trimmed.len() > 1 && trimmed[0] == 0 {
        trimmed = &trimmed[1..];
    }
    let mut body = Vec::new();
    if trimmed.is_empty() {
        body.push(0);
    } else if trimmed[0] & 0x80 != 0 {
        body.push(0x00);
        body.extend_from_slice(trimmed);
    } else {
        body.extend_from_slice(trimmed);
    }
    tlv(tag::INTEGER, &body)
}

/// `INTEGER` from a small non-negative value, e.g. CMS version fields.
pub fn integer_u64(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    integer_unsigned(&bytes[first_nonzero..])
}

/// `OCTET STRING`.
pub fn octet_string(data: &[u8]) -> Vec<u8> {
    tlv(tag::OCTET_STRING, data)
}

/// `NULL`.
pub fn null() -> Vec<u8> {
    tlv(tag::NULL, &[])
}

/// `BOOLEAN`.
pub fn boolean(value: bool) -> Vec<u8> {
    tlv(tag::BOOLEAN, &[if value { 0xff } else { 0x00 }])
}

/// `OBJECT IDENTIFIER` from a dotted string such as `"2.16.840.1.101.3.4.2.1"`.
pub fn object_identifier(dotted: &str) -> Result<Vec<u8>> {
    let arcs: Vec<u64> = dotted
        .split('.')
        .map(|a| a.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| Error::Internal(format!("invalid OID: {dotted}")))?;
    if arcs.len() < 2 {
        return Err(Error::Internal(format!("OID needs at least two arcs: {dotted}")));
    }
    let mut body = vec![(arcs[0] * 40 + arcs[1]) as u8];
    for &arc in &arcs[2..] {
        body.extend(encode_base128(arc));
    }
    Ok(tlv(tag::OBJECT_IDENTIFIER, &body))
}

fn encode_base128(mut value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }
    let mut groups = Vec::new();
    while value > 0 {
        groups.push((value & 0x7f) as u8);
        value >>= 7;
    }
    groups.reverse();
    let last = groups.len() - 1;
    for (i, g) in groups.iter_mut().enumerate() {
        if i != last {
            *g |= 0x80;
        }
    }
    groups
}

/// `SEQUENCE` over already-encoded member TLVs, concatenated in order.
pub fn sequence(members: &[Vec<u8>]) -> Vec<u8> {
    let mut contents = Vec::new();
    for m in members {
        contents.extend_from_slice(m);
    }
    tlv(tag::SEQUENCE, &contents)
}

/// `SET OF` with DER's canonical ordering: members sorted ascending by their
/// own encoded bytes (this is P3 — the whole reason this module hand-rolls
/// DER instead of leaning on a derive macro).
pub fn set_of(mut members: Vec<Vec<u8>>) -> Vec<u8> {
    members.sort();
    let mut contents = Vec::new();
    for m in members {
        contents.extend_from_slice(&m);
    }
    tlv(tag::SET, &contents)
}

/// `SET` where member order is already fixed by the caller (used when a
/// `SET` has exactly one member and sorting is a no-op, to make call sites
/// self-documenting about which property they rely on).
pub fn set_ordered(members: &[Vec<u8>]) -> Vec<u8> {
    let mut contents = Vec::new();
    for m in members {
        contents.extend_from_slice(m);
    }
    tlv(tag::SET, &contents)
}

/// `[n]` context-specific, constructed, explicit tagging.
pub fn context_explicit(n: u8, inner: &[u8]) -> Vec<u8> {
    tlv(0xa0 | n, inner)
}

/// `[n]` context-specific, constructed, implicit tagging: replaces the
/// wrapped value's own tag rather than wrapping it. `inner` must be the full
/// TLV of the original type; only its contents are kept.
pub fn context_implicit_constructed(n: u8, inner_tlv: &[u8]) -> Result<Vec<u8>> {
    let parsed = parse_der(inner_tlv)?;
    tlv_with_contents(0xa0 | n, &parsed.contents)
}

/// `[n]` context-specific, primitive, implicit tagging (e.g. `subjectKeyIdentifier`).
pub fn context_implicit_primitive(n: u8, contents: &[u8]) -> Vec<u8> {
    tlv(0x80 | n, contents)
}

fn tlv_with_contents(tag: u8, contents: &[u8]) -> Result<Vec<u8>> {
    Ok(tlv(tag, contents))
}

/// `UTF8String`.
pub fn utf8_string(s: &str) -> Vec<u8> {
    tlv(tag::UTF8_STRING, s.as_bytes())
}

/// `GeneralizedTime` in the `YYYYMMDDHHMMSSZ` form DER requires (no
/// fractional seconds, UTC only).
pub fn generalized_time(dt: &chrono::DateTime<chrono::Utc>) -> Vec<u8> {
    let s = dt.format("%Y%m%d%H%M%SZ").to_string();
    tlv(tag::GENERALIZED_TIME, s.as_bytes())
}

/// A parsed DER TLV: its raw tag byte, its contents (not including
/// tag/length), and the full encoding it was parsed from.
#[derive(Debug, Clone)]
pub struct Value {
    pub tag: u8,
    pub contents: Vec<u8>,
    pub raw: Vec<u8>,
}

impl Value {
    pub fn is_sequence(&self) -> bool {
        self.tag == tag::SEQUENCE
    }

    pub fn is_set(&self) -> bool {
        self.tag == tag::SET
    }

    /// Parse `contents` as a sequence of back-to-back TLVs (i.e. descend
    /// into a SEQUENCE's or SET's members).
    pub fn children(&self) -> Result<Vec<Value>> {
        parse_der_sequence(&self.contents)
    }

    /// Interpret `contents` as an unsigned big-endian integer magnitude,
    /// stripping a single DER sign-pad byte if present.
    pub fn as_integer_bytes(&self) -> &[u8] {
        if self.contents.len() > 1 && self.contents[0] == 0 && self.contents[1] & 0x80 != 0 {
            &self.contents[1..]
        } else {
            &self.contents[..]
        }
    }

    pub fn as_u64(&self) -> u64 {
        self.as_integer_bytes()
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    /// Decode an `OBJECT IDENTIFIER`'s contents back to dotted form.
    pub fn as_oid_string(&self) -> String {
        let data = &self.contents;
        if data.is_empty() {
            return String::new();
        }
        let mut arcs = vec![(data[0] / 40) as u64, (data[0] % 40) as u64];
        let mut value: u64 = 0;
        for &b in &data[1..] {
            value = (value << 7) | (b & 0x7f) as u64;
            if b & 0x80 == 0 {
                arcs.push(value);
                value = 0;
            }
        }
        arcs.iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Parse a single DER TLV from the front of `data`, ignoring any trailing
/// bytes. Used when the caller knows `data` holds exactly one value (e.g.
/// the `/Contents` payload).
pub fn parse_der(data: &[u8]) -> Result<Value> {
    let (value, _rest) = parse_one(data)?;
    Ok(value)
}

/// Parse `data` as a sequence of zero or more back-to-back TLVs.
pub fn parse_der_sequence(data: &[u8]) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (value, tail) = parse_one(rest)?;
        out.push(value);
        rest = tail;
    }
    Ok(out)
}

fn parse_one(data: &[u8]) -> Result<(Value, &[u8])> {
    if data.is_empty() {
        return Err(Error::InputMalformed("unexpected end of DER input".into()));
    }
    let tag = data[0];
    if data.len() < 2 {
        return Err(Error::InputMalformed("truncated DER length".into()));
    }
    let (len, header_len) = parse_length(&data[1..])?;
    let start = 1 + header_len;
    let end = start
        .checked_add(len)
        .ok_or_else(|| Error::InputMalformed("DER length overflow".into()))?;
    if end > data.len() {
        return Err(Error::InputMalformed("DER length exceeds available data".into()));
    }
    let contents = data[start..end].to_vec();
    let raw = data[..end].to_vec();
    Ok((Value { tag, contents, raw }, &data[end..]))
}

fn parse_length(data: &[u8]) -> Result<(usize, usize)> {
    if data.is_empty() {
        return Err(Error::InputMalformed("truncated DER length".into()));
    }
    let first = data[0];
    if first & 0x80 == 0 {
        Ok((first as usize, 1))
    } else {
        let n_bytes = (first & 0x7f) as usize;
        if n_bytes == 0 {
            return Err(Error::InputMalformed("indefinite length not supported".into()));
        }
        if data.len() < 1 + n_bytes {
            return Err(Error::InputMalformed("truncated long-form DER length".into()));
        }
        let mut len: usize = 0;
        for &b in &data[1..1 + n_bytes] {
            len = (len << 8) | b as usize;
        }
        Ok((len, 1 + n_bytes))
    }
}
