//! Byte-exact placement of `/ByteRange` and `/Contents`.
//!
//! Grounded in the teacher's `src/signatures/byterange.rs`
//! (`ByteRangeCalculator`) for the overall shape — compute a placeholder,
//! locate it, embed a signature in place — generalized to the spec's fuller
//! `/T`-based field lookup with a `/ByteRange`-scan fallback, since the
//! teacher's version assumed the signature dictionary's position was
//! already known.
//!
//! This module does no charset decoding: everything is a byte search over
//! the raw PDF, exactly as spec.md §4.1 requires ("Pure byte search — no
//! charset decoding").

use crate::error::{Error, Result};
use std::ops::Range;

/// The four-integer `/ByteRange [a b c d]` meaning "signed bytes are
/// `[a, a+b) ∪ [c, c+d)`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ByteRange {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
}

impl ByteRange {
    pub fn new(a: i64, b: i64, c: i64, d: i64) -> Self {
        ByteRange { a, b, c, d }
    }

    /// Derive the `ByteRange` from the located `/Contents` bracket
    /// positions and total file length: `a = 0`, `b` is the offset of `<`,
    /// `c` is the offset right after `>`, `d` is everything after that.
    pub fn from_contents_brackets(open_bracket: usize, close_bracket: usize, total_len: usize) -> Self {
        let b = open_bracket as i64;
        let c = (close_bracket + 1) as i64;
        let d = total_len as i64 - c;
        ByteRange { a: 0, b, c, d }
    }

    /// P1: `a = 0`; the hex slot is exactly `bytes[a+b .. c)`, and the
    /// second signed region is `bytes[c .. c+d)` which must reach the end
    /// of the file.
    pub fn validate(&self, total_len: usize) -> Result<()> {
        if self.a != 0 {
            return Err(Error::InputMalformed("ByteRange[0] must be 0".to_string()));
        }
        if self.b < 0 || self.c < self.b || self.d < 0 {
            return Err(Error::InputMalformed("ByteRange values out of order".to_string()));
        }
        if (self.c + self.d) as usize != total_len {
            return Err(Error::InputMalformed(
                "ByteRange does not cover the full file".to_string(),
            ));
        }
        Ok(())
    }

    pub fn format(&self) -> String {
        format!("[{} {} {} {}]", self.a, self.b, self.c, self.d)
    }
}

/// Byte spans of the signature dictionary's `/ByteRange [...]` array and
/// `/Contents <...>` hex string, located within the raw PDF bytes.
#[derive(Debug, Clone)]
pub struct SignatureAreas {
    /// Span covering `[` through `]` inclusive of `/ByteRange`'s array.
    pub byte_range_slot: Range<usize>,
    /// Span of the hex digits strictly between `<` and `>` of `/Contents`.
    pub contents_slot: Range<usize>,
    /// Offset of the `<` opening `/Contents`.
    pub contents_open_bracket: usize,
    /// Offset of the `>` closing `/Contents`.
    pub contents_close_bracket: usize,
}

impl SignatureAreas {
    pub fn byte_range(&self, total_len: usize) -> ByteRange {
        ByteRange::from_contents_brackets(self.contents_open_bracket, self.contents_close_bracket, total_len)
    }
}

pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

pub(crate) fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(pos) = find_bytes(haystack, needle, from) {
        out.push(pos);
        from = pos + 1;
    }
    out
}

/// Scan backward from `pos` to find the `<<` that opens the dictionary
/// enclosing it, tracking `<<`/`>>` nesting.
pub(crate) fn find_enclosing_dict_start(bytes: &[u8], pos: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = pos;
    while i >= 2 {
        if &bytes[i - 2..i] == b">>" {
            depth += 1;
            i -= 2;
            continue;
        }
        if &bytes[i - 2..i] == b"<<" {
            if depth == 0 {
                return Some(i - 2);
            }
            depth -= 1;
            i -= 2;
            continue;
        }
        i -= 1;
    }
    None
}

/// Scan forward from a `<<` at `dict_start` to find the matching `>>`,
/// tracking nesting. Returns the index just past the matching `>>`.
pub(crate) fn find_matching_dict_end(bytes: &[u8], dict_start: usize) -> Result<usize> {
    let mut depth: i32 = 1;
    let mut i = dict_start + 2;
    while i + 2 <= bytes.len() {
        if &bytes[i..i + 2] == b"<<" {
            depth += 1;
            i += 2;
            continue;
        }
        if &bytes[i..i + 2] == b">>" {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Ok(i);
            }
            continue;
        }
        i += 1;
    }
    Err(Error::UnbalancedDictionary(dict_start))
}

/// Find `/ByteRange` and `/Contents` within `dict[dict_start..dict_end]` of
/// the full `bytes` buffer. Returns spans relative to `bytes`, not to the
/// dictionary slice.
fn find_signature_fields(bytes: &[u8], dict_start: usize, dict_end: usize) -> Option<SignatureAreas> {
    let byte_range_kw = find_bytes(bytes, b"/ByteRange", dict_start)?;
    if byte_range_kw >= dict_end {
        return None;
    }
    let open = find_bytes(bytes, b"[", byte_range_kw)?;
    let close = find_bytes(bytes, b"]", open)?;
    if close >= dict_end {
        return None;
    }
    let byte_range_slot = open..(close + 1);

    let contents_kw = find_bytes(bytes, b"/Contents", dict_start)?;
    if contents_kw >= dict_end {
        return None;
    }
    let contents_open = find_bytes(bytes, b"<", contents_kw)?;
    let contents_close = find_bytes(bytes, b">", contents_open)?;
    if contents_close >= dict_end {
        return None;
    }

    Some(SignatureAreas {
        byte_range_slot,
        contents_slot: (contents_open + 1)..contents_close,
        contents_open_bracket: contents_open,
        contents_close_bracket: contents_close,
    })
}

/// Parse `N G R` (an indirect reference) starting at the first digit at or
/// after `from`. Returns `(object_number, generation, end_offset)`.
fn parse_indirect_ref(bytes: &[u8], from: usize) -> Option<(u64, u64, usize)> {
    let text = std::str::from_utf8(bytes.get(from..from + 64.min(bytes.len() - from))?).ok()?;
    let mut parts = text.split_whitespace();
    let obj_num: u64 = parts.next()?.parse().ok()?;
    let gen: u64 = parts.next()?.parse().ok()?;
    let r = parts.next()?;
    if !r.starts_with('R') {
        return None;
    }
    Some((obj_num, gen, from))
}

/// Find the `N G obj` marker for the given object/generation numbers and
/// return the offset of the `<<` that opens its dictionary.
pub(crate) fn find_indirect_object_dict_start(bytes: &[u8], obj_num: u64, gen: u64) -> Option<usize> {
    let marker = format!("{obj_num} {gen} obj");
    let marker_pos = find_bytes(bytes, marker.as_bytes(), 0)?;
    let after_marker = marker_pos + marker.len();
    let dict_start = find_bytes(bytes, b"<<", after_marker)?;
    Some(dict_start)
}

/// Find the byte offset of the `N G obj` marker itself (not its dictionary).
pub(crate) fn find_indirect_object_start(bytes: &[u8], obj_num: u64, gen: u64) -> Option<usize> {
    let marker = format!("{obj_num} {gen} obj");
    find_bytes(bytes, marker.as_bytes(), 0)
}

/// `locateSignatureAreas`: find the signature dictionary by field name,
/// falling back to a scan over every `/ByteRange` occurrence.
pub fn locate_signature_areas(bytes: &[u8], field_name: Option<&str>) -> Result<SignatureAreas> {
    if let Some(name) = field_name {
        let literal_pattern = format!("/T ({name})");
        let hex_upper_pattern = format!("/T <{}>", crate::codec::encoding::hex_upper(name.as_bytes()));
        let hex_lower_pattern = format!("/T <{}>", hex::encode(name.as_bytes()));

        for pattern in [literal_pattern, hex_upper_pattern, hex_lower_pattern] {
            for hit in find_all(bytes, pattern.as_bytes()) {
                if let Some(areas) = try_locate_via_field_hit(bytes, hit) {
                    log::debug!(
                        "located signature dictionary via field name {name:?}: contents slot {:?}",
                        areas.contents_slot
                    );
                    return Ok(areas);
                }
            }
        }
        log::debug!("field name {name:?} did not resolve to a signature dictionary, falling back to a /ByteRange scan");
    }

    // Fallback: scan every `/ByteRange` occurrence in file order.
    for hit in find_all(bytes, b"/ByteRange") {
        if let Some(dict_start) = find_enclosing_dict_start(bytes, hit) {
            if let Ok(dict_end) = find_matching_dict_end(bytes, dict_start) {
                if let Some(areas) = find_signature_fields(bytes, dict_start, dict_end) {
                    log::debug!(
                        "located signature dictionary via /ByteRange scan: contents slot {:?}",
                        areas.contents_slot
                    );
                    return Ok(areas);
                }
            }
        }
    }

    log::warn!("no signature dictionary found in {} bytes of PDF", bytes.len());
    Err(Error::SignatureDictionaryNotFound)
}

fn try_locate_via_field_hit(bytes: &[u8], hit: usize) -> Option<SignatureAreas> {
    let field_dict_start = find_enclosing_dict_start(bytes, hit)?;
    let field_dict_end = find_matching_dict_end(bytes, field_dict_start).ok()?;

    let v_kw = find_bytes(bytes, b"/V", field_dict_start)?;
    if v_kw >= field_dict_end {
        return None;
    }
    let ref_start = find_bytes(bytes, b" ", v_kw)? + 1;
    let (obj_num, gen, _) = parse_indirect_ref(bytes, ref_start)?;
    let sig_dict_start = find_indirect_object_dict_start(bytes, obj_num, gen)?;
    let sig_dict_end = find_matching_dict_end(bytes, sig_dict_start).ok()?;
    find_signature_fields(bytes, sig_dict_start, sig_dict_end)
}

/// `embedCms`: hex-encode `cms_der`, pad to the reserved slot width, and
/// overwrite `areas.contents_slot` in place. Never touches a byte outside
/// `contents_slot`.
pub fn embed_cms(
    bytes: &[u8],
    areas: &SignatureAreas,
    byte_range: ByteRange,
    cms_der: &[u8],
    expected_digest: Option<&[u8; 32]>,
) -> Result<Vec<u8>> {
    let slot_width = areas.contents_slot.len();
    let hex = crate::codec::encoding::hex_upper(cms_der);
    if hex.len() > slot_width {
        log::warn!(
            "CMS DER of {} bytes does not fit the {}-byte placeholder slot",
            cms_der.len(),
            slot_width / 2
        );
        return Err(Error::PlaceholderTooSmall {
            actual: cms_der.len(),
            capacity: slot_width / 2,
        });
    }

    let mut out = bytes.to_vec();
    let mut padded = hex.into_bytes();
    padded.resize(slot_width, b'0');
    out[areas.contents_slot.clone()].copy_from_slice(&padded);

    if let Some(expected) = expected_digest {
        let a = byte_range.b as usize;
        let c = byte_range.c as usize;
        let actual = crate::codec::digest::sha256_concat(&[&out[..a], &out[c..]]);
        if &actual != expected {
            log::warn!("digest drift detected while embedding CMS: signed bytes changed since prepare()");
            return Err(Error::DigestDrift);
        }
    }

    Ok(out)
}
