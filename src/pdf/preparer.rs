//! `prepare(pdf, cfg) -> PreparedPdf`: emit a PDF with a signature field and
//! placeholder, then compute its `/ByteRange` and message digest.
//!
//! Grounded in the teacher's `src/signatures/signer.rs`
//! `build_signature_dictionary`, which already emits the signature
//! dictionary as a raw `String` template rather than through a generic PDF
//! object graph — this module generalizes that approach to own the whole
//! incremental update (spec.md §9: "the preparer must *guarantee* the
//! signature dictionary is a direct object with byte-addressable
//! `/Contents` and `/ByteRange` spans — do not rely on an opaque library").
//!
//! The update performed here is a standard PDF incremental update (§7.5.6
//! of ISO 32000-1): original bytes are never rewritten, new objects are
//! appended, and a new `xref`/`trailer` section at the end supersedes
//! (`/Prev`-chains to) the original one. This is not the "incremental
//! update of an already-signed PDF" the spec excludes as a non-goal — that
//! non-goal is about re-signing, not about adding the first signature
//! field to an unsigned document, which every PAdES signer does this way.

use super::locator::{self, ByteRange, SignatureAreas};
use crate::codec::digest::sha256_concat;
use crate::error::{Error, Result};
use std::ops::Range;

const BYTE_RANGE_INNER_WIDTH: usize = 64;
const DEFAULT_PLACEHOLDER_HEX_SIZE: usize = 16_384;
const DEFAULT_FIELD_NAME: &str = "Signature1";

/// Configuration for [`prepare`], matching spec.md §6's enumerated options.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub signer_name: String,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub field_name: String,
    pub placeholder_hex_size: usize,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        PrepareConfig {
            signer_name: String::new(),
            reason: None,
            location: None,
            contact_info: None,
            field_name: DEFAULT_FIELD_NAME.to_string(),
            placeholder_hex_size: DEFAULT_PLACEHOLDER_HEX_SIZE,
        }
    }
}

impl PrepareConfig {
    pub fn new(signer_name: impl Into<String>) -> Self {
        PrepareConfig {
            signer_name: signer_name.into(),
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_contact_info(mut self, contact_info: impl Into<String>) -> Self {
        self.contact_info = Some(contact_info.into());
        self
    }

    pub fn with_placeholder_hex_size(mut self, size: usize) -> Self {
        self.placeholder_hex_size = size;
        self
    }
}

/// The output of [`prepare`].
#[derive(Debug, Clone)]
pub struct PreparedPdf {
    pub bytes: Vec<u8>,
    pub byte_range: ByteRange,
    pub message_digest: [u8; 32],
}

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

fn pdf_date_now() -> String {
    chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
}

fn byte_range_placeholder() -> String {
    let initial = "0 0 0 0";
    format!("[{}{}]", initial, " ".repeat(BYTE_RANGE_INNER_WIDTH - initial.len()))
}

fn format_byte_range_fixed(br: &ByteRange) -> Result<String> {
    let content = format!("{} {} {} {}", br.a, br.b, br.c, br.d);
    if content.len() > BYTE_RANGE_INNER_WIDTH {
        return Err(Error::Internal(
            "ByteRange decimal representation exceeds the reserved slot width".to_string(),
        ));
    }
    let padded = format!("{}{}", content, " ".repeat(BYTE_RANGE_INNER_WIDTH - content.len()));
    Ok(format!("[{padded}]"))
}

/// Build the `/Type /Sig` dictionary body (without the enclosing `<<`/`>>`,
/// which the caller wraps so it can be embedded directly into an `obj`
/// body) — the teacher's `build_signature_dictionary` pattern, generalized
/// to the spec's field set.
fn signature_dictionary_body(cfg: &PrepareConfig) -> String {
    let mut body = String::new();
    body.push_str("/Type /Sig /Filter /Adobe.PPKLite /SubFilter /ETSI.CAdES.detached ");
    body.push_str(&format!("/ByteRange {} ", byte_range_placeholder()));
    body.push_str(&format!("/Contents <{}> ", "0".repeat(cfg.placeholder_hex_size)));
    if let Some(reason) = &cfg.reason {
        body.push_str(&format!("/Reason ({}) ", escape_pdf_string(reason)));
    }
    if let Some(location) = &cfg.location {
        body.push_str(&format!("/Location ({}) ", escape_pdf_string(location)));
    }
    if let Some(contact) = &cfg.contact_info {
        body.push_str(&format!("/ContactInfo ({}) ", escape_pdf_string(contact)));
    }
    if !cfg.signer_name.is_empty() {
        body.push_str(&format!("/Name ({}) ", escape_pdf_string(&cfg.signer_name)));
    }
    body.push_str(&format!("/M ({})", pdf_date_now()));
    body
}

/// Generate a minimal single-page demo PDF (Catalog/Pages/Page/Contents,
/// no AcroForm yet) for use as `prepare`'s input in tests and demos.
pub fn generate_demo_pdf(title: &str) -> Vec<u8> {
    let mut pdf = Vec::new();
    pdf.extend_from_slice(b"%PDF-1.7\n");

    let mut offsets = Vec::new();

    offsets.push(pdf.len());
    pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets.push(pdf.len());
    pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

    offsets.push(pdf.len());
    pdf.extend_from_slice(
        b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R /Annots [] >>\nendobj\n",
    );

    offsets.push(pdf.len());
    let stream = format!("BT /F1 18 Tf 72 700 Td ({}) Tj ET", escape_pdf_string(title));
    pdf.extend_from_slice(
        format!("4 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n", stream.len(), stream).as_bytes(),
    );

    offsets.push(pdf.len());
    pdf.extend_from_slice(b"5 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n");

    let xref_offset = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f\r\n");
    for off in &offsets {
        pdf.extend_from_slice(format!("{:010} 00000 n\r\n", off).as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF",
            offsets.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    pdf
}

struct TrailerInfo {
    root_obj: u64,
    root_gen: u64,
    size: u64,
    prev_startxref: usize,
}

fn find_last(bytes: &[u8], needle: &[u8]) -> Option<usize> {
    locator::find_all(bytes, needle).into_iter().last()
}

fn parse_u64_at(bytes: &[u8], from: usize) -> Option<u64> {
    let start = from + bytes[from..].iter().take_while(|b| b.is_ascii_whitespace()).count();
    let end = start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    std::str::from_utf8(&bytes[start..end]).ok()?.parse().ok()
}

fn find_trailer_info(bytes: &[u8]) -> Result<TrailerInfo> {
    let trailer_kw = find_last(bytes, b"trailer")
        .ok_or_else(|| Error::InputMalformed("PDF has no trailer dictionary".to_string()))?;
    let dict_start = locator::find_bytes(bytes, b"<<", trailer_kw)
        .ok_or_else(|| Error::InputMalformed("trailer keyword has no dictionary".to_string()))?;
    let dict_end = locator::find_matching_dict_end(bytes, dict_start)?;
    let dict = &bytes[dict_start..dict_end];

    let root_pos = locator::find_bytes(dict, b"/Root", 0)
        .ok_or_else(|| Error::InputMalformed("trailer missing /Root".to_string()))?;
    let root_obj = parse_u64_at(dict, root_pos + 5)
        .ok_or_else(|| Error::InputMalformed("trailer /Root malformed".to_string()))?;
    let after_root_obj = root_pos + 5 + dict[root_pos + 5..].iter().take_while(|b| b.is_ascii_whitespace()).count();
    let after_root_obj_digits = after_root_obj + dict[after_root_obj..].iter().take_while(|b| b.is_ascii_digit()).count();
    let root_gen = parse_u64_at(dict, after_root_obj_digits).unwrap_or(0);

    let size_pos = locator::find_bytes(dict, b"/Size", 0)
        .ok_or_else(|| Error::InputMalformed("trailer missing /Size".to_string()))?;
    let size =
        parse_u64_at(dict, size_pos + 5).ok_or_else(|| Error::InputMalformed("trailer /Size malformed".to_string()))?;

    let startxref_kw = find_last(bytes, b"startxref")
        .ok_or_else(|| Error::InputMalformed("PDF has no startxref".to_string()))?;
    let prev_startxref = parse_u64_at(bytes, startxref_kw + "startxref".len())
        .ok_or_else(|| Error::InputMalformed("startxref malformed".to_string()))? as usize;

    Ok(TrailerInfo {
        root_obj,
        root_gen,
        size,
        prev_startxref,
    })
}

/// Best-effort: find the first `/Type /Page` (not `/Type /Pages`) object,
/// to anchor the signature widget annotation for on-screen display. Not
/// required for any signing/verification correctness property.
fn find_first_page_object(bytes: &[u8]) -> Option<(u64, u64)> {
    for pos in locator::find_all(bytes, b" obj") {
        if pos >= 3 && &bytes[pos - 3..pos] == b"end" {
            continue;
        }
        let gen_end = pos;
        let mut gen_start = gen_end;
        while gen_start > 0 && bytes[gen_start - 1].is_ascii_digit() {
            gen_start -= 1;
        }
        if gen_start == gen_end {
            continue;
        }
        let mut k = gen_start;
        while k > 0 && bytes[k - 1] == b' ' {
            k -= 1;
        }
        let num_end = k;
        let mut num_start = num_end;
        while num_start > 0 && bytes[num_start - 1].is_ascii_digit() {
            num_start -= 1;
        }
        if num_start == num_end {
            continue;
        }
        let obj_num: u64 = std::str::from_utf8(&bytes[num_start..num_end]).ok()?.parse().ok()?;
        let gen: u64 = std::str::from_utf8(&bytes[gen_start..gen_end]).ok()?.parse().ok()?;

        let dict_start = match locator::find_bytes(bytes, b"<<", pos + 4) {
            Some(d) if bytes[pos + 4..d].iter().all(|b| b.is_ascii_whitespace()) => d,
            _ => continue,
        };
        let dict_end = match locator::find_matching_dict_end(bytes, dict_start) {
            Ok(e) => e,
            Err(_) => continue,
        };
        let dict = &bytes[dict_start..dict_end];
        let is_page = locator::find_bytes(dict, b"/Type /Page", 0)
            .map(|p| dict.get(p + 11) != Some(&b's'))
            .unwrap_or(false);
        if is_page {
            return Some((obj_num, gen));
        }
    }
    None
}

struct AppendedObject {
    obj_num: u64,
    gen: u64,
    offset: usize,
}

/// `prepare`: add a signature field (creating an `AcroForm` if absent) with
/// a fixed-size placeholder, then compute the final `/ByteRange` and
/// message digest.
pub fn prepare(pdf_bytes: &[u8], cfg: &PrepareConfig) -> Result<PreparedPdf> {
    let trailer = find_trailer_info(pdf_bytes)?;

    let catalog_dict_start = locator::find_indirect_object_dict_start(pdf_bytes, trailer.root_obj, trailer.root_gen)
        .ok_or_else(|| Error::InputMalformed("catalog object not found".to_string()))?;
    let catalog_dict_end = locator::find_matching_dict_end(pdf_bytes, catalog_dict_start)?;
    let catalog_dict = &pdf_bytes[catalog_dict_start..catalog_dict_end];

    let existing_acroform = locator::find_bytes(catalog_dict, b"/AcroForm", 0).and_then(|p| {
        let ref_start = locator::find_bytes(catalog_dict, b" ", p)? + 1;
        let obj_num = parse_u64_at(catalog_dict, ref_start)?;
        let digits = catalog_dict[ref_start..].iter().take_while(|b| b.is_ascii_digit()).count();
        let gen = parse_u64_at(catalog_dict, ref_start + digits)?;
        Some((obj_num, gen))
    });

    let mut next_obj = trailer.size;
    let sig_obj = next_obj;
    next_obj += 1;
    let field_obj = next_obj;
    next_obj += 1;
    let (acroform_obj, acroform_gen, acroform_is_new) = match existing_acroform {
        Some((n, g)) => (n, g, false),
        None => {
            let n = next_obj;
            next_obj += 1;
            (n, 0, true)
        }
    };

    let page = find_first_page_object(pdf_bytes);

    let mut appended = Vec::new();
    let mut body = Vec::new();
    body.extend_from_slice(b"\n");

    // Redefine the Catalog with /AcroForm pointing at acroform_obj.
    let new_catalog_dict = {
        let mut d = String::from_utf8_lossy(catalog_dict).trim().to_string();
        if existing_acroform.is_none() {
            d.push_str(&format!(" /AcroForm {acroform_obj} {acroform_gen} R"));
        }
        d
    };
    appended.push(AppendedObject {
        obj_num: trailer.root_obj,
        gen: trailer.root_gen,
        offset: body.len(),
    });
    body.extend_from_slice(format!("{} {} obj\n{}\nendobj\n", trailer.root_obj, trailer.root_gen, new_catalog_dict).as_bytes());

    // AcroForm: fresh, or redefined with our field appended to /Fields.
    appended.push(AppendedObject {
        obj_num: acroform_obj,
        gen: acroform_gen,
        offset: body.len(),
    });
    if acroform_is_new {
        body.extend_from_slice(
            format!("{acroform_obj} {acroform_gen} obj\n<< /Fields [{field_obj} 0 R] /SigFlags 3 >>\nendobj\n")
                .as_bytes(),
        );
    } else {
        let existing_form_dict_start =
            locator::find_indirect_object_dict_start(pdf_bytes, acroform_obj, acroform_gen)
                .ok_or_else(|| Error::InputMalformed("AcroForm object not found".to_string()))?;
        let existing_form_dict_end = locator::find_matching_dict_end(pdf_bytes, existing_form_dict_start)?;
        let existing_form_dict = &pdf_bytes[existing_form_dict_start..existing_form_dict_end];
        let mut d = String::from_utf8_lossy(existing_form_dict).trim().to_string();
        if let Some(fields_pos) = d.find("/Fields") {
            if let Some(bracket_pos) = d[fields_pos..].find('[') {
                d.insert_str(fields_pos + bracket_pos + 1, &format!("{field_obj} 0 R "));
            }
        } else {
            d.push_str(&format!(" /Fields [{field_obj} 0 R]"));
        }
        body.extend_from_slice(format!("{acroform_obj} {acroform_gen} obj\n{d}\nendobj\n").as_bytes());
    }

    // Signature field widget annotation.
    appended.push(AppendedObject {
        obj_num: field_obj,
        gen: 0,
        offset: body.len(),
    });
    let mut field_dict = format!(
        "<< /FT /Sig /Type /Annot /Subtype /Widget /F 132 /Rect [0 0 0 0] /T ({}) /V {sig_obj} 0 R",
        escape_pdf_string(&cfg.field_name)
    );
    if let Some((page_obj, page_gen)) = page {
        field_dict.push_str(&format!(" /P {page_obj} {page_gen} R"));
    }
    field_dict.push_str(" >>");
    body.extend_from_slice(format!("{field_obj} 0 obj\n{field_dict}\nendobj\n").as_bytes());

    // Signature dictionary with the ByteRange/Contents placeholder.
    appended.push(AppendedObject {
        obj_num: sig_obj,
        gen: 0,
        offset: body.len(),
    });
    body.extend_from_slice(
        format!("{sig_obj} 0 obj\n<< {} >>\nendobj\n", signature_dictionary_body(cfg)).as_bytes(),
    );

    let body_start_in_file = pdf_bytes.len();
    let mut out = pdf_bytes.to_vec();
    out.extend_from_slice(&body);

    let xref_offset = out.len();
    out.extend_from_slice(b"xref\n");
    for obj in &appended {
        out.extend_from_slice(format!("{} 1\n", obj.obj_num).as_bytes());
        out.extend_from_slice(format!("{:010} {:05} n\r\n", body_start_in_file + obj.offset, obj.gen).as_bytes());
    }
    let new_size = next_obj;
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} {} R /Prev {} >>\nstartxref\n{}\n%%EOF",
            new_size, trailer.root_obj, trailer.root_gen, trailer.prev_startxref, xref_offset
        )
        .as_bytes(),
    );

    let areas = locator::locate_signature_areas(&out, Some(&cfg.field_name))?;
    let byte_range = areas.byte_range(out.len());
    rewrite_byte_range_slot(&mut out, areas.byte_range_slot.clone(), &byte_range)?;

    let message_digest = sha256_concat(&[&out[..byte_range.b as usize], &out[byte_range.c as usize..]]);

    Ok(PreparedPdf {
        bytes: out,
        byte_range,
        message_digest,
    })
}

fn rewrite_byte_range_slot(bytes: &mut [u8], slot: Range<usize>, br: &ByteRange) -> Result<()> {
    let formatted = format_byte_range_fixed(br)?;
    if formatted.len() != slot.len() {
        return Err(Error::Internal(
            "formatted ByteRange does not match the reserved slot width".to_string(),
        ));
    }
    bytes[slot].copy_from_slice(formatted.as_bytes());
    Ok(())
}

/// Locate the already-placed placeholder in `bytes` (produced elsewhere, or
/// by a previous `prepare` call) without rewriting anything — used by
/// `Verifier` and by `PdfLocator::embed_cms` callers that already have a
/// `PreparedPdf`.
pub fn locate(bytes: &[u8], field_name: &str) -> Result<SignatureAreas> {
    locator::locate_signature_areas(bytes, Some(field_name))
}
