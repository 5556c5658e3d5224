//! Placeholder PDF emitted when every backend fails for a document.
//!
//! Laid out with printpdf like any other document. If that layout fails, or
//! the name is not a known document, a minimal PDF is written by hand
//! instead, so a placeholder is always produced.

use billpack_core::domain::document::{DocumentKind, DocumentSpec, Section};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::backend::pdf_layout::layout_document;

const LINE_WIDTH: usize = 90;
const HEADING: &str = "Document could not be rendered";

/// Builds a PDF naming the document, the failure reason and when it
/// happened.
pub fn error_document(document_name: &str, reason: &str, generated_at: DateTime<Utc>) -> Vec<u8> {
    let Some(kind) = DocumentKind::from_slug(document_name) else {
        return plain_error_document(document_name, reason, generated_at);
    };
    let spec = DocumentSpec {
        kind,
        name: document_name.to_string(),
        sections: vec![
            Section::Heading { level: 1, text: HEADING.to_string() },
            Section::Paragraph { text: format!("Document: {}", kind.title()) },
            Section::Paragraph { text: format!("Generated: {}", timestamp(generated_at)) },
            Section::Heading { level: 2, text: "Reason".to_string() },
            Section::Paragraph { text: reason.to_string() },
        ],
    };
    layout_document(&spec).unwrap_or_else(|error| {
        warn!(
            event_name = "render.error_document.layout_failed",
            document = %document_name,
            error = %error,
            "falling back to the plain error document"
        );
        plain_error_document(document_name, reason, generated_at)
    })
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Hand-assembled one-page PDF using only the built-in Helvetica font.
fn plain_error_document(document_name: &str, reason: &str, generated_at: DateTime<Utc>) -> Vec<u8> {
    let mut lines = vec![
        format!("Document: {document_name}"),
        format!("Generated: {}", timestamp(generated_at)),
        String::new(),
        "Reason:".to_string(),
    ];
    lines.extend(crate::backend::wrap(reason, LINE_WIDTH));

    let mut content = format!("BT\n/F1 16 Tf\n56 780 Td\n({HEADING}) Tj\n");
    content.push_str("/F1 10 Tf\n14 TL\n0 -14 Td\n");
    for line in &lines {
        content.push_str("T* (");
        content.push_str(&escape(line));
        content.push_str(") Tj\n");
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", index + 1));
    }

    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.into_bytes()
}

/// Escapes a PDF literal string. Non-ASCII is replaced so byte offsets stay
/// equal to character offsets.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ch if ch.is_ascii() && !ch.is_ascii_control() => out.push(ch),
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{error_document, escape, plain_error_document};

    #[test]
    fn known_documents_are_laid_out_with_printpdf() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("valid timestamp");
        let reason = "all 3 backend attempt(s) failed; last error: chromium: timed out";
        let bytes = error_document("certificate_ii", reason, at);

        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > 500);
        assert_ne!(bytes, plain_error_document("certificate_ii", reason, at));
    }

    #[test]
    fn unknown_names_get_the_plain_document() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("valid timestamp");
        assert_eq!(error_document("scratch", "boom", at), plain_error_document("scratch", "boom", at));
    }

    #[test]
    fn plain_document_is_well_formed_with_the_failure_details() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("valid timestamp");
        let bytes =
            plain_error_document("deviation_statement", "chromium: timed out (after 30s)", at);
        let text = String::from_utf8(bytes.clone()).expect("ascii output");

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("(Document: deviation_statement) Tj"));
        assert!(text.contains("(Generated: 2026-03-01T09:30:00Z) Tj"));
        assert!(text.contains("chromium: timed out \\(after 30s\\)"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().expect("valid timestamp");
        let text = String::from_utf8(plain_error_document("x", "y", at)).expect("ascii output");

        let xref = text.find("xref\n").expect("xref table");
        let entries: Vec<usize> = text[xref..]
            .lines()
            .skip(3)
            .take(5)
            .map(|line| line[..10].parse().expect("offset"))
            .collect();
        for (index, offset) in entries.into_iter().enumerate() {
            assert!(text[offset..].starts_with(&format!("{} 0 obj", index + 1)));
        }

        let startxref: usize = text
            .lines()
            .skip_while(|line| *line != "startxref")
            .nth(1)
            .and_then(|line| line.parse().ok())
            .expect("startxref value");
        assert_eq!(startxref, xref);
    }

    #[test]
    fn escapes_delimiters_and_non_ascii() {
        assert_eq!(escape("a(b)c\\ ₹"), "a\\(b\\)c\\\\ ?");
    }
}
