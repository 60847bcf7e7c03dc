use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use regex::Regex;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Matches, in document order: a text run, a paragraph end, a tab or a line break.
static DOCX_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|(</w:p>)|(<w:tab/>)|(<w:br/>)")
        .expect("valid docx token regex")
});

/// Extracts paragraph text from a DOCX container, one line per paragraph.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a zip container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::Docx(format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(format!("unreadable {DOCUMENT_PART}: {e}")))?;

    Ok(document_xml_to_text(&xml))
}

fn document_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);

    for caps in DOCX_TOKEN.captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            out.push_str(&decode_entities(run.as_str()));
        } else if caps.get(2).is_some() {
            out.push('\n');
        } else if caps.get(3).is_some() {
            out.push('\t');
        } else if caps.get(4).is_some() {
            out.push('\n');
        }
    }

    out
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Builds a minimal DOCX container with one paragraph per line.
#[cfg(test)]
pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let body: String = paragraphs
        .iter()
        .map(|p| {
            let escaped = p.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
            format!(r#"<w:p><w:r><w:t xml:space="preserve">{escaped}</w:t></w:r></w:p>"#)
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(DOCUMENT_PART, SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}
