// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Format detection and conversion to normalised Markdown.
//!
//! Every input passes through normalisation, even already-Markdown text,
//! so the chunker always sees a uniform structural representation.

use mnemon_core::MnemonError;
use mnemon_core::types::FormatTag;

/// Detects the input format from the source URI extension, falling back
/// to magic bytes and content sniffing.
pub fn detect_format(source_uri: &str, bytes: &[u8]) -> Result<FormatTag, MnemonError> {
    let ext = source_uri
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if let Some(tag) = FormatTag::from_extension(&ext) {
        return Ok(tag);
    }

    if bytes.starts_with(b"%PDF") {
        return Ok(FormatTag::Pdf);
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    let head_lower = head.trim_start().to_ascii_lowercase();
    if head_lower.starts_with("<!doctype html") || head_lower.starts_with("<html") {
        return Ok(FormatTag::Html);
    }
    if (head_lower.starts_with('{') || head_lower.starts_with('['))
        && serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
    {
        return Ok(FormatTag::Json);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return Ok(FormatTag::Txt);
    }
    Err(MnemonError::UnsupportedFormat(format!(
        "cannot detect format of {source_uri:?}"
    )))
}

/// Converts detected input bytes to normalised Markdown.
///
/// Pdf, docx, and xlsx are recognised but rejected: their extraction
/// needs external tooling this crate does not ship.
pub fn to_markdown(tag: FormatTag, bytes: &[u8]) -> Result<String, MnemonError> {
    match tag {
        FormatTag::Md | FormatTag::Txt => {
            let text = String::from_utf8_lossy(bytes);
            Ok(normalize_whitespace(&text))
        }
        FormatTag::Html => {
            let text = html2text::from_read(bytes, 80).map_err(|e| {
                MnemonError::UnsupportedFormat(format!("html conversion failed: {e}"))
            })?;
            Ok(normalize_whitespace(&text))
        }
        FormatTag::Json => {
            let value: serde_json::Value = serde_json::from_slice(bytes)
                .map_err(|e| MnemonError::UnsupportedFormat(format!("invalid json: {e}")))?;
            let pretty = serde_json::to_string_pretty(&value)
                .map_err(|e| MnemonError::Internal(format!("json render failed: {e}")))?;
            Ok(format!("```json\n{pretty}\n```\n"))
        }
        FormatTag::Csv => csv_to_pipe_table(bytes),
        FormatTag::Pdf | FormatTag::Docx | FormatTag::Xlsx => Err(
            MnemonError::UnsupportedFormat(format!("{tag} extraction is not supported")),
        ),
    }
}

/// Collapses CRLF to LF, strips trailing spaces per line, and limits
/// consecutive blank lines to one.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.replace("\r\n", "\n").replace('\r', "\n").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_start_matches('\n').trim_end().to_string()
}

/// Renders CSV as a Markdown pipe table, first record as header.
fn csv_to_pipe_table(bytes: &[u8]) -> Result<String, MnemonError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| MnemonError::UnsupportedFormat(format!("invalid csv: {e}")))?;
        rows.push(record.iter().map(|f| f.replace('|', "\\|")).collect());
    }
    if rows.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::new();
    let header = &rows[0];
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!(
        "|{}|\n",
        header.iter().map(|_| " --- ").collect::<Vec<_>>().join("|")
    ));
    for row in &rows[1..] {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension_first() {
        assert_eq!(
            detect_format("doc.md", b"anything").unwrap(),
            FormatTag::Md
        );
        assert_eq!(
            detect_format("page.html", b"plain").unwrap(),
            FormatTag::Html
        );
    }

    #[test]
    fn detects_by_magic_bytes() {
        assert_eq!(
            detect_format("blob", b"%PDF-1.7 ...").unwrap(),
            FormatTag::Pdf
        );
        assert_eq!(
            detect_format("blob", b"<!DOCTYPE html><html>").unwrap(),
            FormatTag::Html
        );
        assert_eq!(
            detect_format("blob", br#"{"a": 1}"#).unwrap(),
            FormatTag::Json
        );
        assert_eq!(detect_format("blob", b"just text").unwrap(), FormatTag::Txt);
    }

    #[test]
    fn binary_garbage_is_unsupported() {
        let err = detect_format("blob", &[0xff, 0xfe, 0x00, 0x80]).unwrap_err();
        assert!(matches!(err, MnemonError::UnsupportedFormat(_)));
    }

    #[test]
    fn markdown_passthrough_normalises_whitespace() {
        let out = to_markdown(FormatTag::Md, b"# Title  \r\n\r\n\r\n\r\nBody.\r\n").unwrap();
        assert_eq!(out, "# Title\n\nBody.");
    }

    #[test]
    fn json_is_fenced_and_pretty() {
        let out = to_markdown(FormatTag::Json, br#"{"b":2,"a":1}"#).unwrap();
        assert!(out.starts_with("```json\n"));
        assert!(out.contains("\"a\": 1"));
        assert!(out.trim_end().ends_with("```"));
    }

    #[test]
    fn csv_becomes_pipe_table() {
        let out = to_markdown(FormatTag::Csv, b"name,age\nalice,30\nbob,25\n").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| name | age |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| alice | 30 |");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn pdf_rejected() {
        let err = to_markdown(FormatTag::Pdf, b"%PDF").unwrap_err();
        assert!(matches!(err, MnemonError::UnsupportedFormat(_)));
    }
}
