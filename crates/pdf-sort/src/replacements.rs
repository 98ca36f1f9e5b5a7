//! Replacement values read from a CSV-like record list
//!
//! Only the first field of each record is used. Files are decoded as UTF-8
//! first and as Windows-1250 when that fails.

use crate::types::*;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1250};
use std::borrow::Cow;
use std::path::Path;

/// UTF-8 BOM: EF BB BF
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read the replacement list, failing if the file cannot be read or decoded
pub async fn read_replacements(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref().to_owned();

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| SortError::ReplacementSource {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    tokio::task::spawn_blocking(move || {
        parse_replacements(&bytes).map_err(|reason| SortError::ReplacementSource { path, reason })
    })
    .await?
}

/// Read the replacement list, logging failures and falling back to an empty list
pub async fn load_replacements(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match read_replacements(path).await {
        Ok(values) => {
            log::info!(
                "Loaded {} replacement values from {}",
                values.len(),
                path.display()
            );
            values
        }
        Err(e) => {
            log::warn!("{e}; continuing without substitutions");
            Vec::new()
        }
    }
}

/// Decode and parse raw file contents into the ordered list of first fields
pub fn parse_replacements(bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
    let text = decode_text(bytes)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| format!("CSV error: {e}"))?;
        if let Some(first) = record.get(0) {
            values.push(first.to_string());
        }
    }

    Ok(values)
}

/// Decode with UTF-8, then Windows-1250
pub fn decode_text(bytes: &[u8]) -> std::result::Result<Cow<'_, str>, String> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Some(text) = decode_strict(UTF_8, body) {
        return Ok(text);
    }

    log::debug!("Replacement list is not valid UTF-8, trying {}", WINDOWS_1250.name());
    decode_strict(WINDOWS_1250, bytes)
        .ok_or_else(|| format!("not valid {} or {}", UTF_8.name(), WINDOWS_1250.name()))
}

fn decode_strict<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
    let text = encoding.decode_without_bom_handling_and_without_replacement(bytes)?;
    // WHATWG maps the code page's undefined bytes to C1 controls instead of failing
    if encoding != UTF_8 && text.chars().any(|c| ('\u{80}'..='\u{9f}').contains(&c)) {
        return None;
    }
    Some(text)
}
