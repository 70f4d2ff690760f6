//! Tabular parser: delimited text to header-keyed row records.
//!
//! Lines are split on `\n` first, so quoted cells cannot span lines. Within a
//! line a single `"inside quotes"` flag is toggled on every `"` character; a
//! delimiter seen while the flag is set is kept as content. Quote characters
//! themselves are never emitted, which means `""` inside a quoted cell is a
//! double toggle and not an escaped quote. Every cell is trimmed.
//!
//! No schema-specific logic here. The byte helpers at the bottom are for
//! callers that start from a file or upload rather than text.

use crate::error::{LoadError, LoadResult};
use crate::models::RowRecord;

/// Default cell separator.
pub const DEFAULT_DELIMITER: char = ',';

/// Result of parsing raw bytes, with the detected settings.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows
    pub rows: Vec<RowRecord>,
    /// Column headers (empty when there is no data row)
    pub headers: Vec<String>,
    /// Detected encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Parse comma-separated text into row records.
///
/// Blank and whitespace-only lines are dropped. Fewer than two remaining
/// lines (header only, or nothing) yields no rows.
///
/// # Example
/// ```
/// let rows = docmap::parse("name,age\nAlice,30\n");
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].get("age"), Some("30"));
/// ```
pub fn parse(text: &str) -> Vec<RowRecord> {
    parse_with_delimiter(text, DEFAULT_DELIMITER)
}

/// Parse text with an explicit cell separator.
pub fn parse_with_delimiter(text: &str, delimiter: char) -> Vec<RowRecord> {
    let lines = data_lines(text);
    if lines.len() < 2 {
        return Vec::new();
    }

    let headers = split_cells(lines[0], delimiter);
    lines[1..]
        .iter()
        .map(|line| RowRecord::from_cells(&headers, &split_cells(line, delimiter)))
        .collect()
}

/// Header names of the text, or an empty list when there is no data row.
pub fn headers(text: &str, delimiter: char) -> Vec<String> {
    let lines = data_lines(text);
    if lines.len() < 2 {
        return Vec::new();
    }
    split_cells(lines[0], delimiter)
}

/// Split one line into trimmed cells using the quote-toggle rule.
pub fn split_cells(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            cells.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    cells.push(current.trim().to_string());
    cells
}

fn data_lines(text: &str) -> Vec<&str> {
    text.split('\n').filter(|line| !line.trim().is_empty()).collect()
}

// =============================================================================
// Byte input
// =============================================================================

/// Detect the encoding of raw bytes.
///
/// Valid UTF-8 wins outright; otherwise chardet guesses.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Other labels are looked up in encoding_rs; unknown labels fall back to
/// lossy UTF-8. A leading UTF-8 byte order
/// mark is removed so it does not end up in the first header name.
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| LoadError::Encoding(e.to_string()))?,
        // encoding_rs decodes ISO-8859-1 labels as windows-1252 (WHATWG)
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => encoding.decode(bytes).0.into_owned(),
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Quoted sections are not excluded. Ties and lines without any candidate
/// resolve to a comma.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .split('\n')
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = DEFAULT_DELIMITER;
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Decode bytes and parse them, detecting encoding and (optionally) the delimiter.
pub fn parse_bytes_auto(bytes: &[u8], delimiter: Option<char>) -> LoadResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = match decode_content(bytes, &encoding) {
        Ok(content) => content,
        // chardet guessed UTF-8 but the bytes disagree
        Err(_) => decode_content(bytes, "windows-1252")?,
    };
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    Ok(ParseResult {
        rows: parse_with_delimiter(&content, delimiter),
        headers: headers(&content, delimiter),
        encoding,
        delimiter,
    })
}
