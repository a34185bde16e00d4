//! CSV reading with candidate-encoding decode and separator detection.
//!
//! Survey exports arrive in whatever encoding the upstream tool produced, so
//! reads try a fixed candidate list in order and fall back to detection only
//! when none decodes cleanly. Rows become JSON objects keyed by column
//! header; missing cells are empty strings, extra cells are ignored.

use serde_json::{json, Map, Value};
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Encodings tried in order when reading an input CSV.
pub const ENCODING_CANDIDATES: &[&str] = &["utf-8", "latin-1", "iso-8859-1", "cp1252"];

/// Result of reading a CSV with metadata.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows as JSON objects.
    pub records: Vec<Value>,
    /// Column headers in file order.
    pub headers: Vec<String>,
    /// Encoding that produced the decode.
    pub encoding: String,
    /// Separator used.
    pub delimiter: char,
}

/// Decode bytes with one named encoding, strictly.
///
/// Returns `None` when the bytes are not valid for that encoding.
pub fn decode_with(bytes: &[u8], encoding: &str) -> Option<String> {
    match encoding {
        "utf-8" | "utf8" | "ascii" => std::str::from_utf8(bytes).ok().map(str::to_string),
        "latin-1" | "latin1" | "iso-8859-1" => {
            let (text, _, had_errors) = encoding_rs::ISO_8859_15.decode(bytes);
            (!had_errors).then(|| text.into_owned())
        }
        "cp1252" | "windows-1252" => {
            let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
            (!had_errors).then(|| text.into_owned())
        }
        _ => None,
    }
}

/// Decode bytes trying [`ENCODING_CANDIDATES`] in order.
///
/// When every candidate fails, fall back to chardet detection with a lossy
/// decode so a batch never dies on a stray byte. Returns the text and the
/// encoding label that produced it.
pub fn decode_candidates(bytes: &[u8]) -> (String, String) {
    for &candidate in ENCODING_CANDIDATES {
        if let Some(text) = decode_with(bytes, candidate) {
            return (text, candidate.to_string());
        }
    }
    let detected = chardet::detect(bytes).0;
    let text = encoding_rs::Encoding::for_label(detected.as_bytes())
        .map(|enc| enc.decode(bytes).0.into_owned())
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).to_string());
    (text, detected)
}

/// Detect the separator of a header line: `|`, then `;`, fallback `,`.
pub fn detect_separator(header_line: &str) -> char {
    if header_line.contains('|') {
        '|'
    } else if header_line.contains(';') {
        ';'
    } else {
        ','
    }
}

/// Split a header line into trimmed, unquoted column names.
pub fn split_headers(header_line: &str, delimiter: char) -> Vec<String> {
    header_line
        .split(delimiter)
        .map(|s| s.trim().trim_matches('"').to_string())
        .collect()
}

/// Parse one data line into a JSON object using the given headers.
///
/// Missing trailing cells become empty strings; extra cells are dropped.
pub fn parse_row(line: &str, delimiter: char, headers: &[String]) -> Value {
    let values: Vec<&str> = line.split(delimiter).collect();
    let mut obj = Map::new();
    for (i, header) in headers.iter().enumerate() {
        let raw = values
            .get(i)
            .map(|s| s.trim().trim_matches('"'))
            .unwrap_or("");
        obj.insert(header.clone(), json!(raw));
    }
    Value::Object(obj)
}

/// Parse decoded CSV text into headers and rows. Blank lines are skipped.
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<Value>)> {
    let mut lines = content.lines();

    let header_line = lines.next().ok_or(CsvError::Empty)?;
    if header_line.trim().is_empty() {
        return Err(CsvError::NoHeaders);
    }
    let headers = split_headers(header_line, delimiter);

    let mut records = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_row(line, delimiter, &headers));
    }

    Ok((headers, records))
}

/// Read a CSV file trying the candidate encodings in order.
pub fn read_csv_auto_encoding<P: AsRef<Path>>(path: P, delimiter: char) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    let (content, encoding) = decode_candidates(&bytes);
    let (headers, records) = parse_str(&content, delimiter)?;
    Ok(ParseResult {
        records,
        headers,
        encoding,
        delimiter,
    })
}

/// Read a CSV file with one required encoding.
pub fn read_csv_with_encoding<P: AsRef<Path>>(
    path: P,
    delimiter: char,
    encoding: &str,
) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    let content = decode_with(&bytes, encoding).ok_or_else(|| CsvError::Decode {
        tried: vec![encoding.to_string()],
    })?;
    let (headers, records) = parse_str(&content, delimiter)?;
    Ok(ParseResult {
        records,
        headers,
        encoding: encoding.to_string(),
        delimiter,
    })
}

/// Count data lines (total lines minus the header) without parsing.
pub fn count_data_rows<P: AsRef<Path>>(path: P) -> CsvResult<usize> {
    let bytes = std::fs::read(path.as_ref())?;
    if bytes.is_empty() {
        return Ok(0);
    }
    let mut lines = bytes.iter().filter(|&&b| b == b'\n').count();
    if bytes.last() != Some(&b'\n') {
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}

/// Streams fixed-size row chunks out of decoded CSV text.
///
/// The header line is consumed once at construction; each
/// [`ChunkedReader::next_chunk`] call yields up to `chunk_size` parsed rows.
pub struct ChunkedReader<'a> {
    lines: std::str::Lines<'a>,
    headers: Vec<String>,
    delimiter: char,
    chunk_size: usize,
}

impl<'a> ChunkedReader<'a> {
    pub fn new(content: &'a str, delimiter: char, chunk_size: usize) -> CsvResult<Self> {
        let mut lines = content.lines();
        let header_line = lines.next().ok_or(CsvError::Empty)?;
        if header_line.trim().is_empty() {
            return Err(CsvError::NoHeaders);
        }
        Ok(Self {
            lines,
            headers: split_headers(header_line, delimiter),
            delimiter,
            chunk_size,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Next chunk of parsed rows, or `None` when the input is exhausted.
    pub fn next_chunk(&mut self) -> Option<Vec<Value>> {
        let mut chunk = Vec::new();
        for line in self.lines.by_ref() {
            if line.trim().is_empty() {
                continue;
            }
            chunk.push(parse_row(line, self.delimiter, &self.headers));
            if chunk.len() == self.chunk_size {
                return Some(chunk);
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}
