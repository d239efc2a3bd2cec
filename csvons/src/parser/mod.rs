//! CSV loading with encoding auto-detection.
//!
//! Turns a file into a [`RecordMatrix`]: every row kept, header rows
//! included, ragged rows allowed. What the rows mean is decided later by
//! [`Metadata`] indices, not here.

use std::path::{Path, PathBuf};

use crate::error::{CsvError, CsvResult};
use crate::models::{Metadata, RecordMatrix};

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using the given encoding name.
///
/// Latin-1 is decoded as Windows-1252, its superset. Any other name is
/// looked up as a WHATWG label. Returns `None` when the bytes are not valid
/// for a UTF-8 declaration or the name is not a known label.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Option<String> {
    match encoding {
        "utf-8" => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).ok()
        }
        "iso-8859-1" | "windows-1252" => {
            Some(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        label => {
            let decoder = encoding_rs::Encoding::for_label(label.as_bytes())?;
            let (text, used, had_errors) = decoder.decode(bytes);
            if had_errors {
                tracing::warn!(encoding = used.name(), "malformed sequences replaced while decoding");
            }
            Some(text.into_owned())
        }
    }
}

/// Parse CSV text into a record matrix.
///
/// `path` is only used for error context.
pub fn parse_matrix(content: &str, delimiter: u8, path: &Path) -> CsvResult<RecordMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| CsvError::ParseError {
            path: path.to_path_buf(),
            message: match e.position() {
                Some(pos) => format!("line {}: {}", pos.line(), e),
                None => e.to_string(),
            },
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RecordMatrix::new(rows))
}

/// Read a CSV file into a record matrix.
pub fn read_matrix(path: &Path, delimiter: u8) -> CsvResult<RecordMatrix> {
    let bytes = std::fs::read(path).map_err(|source| CsvError::IoError {
        path: path.to_path_buf(),
        source,
    })?;

    // chardet is unreliable on short files; valid UTF-8 wins outright
    let encoding = match std::str::from_utf8(&bytes) {
        Ok(_) => "utf-8".to_string(),
        Err(_) => detect_encoding(&bytes),
    };
    let content = decode_content(&bytes, &encoding).ok_or_else(|| CsvError::EncodingError {
        path: path.to_path_buf(),
        encoding: encoding.clone(),
    })?;

    let matrix = parse_matrix(&content, delimiter, path)?;
    tracing::debug!(
        path = %path.display(),
        encoding = %encoding,
        rows = matrix.len(),
        "loaded csv file"
    );
    Ok(matrix)
}

/// `csv_file_folder/<stem><extension>`
pub fn resolve_path(metadata: &Metadata, stem: &str) -> PathBuf {
    Path::new(&metadata.csv_file_folder).join(format!("{}{}", stem, metadata.extension))
}

/// Read the file a stem refers to.
pub fn read_stem(metadata: &Metadata, stem: &str) -> CsvResult<RecordMatrix> {
    let path = resolve_path(metadata, stem);
    let delimiter = metadata
        .delimiter_byte()
        .map_err(|e| CsvError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
    read_matrix(&path, delimiter)
}
