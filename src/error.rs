//! Error types for the address-record conversion pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV reading/decoding errors
//! - [`ReferenceError`] - reference route-table loading errors
//! - [`XmlError`] - building-XML encoding and packaging errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Two failure modes are deliberately NOT errors: a missing required column
//! in the conversion input produces a [`crate::validation::SchemaReport`]
//! result value, and a missing join column downgrades the reference merge to
//! a logged skip.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Reading Errors
// =============================================================================

/// Errors while reading an input CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// No candidate encoding produced a clean decode.
    #[error("No candidate encoding decoded the file (tried: {})", tried.join(", "))]
    Decode { tried: Vec<String> },

    /// The file has no content at all.
    #[error("CSV file is empty")]
    Empty,

    /// The header line is blank.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Reference Table Errors
// =============================================================================

/// Errors while loading the route reference tables.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// A route spreadsheet is missing from the reference directory.
    #[error("Reference file not found: {0}")]
    NotFound(PathBuf),

    /// The spreadsheet could not be opened or read.
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    /// IO error.
    #[error("Reference IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// XML Encoding Errors
// =============================================================================

/// Errors while encoding building XML documents or packaging the archive.
#[derive(Debug, Error)]
pub enum XmlError {
    /// A field with no documented default is missing or blank.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// XML writer error.
    #[error("XML write error: {0}")]
    Write(#[from] quick_xml::Error),

    /// Zip packaging error.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error.
    #[error("XML IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// This is the error type returned by the batch entry points
/// ([`crate::transform::pipeline::convert_csv`],
/// [`crate::xml::batch::generate_xml_batch`]). It wraps all lower-level
/// errors and adds orchestrator-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV reading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Reference table error.
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// XML encoding error.
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// CSV output writer error.
    #[error("CSV write error: {0}")]
    CsvWrite(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input parsed but contains zero data rows.
    #[error("Input CSV has no data rows")]
    EmptyInput,

    /// Any other transformation failure, wrapped with context.
    #[error("Processing error: {0}")]
    Processing(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV reading operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for reference table operations.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Result type for XML encoding operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::Empty;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // XmlError -> PipelineError
        let xml_err = XmlError::MissingField("COD_SURVEY".into());
        let pipeline_err: PipelineError = xml_err.into();
        assert!(pipeline_err.to_string().contains("COD_SURVEY"));
    }

    #[test]
    fn test_decode_error_lists_candidates() {
        let err = CsvError::Decode {
            tried: vec!["utf-8".into(), "latin-1".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("utf-8"));
        assert!(msg.contains("latin-1"));
    }

    #[test]
    fn test_reference_not_found_shows_path() {
        let err = ReferenceError::NotFound(PathBuf::from("roteiros/roteiro_goiania.xlsx"));
        assert!(err.to_string().contains("roteiro_goiania.xlsx"));
    }
}
