//! # Moradias - survey address-record conversion
//!
//! Moradias ingests address-record CSV exports from telecom network surveys,
//! normalizes and enriches them against the route reference tables, and
//! emits either per-record building XML documents packaged into a zip, or a
//! cleaned, merged CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│  Transform   │────▶│  CSV 44-col │
//! │ (enc. list) │     │ (enc+sep)   │     │ (key/merge/  │     │  or XML zip │
//! └─────────────┘     └─────────────┘     │  validate)   │     └─────────────┘
//!                                         └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use moradias::{convert_csv, Config, ProgressReporter};
//!
//! let config = Config::from_env()?;
//! let progress = ProgressReporter::new();
//! let outcome = convert_csv("entrada.csv".as_ref(), &config, &progress)?;
//! println!("{} linhas em {}", outcome.rows, outcome.file_name);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Directories and housekeeping
//! - [`progress`] - Pipeline logs and the batch progress channel
//! - [`parser`] - CSV reading with candidate encodings
//! - [`reference`] - Route reference tables
//! - [`transform`] - Normalization, key derivation, merge, finalization
//! - [`validation`] - Record outcomes and input schema checking
//! - [`xml`] - Building-XML encoding and batch packaging

// Core modules
pub mod config;
pub mod error;

// Progress and logs
pub mod progress;

// Parsing
pub mod parser;

// Reference tables
pub mod reference;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// XML generation
pub mod xml;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, PipelineError, ReferenceError, XmlError};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::Config;

// =============================================================================
// Re-exports - Progress
// =============================================================================

pub use progress::{
    log_error, log_info, log_success, log_warning, Progress, ProgressReporter, ProgressStatus,
    ProgressUpdate,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    count_data_rows, decode_candidates, detect_separator, read_csv_auto_encoding,
    read_csv_with_encoding, ChunkedReader, ParseResult, ENCODING_CANDIDATES,
};

// =============================================================================
// Re-exports - Reference tables
// =============================================================================

pub use reference::{load_reference_tables, ReferenceRoute, ReferenceTable, RouteLookup};

// =============================================================================
// Re-exports - Conversion pipeline
// =============================================================================

pub use transform::finalize::FINAL_COLUMNS;
pub use transform::pipeline::{
    convert_csv, convert_csv_chunked, process_records, ConversionOutcome, CHUNK_SIZE,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate_required_columns, SchemaReport, ValidationOutcome, REQUIRED_COLUMNS,
};

// =============================================================================
// Re-exports - XML generation
// =============================================================================

pub use xml::{encode_building, generate_xml_batch, XmlBatchOutcome};
