//! Services module - checks and transformations over a custom format database.
//!
//! Every service works on plain directories of YAML/JSON documents and has no
//! knowledge of the CLI. Problems with a single file are collected as
//! [`Diagnostic`]s so a run always covers the whole tree; only an unreadable
//! data directory aborts with an [`anyhow::Error`].
//!
//! # Components
//!
//! - [`Validator`]: cross-file validation of custom formats, quality profiles
//!   and the manifest, producing a [`ValidationReport`]
//! - [`Converter`] / [`convert_document`]: TRaSH `specifications` records to
//!   Dictionarry `conditions` records
//! - [`import_json`]: raw JSON to YAML copy of TRaSH exports
//! - [`PatternMaintainer`]: generation and renaming of `regex_patterns/` records
//! - [`documents`]: reading, parsing and writing documents

pub mod converter;
pub mod diagnostics;
pub mod documents;
pub mod importer;
pub mod patterns;
pub mod report;
pub mod shape;
pub mod validator;

pub use converter::{
    Conversion, ConversionSummary, ConvertError, Converter, convert_directory, convert_document,
    convert_record, normalize_record,
};
pub use diagnostics::{Diagnostic, SourceLocation};
pub use importer::{ImportSummary, import_json};
pub use patterns::{GenerationSummary, NormalizeSummary, PatternMaintainer, Rename, infer_tags};
pub use report::{ValidationReport, ValidationSummary};
pub use validator::Validator;
