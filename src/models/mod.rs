//! Data models for custom format databases.
//!
//! - [`CustomFormat`] / [`Condition`]: records in `custom_formats/`
//! - [`QualityProfile`]: records in `profiles/`
//! - [`Manifest`]: the `pcd.json` descriptor
//! - [`RegexPattern`]: records in `regex_patterns/`
//! - [`TrashCustomFormat`]: the legacy TRaSH layout read by the converter
//! - [`ToolConfig`]: settings for the tool itself

pub mod config;
pub mod custom_format;
pub mod manifest;
pub mod profile;
pub mod regex_pattern;
pub mod trash;

pub use config::{LoggingConfig, RepoLayout, ToolConfig};
pub use custom_format::{Condition, ConditionType, CustomFormat, UnknownConditionType};
pub use manifest::{Dependencies, Manifest, ProfilarrRequirement};
pub use profile::{FormatList, QualityProfile, ScoredFormat, references_in_document};
pub use regex_pattern::{AUTO_GENERATED_PREFIX, RegexPattern, generated_source};
pub use trash::{
    FieldEntry, PartialCustomFormat, Specification, SpecificationFields, TrashCustomFormat,
};
