//! Semantic extraction: response schema and normalization, defensive JSON
//! recovery, prompt assembly, and the batch driver.

pub mod batch;
pub mod parse;
pub(crate) mod prompts;
pub mod schema;

pub use batch::{BatchExtractor, ExtractionMode, ExtractorConfig};
pub use parse::recover_json;
pub use schema::{
    Elaboration, ExtractionResult, Mapping, MappingStatus, Variation,
};
