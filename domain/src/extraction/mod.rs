//! Extraction domain module

pub mod policy;

pub use policy::{ExtractedPage, ExtractionPolicy, ExtractionRoute};
