//! Final answer formatting

pub mod console;
