//! Application-level configuration.
//!
//! - [`ExecutionParams`]: orchestration loop control (depth, timeouts, parallelism)
//! - [`RetrievalParams`]: chunking, ranking and cache lifetime

pub mod execution_params;
pub mod retrieval_params;

pub use execution_params::ExecutionParams;
pub use retrieval_params::RetrievalParams;
