//! Output format value object

use serde::{Deserialize, Serialize};

/// How a finished run is printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The final answer as plain text (default)
    #[default]
    Text,
    /// The final answer with termination reason and run counters as JSON
    Json,
}
