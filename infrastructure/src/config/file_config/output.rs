//! `[output]` section: how answers and progress reach the terminal

use conductor_domain::OutputFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Answer format when `--output` is not given
    pub format: Option<OutputFormat>,
    /// ANSI colors in answers and progress lines
    pub color: bool,
    /// Round and tool activity on stderr
    pub progress: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            progress: true,
        }
    }
}

impl FileOutputConfig {
    /// Command-line choice first, then the file, then [`OutputFormat::Text`].
    pub fn resolve_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.or(self.format).unwrap_or_default()
    }
}
