use std::{fs::read_to_string, path::Path};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Chart preset loaded from YAML, every field mirrors a command line option
/// and is overridden by it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    pub input: Option<String>,
    pub filter: Option<String>,
    pub groups: Option<String>,
    pub bars: Option<String>,
    pub stacks: Option<String>,
    pub unit: Option<String>,
    pub output: Option<String>,
    pub yscale: Option<String>,
    pub colors: Option<String>,
    pub strict: Option<bool>,
}

impl ChartConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = read_to_string(path).with_context(|| format!("Read {}", path.display()))?;
        serde_yml::from_str(&data).with_context(|| format!("Parse {}", path.display()))
    }
}
