use std::{
    fs::{metadata, read_dir, read_to_string},
    path::Path,
};

use eyre::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

/// Reads every regular file in `dir` as a JSON array of records and concatenates them.
///
/// Symlinks are followed, a dangling one is an error. Files are visited in file name order, so later files win when records collide.
pub fn load_results(dir: &Path) -> Result<Vec<Value>> {
    let mut files = Vec::new();
    for entry in read_dir(dir).with_context(|| format!("Read result dir {}", dir.display()))? {
        let entry = entry.with_context(|| format!("Read result dir {}", dir.display()))?;
        let path = entry.path();
        if metadata(&path)
            .with_context(|| format!("Stat {}", path.display()))?
            .is_file()
        {
            files.push(path);
        }
    }
    files.sort();

    let mut records = Vec::new();
    for file in files {
        let data = read_to_string(&file).with_context(|| format!("Read {}", file.display()))?;
        let json: Value =
            serde_json::from_str(&data).with_context(|| format!("Parse {}", file.display()))?;
        let Value::Array(items) = json else {
            bail!("Expected a JSON array of results in {}", file.display());
        };
        debug!("Loaded {} results from {}", items.len(), file.display());
        records.extend(items);
    }
    Ok(records)
}
