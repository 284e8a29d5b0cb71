//! Loading of genesis and deployment files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context as _;
use serde::de::DeserializeOwned;

fn read_to_string<P: AsRef<Path>>(path: P) -> anyhow::Result<String> {
    let mut contents = String::new();
    {
        let mut file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
        file.read_to_string(&mut contents)?;
    }
    Ok(contents)
}

/// Reads a TOML file and deserializes it.
pub fn from_toml_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let contents = read_to_string(path)?;
    let result: R = toml::from_str(&contents)?;

    Ok(result)
}

/// Reads a JSON file and deserializes it. Genesis configs are stored this way.
pub fn from_json_path<P: AsRef<Path>, R: DeserializeOwned>(path: P) -> anyhow::Result<R> {
    let contents = read_to_string(path)?;
    let result: R = serde_json::from_str(&contents)?;

    Ok(result)
}
