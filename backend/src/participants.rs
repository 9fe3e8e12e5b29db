use std::path::{Path, PathBuf};

use thiserror::Error;
use wheel_core::{parse_weight, ParticipantRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum ParticipantLoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unusable participant list: {0}")]
    Registry(#[from] RegistryError),
}

/// Parses `<name> <weight>` lines. Lines without both fields are skipped.
pub fn parse_participants(text: &str) -> Vec<(String, f64)> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next()?;
            let weight = fields.next()?;
            Some((name.to_string(), parse_weight(weight)))
        })
        .collect()
}

pub async fn load_registry(path: &Path) -> Result<ParticipantRegistry, ParticipantLoadError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ParticipantLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ParticipantRegistry::new(parse_participants(&text))?)
}
