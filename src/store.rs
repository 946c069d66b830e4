use chrono::Local;
use nanoid::nanoid;
use std::io;
use std::path::{Path, PathBuf};

use crate::data_models::SavedResult;

const ID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Writes finished responses as pretty JSON files, one per request.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> ResultStore {
        ResultStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{YYYYmmdd_HHMMSS}_{prefix}_{id}.json`; the id keeps two saves in the
    /// same second apart.
    pub fn file_name(prefix: &str) -> String {
        format!(
            "{}_{}_{}.json",
            Local::now().format("%Y%m%d_%H%M%S"),
            prefix,
            nanoid!(6, &ID_ALPHABET)
        )
    }

    pub async fn save(&self, prefix: &str, result: &SavedResult) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Self::file_name(prefix));
        let json = serde_json::to_vec_pretty(result)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "saved result");
        Ok(path)
    }
}
