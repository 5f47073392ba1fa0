use crate::deploy::{is_log_file_name, log_stem};
use crate::error::LogError;

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Read-only view over the deploy log directory.
///
/// The files are written by the deploy process; this type never creates,
/// modifies or removes them.
#[derive(Clone, Debug)]
pub struct LogReader {
    dir: PathBuf,
}

impl LogReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deploy log file names, most recent first. A missing directory is empty.
    pub async fn list(&self) -> Result<Vec<String>, LogError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && is_log_file_name(name)
            {
                names.push(name.to_string());
            }
        }

        names.sort_unstable_by(|a, b| log_stem(b).cmp(log_stem(a)));
        Ok(names)
    }

    pub async fn read(&self, name: &str) -> Result<String, LogError> {
        let path = self.resolve(name)?;

        let canonical = match fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LogError::NotFound(name.to_string()));
            }
            Err(e) => return Err(LogError::Io(e)),
        };
        let root = fs::canonicalize(&self.dir).await?;
        if !canonical.starts_with(&root) {
            return Err(LogError::InvalidName(name.to_string()));
        }

        match fs::read(&canonical).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(LogError::NotFound(name.to_string()))
            }
            Err(e) => Err(LogError::Io(e)),
        }
    }

    /// Only bare file names following the deploy log convention are accepted.
    fn resolve(&self, name: &str) -> Result<PathBuf, LogError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains('\\') => {}
            _ => return Err(LogError::InvalidName(name.to_string())),
        }
        if !is_log_file_name(name) {
            return Err(LogError::NotFound(name.to_string()));
        }
        Ok(self.dir.join(name))
    }
}
