//! File channel.
//!
//! Each worker writes `"<min> <max>"` to `min_max_<ordinal>.txt` inside the
//! run directory. The text is first written to a `.partial` sibling and then
//! renamed, so a worker killed mid-write never leaves a readable half result.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{ChannelKind, ResultReceiver, ResultSender};
use crate::aggregate::MinMax;
use crate::error::{Error, Result};

/// Canonical result file name for a worker.
pub fn result_file_name(ordinal: usize) -> String {
    format!("min_max_{}.txt", ordinal)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Parse `"<min> <max>"`. Anything else is rejected.
pub fn parse_pair(text: &str) -> Option<MinMax> {
    let mut tokens = text.split_whitespace();
    let min = tokens.next()?.parse().ok()?;
    let max = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some(MinMax::new(min, max))
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Directory holding the result files of one run.
///
/// Named `minmax-<uuid>` so concurrent runs never share file names. The
/// directory and anything left in it are removed on drop.
#[derive(Debug)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    pub fn create(parent: &Path) -> Result<Self> {
        let path = parent.join(format!("minmax-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).map_err(|e| {
            Error::ResultsDirectory(format!("{}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "created run directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunDirectory {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove run directory {}: {}", self.path.display(), e);
        }
    }
}

/// Supervisor end of a file channel.
pub struct FileReceiver {
    ordinal: usize,
    path: PathBuf,
}

impl FileReceiver {
    /// Claim the result file name for `ordinal`, clearing any stale file.
    pub fn open(dir: &Path, ordinal: usize) -> Result<Self> {
        let path = dir.join(result_file_name(ordinal));
        remove_if_present(&path).map_err(|e| Error::ChannelSetup {
            ordinal,
            message: format!("stale result file {}: {}", path.display(), e),
        })?;
        Ok(Self { ordinal, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultReceiver for FileReceiver {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::File
    }

    fn receive(&mut self) -> Option<MinMax> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(ordinal = self.ordinal, "no result file");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    ordinal = self.ordinal,
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove {}: {}", self.path.display(), e);
        }

        let parsed = parse_pair(&text);
        if parsed.is_none() {
            tracing::warn!(ordinal = self.ordinal, "malformed result file: {:?}", text);
        }
        parsed
    }

    fn cleanup(&mut self) -> Result<()> {
        remove_if_present(&self.path)?;
        remove_if_present(&partial_path(&self.path))
    }
}

/// Worker end of a file channel.
pub struct FileSender {
    path: PathBuf,
}

impl FileSender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSender for FileSender {
    fn send(&mut self, result: MinMax) -> Result<()> {
        let partial = partial_path(&self.path);
        fs::write(&partial, format!("{} {}", result.min, result.max)).map_err(|e| {
            Error::Worker(format!("Failed to write {}: {}", partial.display(), e))
        })?;
        fs::rename(&partial, &self.path).map_err(|e| {
            Error::Worker(format!("Failed to publish {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
