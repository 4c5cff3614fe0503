/// Blocking file read stream

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read-only stream over a file on disk
///
/// Opening fails with `Error::FileReadFailed` instead of yielding an empty
/// stream, so callers never mistake a missing file for an empty one.
#[derive(Debug)]
pub struct FileReadStream {
    path: PathBuf,
    file: File,
    remaining: u64,
}

impl FileReadStream {
    /// Open a file for reading
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the file to open
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|error| {
            Error::FileReadFailed(format!("cannot open '{}': {}", path.display(), error))
        })?;
        let remaining = file
            .metadata()
            .map_err(|error| {
                Error::FileReadFailed(format!("cannot stat '{}': {}", path.display(), error))
            })?
            .len();
        Ok(Self { path, file, remaining })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes not yet consumed
    pub fn remaining_byte_count(&self) -> u64 {
        self.remaining
    }

    /// Read everything left in the stream
    pub fn read_entire(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.remaining as usize);
        self.file.read_to_end(&mut bytes).map_err(|error| {
            Error::FileReadFailed(format!("cannot read '{}': {}", self.path.display(), error))
        })?;
        self.remaining = 0;
        Ok(bytes)
    }

    /// Close the stream
    pub fn close(self) {}
}

/// Open `path`, read it in full and close it
pub fn read_entire_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let mut stream = FileReadStream::open(path)?;
    let bytes = stream.read_entire()?;
    stream.close();
    Ok(bytes)
}

#[cfg(test)]
#[path = "file_stream_tests.rs"]
mod tests;
