//! Per-file entry point.

use std::path::{Path, PathBuf};

use eyre::Result;
use tracing::debug;

use crate::pbt::{Options, Reader, Writer};
use crate::storage::MappedFile;

/// Names a packed-tree file and fixes its [`Options`].
///
/// An environment performs no I/O until a reader or writer is requested.
/// Readers and writers opened from the same environment share the branch
/// factor and comparator, which keeps lookups and merges consistent with
/// the order the file was built in.
pub struct Environment {
    path: PathBuf,
    options: Options,
}

impl Environment {
    /// Associates `path` with `options`. The file need not exist yet.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    /// Shorthand for [`Environment::open`] with default options.
    pub fn with_defaults<P: AsRef<Path>>(path: P) -> Self {
        Self::open(path, Options::default())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Maps the sealed file read-only. Fails if the file is missing, has a
    /// bad magic, or carries inconsistent offsets.
    pub fn reader(&self) -> Result<Reader> {
        Reader::open(&self.path, self.options.clone())
    }

    /// Creates (or truncates) the file and returns a bulk-load writer.
    /// Content of a previously sealed file at this path is discarded.
    pub fn writer(&self) -> Result<Writer> {
        let storage = MappedFile::open(&self.path, false)?;
        debug!(path = %self.path.display(), "opened packed-tree writer");
        Writer::new(storage, self.options.clone())
    }

    /// Merges `sources` into `target`, consuming and sealing the target
    /// writer. Equivalent to [`Writer::merge`]; lives here as well because
    /// a merge is an operation *between* environments.
    pub fn merge(sources: &[&Reader], target: Writer) -> Result<()> {
        target.merge(sources)
    }
}
