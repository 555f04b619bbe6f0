//! Memory-mapped file storage.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::{Mmap, MmapMut};
use tracing::debug;

use crate::config::INITIAL_FILE_SIZE;

enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

/// A file-backed byte region.
///
/// At any observable moment either no mapping exists (the file is empty) or
/// the mapping covers exactly [`size()`](MappedFile::size) bytes. Resizing
/// unmaps before truncating, so a partially remapped state is never visible.
///
/// Opening read-write creates the file if absent and sets its length to
/// [`INITIAL_FILE_SIZE`]; the writer truncates back to the exact data size
/// when it seals the file. Opening read-only maps the file as it is and
/// fails if it does not exist.
pub struct MappedFile {
    path: PathBuf,
    file: File,
    mapping: Option<Mapping>,
    len: u64,
    read_only: bool,
}

impl MappedFile {
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let path = path.as_ref();

        let file = Self::open_file(path, read_only)?;

        let mut storage = Self {
            path: path.to_path_buf(),
            file,
            mapping: None,
            len: 0,
            read_only,
        };

        if read_only {
            let metadata = storage
                .file
                .metadata()
                .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?;
            storage.len = metadata.len();
        } else {
            storage
                .file
                .set_len(INITIAL_FILE_SIZE)
                .wrap_err_with(|| format!("failed to size '{}'", path.display()))?;
            storage.len = INITIAL_FILE_SIZE;
        }

        storage.map()?;
        Ok(storage)
    }

    fn open_file(path: &Path, read_only: bool) -> Result<File> {
        if read_only {
            OpenOptions::new()
                .read(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open '{}' read-only", path.display()))
        } else {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open '{}' read-write", path.display()))
        }
    }

    fn map(&mut self) -> Result<()> {
        if self.len == 0 {
            self.mapping = None;
            return Ok(());
        }

        // SAFETY: mapping a file is unsafe because external processes could
        // mutate it underneath us. This is sound here because:
        // 1. Storage files are owned by this library and not shared.
        // 2. The mapping's lifetime is tied to MappedFile, and resize/mode
        //    switches drop it before touching the file length.
        // 3. All access is bounds-checked through as_slice()/as_mut_slice().
        let mapping = if self.read_only {
            Mapping::ReadOnly(unsafe {
                Mmap::map(&self.file)
                    .wrap_err_with(|| format!("failed to map '{}'", self.path.display()))?
            })
        } else {
            Mapping::ReadWrite(unsafe {
                MmapMut::map_mut(&self.file)
                    .wrap_err_with(|| format!("failed to map '{}' writable", self.path.display()))?
            })
        };

        self.mapping = Some(mapping);
        Ok(())
    }

    /// Cached file length in bytes.
    pub fn size(&self) -> u64 {
        self.len
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncates or extends the file to `new_len` bytes and remaps.
    /// A no-op when the length is unchanged. Errors on read-only storage.
    pub fn resize(&mut self, new_len: u64) -> Result<()> {
        ensure!(
            !self.read_only,
            "cannot resize read-only storage '{}'",
            self.path.display()
        );
        if new_len == self.len {
            return Ok(());
        }

        debug!(
            path = %self.path.display(),
            old_len = self.len,
            new_len,
            "resizing mapped storage"
        );

        // Unmap before truncating so the kernel never sees a mapping longer
        // than the file.
        self.mapping = None;
        self.file
            .set_len(new_len)
            .wrap_err_with(|| format!("failed to resize '{}'", self.path.display()))?;
        self.len = new_len;
        self.map()
    }

    /// Remaps the file in the requested mode, reopening the descriptor with
    /// matching permissions. A no-op when the mode is unchanged.
    pub fn set_read_only(&mut self, read_only: bool) -> Result<()> {
        if read_only == self.read_only {
            return Ok(());
        }

        self.mapping = None;
        self.file = Self::open_file(&self.path, read_only)?;
        self.read_only = read_only;
        self.map()
    }

    /// The mapped bytes; empty when the file is empty.
    pub fn as_slice(&self) -> &[u8] {
        match &self.mapping {
            None => &[],
            Some(Mapping::ReadOnly(map)) => map,
            Some(Mapping::ReadWrite(map)) => map,
        }
    }

    /// The mapped bytes, writable. Errors on read-only storage.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        ensure!(
            !self.read_only,
            "cannot write to read-only storage '{}'",
            self.path.display()
        );
        match &mut self.mapping {
            None => Ok(&mut []),
            Some(Mapping::ReadWrite(map)) => Ok(&mut map[..]),
            // Unreachable: a read-only mapping implies read_only == true.
            Some(Mapping::ReadOnly(_)) => unreachable!("read-only mapping on writable storage"),
        }
    }

    /// Asynchronously schedules the mapped region to be written back to the
    /// file. Returns once the flush is queued, not once it is durable.
    pub fn flush(&self) -> Result<()> {
        if let Some(Mapping::ReadWrite(map)) = &self.mapping {
            map.flush_async()
                .wrap_err_with(|| format!("failed to flush '{}'", self.path.display()))?;
        }
        Ok(())
    }

    /// Hints the kernel that `[offset, offset + len)` will be read soon.
    /// Best effort; a no-op on non-Unix platforms or when out of range.
    pub fn advise_willneed(&self, offset: u64, len: u64) {
        let slice = self.as_slice();
        let Ok(offset) = usize::try_from(offset) else {
            return;
        };
        if offset >= slice.len() || len == 0 {
            return;
        }
        let len = usize::try_from(len)
            .unwrap_or(usize::MAX)
            .min(slice.len() - offset);

        #[cfg(unix)]
        // SAFETY: madvise with MADV_WILLNEED is only a hint. The range is
        // clamped above, so it lies entirely inside the live mapping.
        unsafe {
            libc::madvise(
                slice.as_ptr().add(offset) as *mut libc::c_void,
                len,
                libc::MADV_WILLNEED,
            );
        }
        #[cfg(not(unix))]
        let _ = len;
    }
}
