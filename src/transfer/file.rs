//! Positional file access shared by concurrent chunks.
//!
//! Every chunk reads or writes only its own byte range, so one handle is
//! shared without locking. Blocking calls run on tokio's blocking pool.

use crate::error::{Error, Result};

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::task::spawn_blocking;

/// A file handle shared across chunk operations.
#[derive(Debug, Clone)]
pub struct SharedFile {
    file: Arc<File>,
}

impl SharedFile {
    /// Creates or truncates the file at `path` for writing.
    pub async fn create(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        let file = blocking(move || {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
        })
        .await?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Opens the file at `path` for reading.
    pub async fn open(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        let file = blocking(move || File::open(path)).await?;
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Current size of the file.
    pub async fn size(&self) -> Result<u64> {
        let file = Arc::clone(&self.file);
        blocking(move || file.metadata().map(|m| m.len())).await
    }

    /// Truncates or extends the file to `size` bytes.
    pub async fn set_len(&self, size: u64) -> Result<()> {
        let file = Arc::clone(&self.file);
        blocking(move || file.set_len(size)).await
    }

    /// Writes all of `data` at `offset`.
    pub async fn write_at(&self, offset: u64, data: Vec<u8>) -> Result<()> {
        let file = Arc::clone(&self.file);
        blocking(move || write_all_at(&file, &data, offset)).await
    }

    /// Reads exactly `length` bytes at `offset`.
    pub async fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let length = usize::try_from(length)
            .map_err(|_| Error::InvalidArgument(format!("cannot buffer {} bytes", length)))?;
        let file = Arc::clone(&self.file);
        blocking(move || {
            let mut buf = vec![0u8; length];
            read_exact_at(&file, &mut buf, offset)?;
            Ok(buf)
        })
        .await
    }

    /// Flushes written data to disk.
    pub async fn sync(&self) -> Result<()> {
        let file = Arc::clone(&self.file);
        blocking(move || file.sync_all()).await
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("file task failed: {}", e)))?
        .map_err(Error::from)
}

#[cfg(unix)]
fn write_all_at(file: &File, data: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(data, offset)
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut data: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !data.is_empty() {
        match file.seek_write(data, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                data = &data[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
