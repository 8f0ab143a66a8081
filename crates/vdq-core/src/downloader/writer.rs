//! Sequential writer for a job's destination file.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

pub struct PartWriter {
    file: File,
    path: PathBuf,
    position: u64,
}

impl PartWriter {
    /// Create or truncate `path`.
    pub async fn open_fresh(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            position: 0,
        })
    }

    /// Reopen `path` to continue at `offset`.
    ///
    /// Bytes past `offset` are cut off. If the file is shorter than `offset`
    /// (or missing) writing continues at its real length, which is returned
    /// as `position()`.
    pub async fn open_resume(path: &Path, offset: u64) -> std::io::Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .await?;
        let len = file.metadata().await?.len();
        let position = if len > offset {
            file.set_len(offset).await?;
            offset
        } else {
            len
        };
        file.seek(SeekFrom::Start(position)).await?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            position,
        })
    }

    pub async fn append(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all(data).await?;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Flush and fsync file data; after this the bytes count toward the offset.
    pub async fn sync(&mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_data().await
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
