use async_trait::async_trait;
use log::trace;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::errors::SinkError;
use crate::sinks::Sink;

/// A sink that appends raw captured bytes to a file, flushed per write so
/// the capture survives an abrupt process end.
pub struct FileSink {
    path: String,
    file: File,
}

impl FileSink {
    pub async fn create(path: &str) -> Result<Self, SinkError> {
        trace!("Creating capture file sink: {path}");
        let file = File::create(path).await?;
        Ok(FileSink { path: path.to_string(), file })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn provide(&mut self, data: &[u8]) -> Result<(), SinkError> {
        self.file.write_all(data).await?;
        self.file.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_sink_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.iq");
        let path = path.to_str().unwrap();

        let mut sink = FileSink::create(path).await.unwrap();
        sink.provide(&[0xDE, 0xAD]).await.unwrap();
        sink.provide(&[0xBE, 0xEF]).await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(sink.path(), path);
    }
}
