use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};

use crate::errors::SinkError;
use crate::sinks::Sink;

/// The primary output sink: decoded interleaved I/Q words on standard
/// output, flushed per chunk. Diagnostics must never be written here; the
/// stream is consumed as binary by waveform viewers.
pub struct StdoutSink {
    out: Stdout,
}

impl StdoutSink {
    pub fn new() -> Self {
        StdoutSink { out: tokio::io::stdout() }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn provide(&mut self, data: &[u8]) -> Result<(), SinkError> {
        self.out.write_all(data).await?;
        self.out.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.out.flush().await?;
        Ok(())
    }
}
