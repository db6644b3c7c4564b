//! Output sinks for the capture pipeline
//!
//! Two concrete sinks exist: the primary stdout stream carrying decoded
//! sample words and an optional file capturing the raw, undecoded bytes
//! for later replay. Both flush on every write; a live viewer downstream
//! depends on immediate delivery.

mod file;
mod stdout;

pub use file::FileSink;
pub use stdout::StdoutSink;

use async_trait::async_trait;

use crate::errors::SinkError;

#[async_trait]
pub trait Sink: Send {
    /// Write one block of data and flush it through.
    async fn provide(&mut self, data: &[u8]) -> Result<(), SinkError>;

    /// Flush any remaining state and release the sink.
    async fn close(&mut self) -> Result<(), SinkError>;
}
