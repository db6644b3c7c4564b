pub mod adc;

use async_trait::async_trait;

use crate::errors::DataSourceError;

/// Data Source Trait
/// -----------------
///
/// A source is anything that produces the raw sample byte stream after it
/// has been configured and triggered. Sources are inert until `start` is
/// called, so the caller controls when the transport is claimed.
#[async_trait]
pub trait DataSourceT: Send {
    /// Claim the underlying transport and make the source ready for
    /// command traffic. Does not start data collection by itself.
    async fn start(&mut self) -> Result<(), DataSourceError>;

    /// Stop collecting data and release the transport. Internal buffers
    /// may still hold undelivered chunks; they are dropped, not flushed.
    async fn stop(&mut self) -> Result<(), DataSourceError>;

    /// Copy the next available chunk into `buf` and report its size. A
    /// return of 0 means the read window elapsed without data, which is an
    /// expected stall, not an error.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DataSourceError>;
}
