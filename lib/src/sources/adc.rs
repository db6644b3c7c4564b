//! AT32 ADC Data Source
//!
//! Owns the serial transport for one capture session: drives the
//! command/response channel while configuring the device, then hands the
//! transport to a reader thread that feeds timeout-bounded sample chunks
//! into a bounded channel.

use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{DataSourceError, TransportError};
use crate::protocol::{Command, CommandCode, GpioGroup, GpioMode, Response, RESPONSE_LEN};
use crate::sources::DataSourceT;
use crate::transport::{open_serial, Transport};

const DEFAULT_PORT_NAME: &str = "/dev/ttyACM0";
const DEFAULT_BAUD_RATE: u32 = 115_200;
const DEFAULT_CHUNK_SIZE: usize = 3072;
const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 200;
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Per-`read` timeout on the serial port itself. Bounds how long the
/// reader thread can sit in a blocking read before it rechecks the
/// running flag, so `stop` stays prompt.
const SERIAL_POLL_TIMEOUT_MS: u64 = 50;

/// Configuration for the [`AdcSource`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdcSourceConfig {
    #[serde(default = "default_port_name")]
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Target bytes per streaming chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Accumulation window for one streaming chunk; a chunk is delivered
    /// short if the window elapses first.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Window for collecting the 8-byte control response to a command.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Bounded chunk queue capacity between the reader thread and the
    /// consumer.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_port_name() -> String {
    DEFAULT_PORT_NAME.to_string()
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}
fn default_response_timeout_ms() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for AdcSourceConfig {
    fn default() -> Self {
        AdcSourceConfig {
            port_name: default_port_name(),
            baud_rate: default_baud_rate(),
            chunk_size: default_chunk_size(),
            read_timeout_ms: default_read_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// One capture session with the AT32 ADC firmware.
///
/// Lifecycle: `start` claims the transport, the `configure_*` and
/// `trigger_adc` operations run the command/response channel, and
/// `begin_read_adc` switches the session into streaming mode. From then on
/// the transport belongs to the reader thread and only `read`/`stop` are
/// meaningful.
pub struct AdcSource {
    config: AdcSourceConfig,
    transport: Option<Box<dyn Transport>>,
    is_streaming: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
    chunk_rx: Option<Receiver<Vec<u8>>>,
}

impl AdcSource {
    pub fn new(config: AdcSourceConfig) -> Self {
        AdcSource {
            config,
            transport: None,
            is_streaming: Arc::new(AtomicBool::new(false)),
            reader_thread: None,
            chunk_rx: None,
        }
    }

    /// Build a source over an already-open transport. Used by tests and by
    /// callers that tunnel the protocol over something other than a local
    /// serial port.
    pub fn with_transport(config: AdcSourceConfig, transport: Box<dyn Transport>) -> Self {
        let mut source = AdcSource::new(config);
        source.transport = Some(transport);
        source
    }

    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming.load(AtomicOrdering::Relaxed)
    }

    /// Configure one GPIO pin. The output `value` word is elided when
    /// `None`; the firmware only drives the pin when the frame carries all
    /// five words.
    pub fn configure_gpio(&mut self, group: GpioGroup, pin: u32, mode: GpioMode, value: Option<u32>) -> Result<(), DataSourceError> {
        debug!("Configuring GPIO{group:?} pin {pin} as {mode:?} (value: {value:?})");
        let cmd = Command::new(
            CommandCode::CfgGpioPin,
            &[Some(group as u32), Some(pin), Some(mode as u32), value],
        );
        self.transact(&cmd)
    }

    pub fn configure_dma(&mut self) -> Result<(), DataSourceError> {
        debug!("Configuring DMA");
        self.transact(&Command::new(CommandCode::CfgDma, &[]))
    }

    pub fn configure_adc(&mut self) -> Result<(), DataSourceError> {
        debug!("Configuring ADC");
        self.transact(&Command::new(CommandCode::CfgAdc, &[]))
    }

    pub fn trigger_adc(&mut self) -> Result<(), DataSourceError> {
        debug!("Triggering ADC conversion");
        self.transact(&Command::new(CommandCode::TriggerAdc, &[]))
    }

    /// Send `READ_ADC` and switch into streaming mode. The device answers
    /// with a continuous unframed byte stream instead of a control
    /// response, so this moves the transport into the reader thread and
    /// never reads an 8-byte reply.
    pub fn begin_read_adc(&mut self) -> Result<(), DataSourceError> {
        if self.is_streaming.load(AtomicOrdering::SeqCst) {
            return Err(DataSourceError::AlreadyStreaming);
        }

        let cmd = Command::new(CommandCode::ReadAdc, &[]);
        {
            let transport = self.transport_mut()?;
            transport.write_all(&cmd.serialize()).map_err(TransportError::Io)?;
            transport.flush().map_err(TransportError::Io)?;
        }

        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => return Err(DataSourceError::NotStarted),
        };

        let (chunk_tx, chunk_rx) = bounded(self.config.channel_capacity);
        self.is_streaming.store(true, AtomicOrdering::SeqCst);

        let flag = Arc::clone(&self.is_streaming);
        let drain_rx = chunk_rx.clone();
        let chunk_size = self.config.chunk_size;
        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);

        let handle = thread::Builder::new()
            .name("adc-reader".to_string())
            .spawn(move || reader_loop(transport, chunk_tx, drain_rx, flag, chunk_size, read_timeout))
            .map_err(|e| DataSourceError::Transport(TransportError::Io(e)))?;

        self.reader_thread = Some(handle);
        self.chunk_rx = Some(chunk_rx);
        info!(
            "ADC streaming started ({} byte chunks, {} ms accumulation window)",
            self.config.chunk_size, self.config.read_timeout_ms
        );
        Ok(())
    }

    /// One write, one bounded read, one validation. No retries and no
    /// buffering across calls.
    fn transact(&mut self, cmd: &Command) -> Result<(), DataSourceError> {
        let timeout = Duration::from_millis(self.config.response_timeout_ms);
        let transport = self.transport_mut()?;

        transport.write_all(&cmd.serialize()).map_err(TransportError::Io)?;
        transport.flush().map_err(TransportError::Io)?;

        let raw = read_exact_timeout(&mut **transport, RESPONSE_LEN, timeout)?;
        let response = Response::parse(&raw)?;
        response.validate(cmd.code())?;
        trace!("Command {:?} acknowledged", cmd.code());
        Ok(())
    }

    fn transport_mut(&mut self) -> Result<&mut Box<dyn Transport>, DataSourceError> {
        match self.transport.as_mut() {
            Some(transport) => Ok(transport),
            None if self.is_streaming.load(AtomicOrdering::Relaxed) => Err(DataSourceError::AlreadyStreaming),
            None => Err(DataSourceError::NotStarted),
        }
    }
}

/// Accumulate exactly `count` bytes or whatever arrived before the
/// deadline. Timed-out reads are an expected idle condition.
fn read_exact_timeout(transport: &mut dyn Transport, count: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
    let deadline = Instant::now() + timeout;
    let mut data = Vec::with_capacity(count);
    let mut buf = vec![0u8; count];

    while data.len() < count && Instant::now() < deadline {
        match transport.read(&mut buf[..count - data.len()]) {
            Ok(0) => thread::sleep(Duration::from_millis(1)),
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == IoErrorKind::TimedOut || e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Io(e)),
        }
    }
    Ok(data)
}

/// The streaming reader loop. Owns the transport until the session ends.
///
/// Each iteration accumulates up to `chunk_size` bytes within the
/// `read_timeout` window and pushes whatever it got. When the queue is
/// full the oldest undelivered chunk is dropped so a slow consumer can
/// never stall the serial cadence.
fn reader_loop(
    mut transport: Box<dyn Transport>,
    chunk_tx: Sender<Vec<u8>>,
    drain_rx: Receiver<Vec<u8>>,
    is_streaming: Arc<AtomicBool>,
    chunk_size: usize,
    read_timeout: Duration,
) {
    info!("ADC reader thread started");
    let mut buf = vec![0u8; chunk_size];

    'session: while is_streaming.load(AtomicOrdering::Relaxed) {
        let mut chunk = Vec::with_capacity(chunk_size);
        let deadline = Instant::now() + read_timeout;

        while chunk.len() < chunk_size && Instant::now() < deadline && is_streaming.load(AtomicOrdering::Relaxed) {
            match transport.read(&mut buf[..chunk_size - chunk.len()]) {
                Ok(0) => thread::sleep(Duration::from_millis(5)),
                Ok(n) => chunk.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == IoErrorKind::TimedOut || e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("Serial read failed: {e}; terminating ADC reader");
                    is_streaming.store(false, AtomicOrdering::Relaxed);
                    break 'session;
                }
            }
        }

        if chunk.is_empty() {
            trace!("Read window elapsed with no data");
            continue;
        }

        if chunk_tx.is_full() && drain_rx.try_recv().is_ok() {
            warn!("Chunk queue full; dropped oldest undelivered chunk");
        }
        if chunk_tx.try_send(chunk).is_err() {
            info!("Chunk queue disconnected; ADC reader exiting");
            break;
        }
    }

    is_streaming.store(false, AtomicOrdering::Relaxed);
    info!("ADC reader thread finished");
}

#[async_trait]
impl DataSourceT for AdcSource {
    async fn start(&mut self) -> Result<(), DataSourceError> {
        if self.transport.is_some() || self.is_streaming.load(AtomicOrdering::Relaxed) {
            info!("ADC source already started");
            return Ok(());
        }
        let transport = open_serial(
            &self.config.port_name,
            self.config.baud_rate,
            Duration::from_millis(SERIAL_POLL_TIMEOUT_MS),
        )?;
        self.transport = Some(transport);
        info!("ADC source started on {}", self.config.port_name);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), DataSourceError> {
        self.is_streaming.store(false, AtomicOrdering::SeqCst);

        if let Some(handle) = self.reader_thread.take() {
            debug!("Waiting for ADC reader thread to join");
            if handle.join().is_err() {
                error!("ADC reader thread panicked");
            }
        }
        // Dropping the transport closes the command-phase port; in
        // streaming mode the reader thread already owned and dropped it.
        self.transport = None;
        self.chunk_rx = None;
        info!("ADC source stopped");
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DataSourceError> {
        let rx = match self.chunk_rx.as_ref() {
            Some(rx) => rx.clone(),
            None => return Err(DataSourceError::ReadBeforeStart),
        };
        let timeout = Duration::from_millis(self.config.read_timeout_ms);

        match tokio::task::spawn_blocking(move || rx.recv_timeout(timeout)).await {
            Ok(Ok(chunk)) => {
                if chunk.len() > buf.len() {
                    warn!(
                        "Caller buffer ({} bytes) smaller than chunk ({} bytes); truncating",
                        buf.len(),
                        chunk.len()
                    );
                    buf.copy_from_slice(&chunk[..buf.len()]);
                    Ok(buf.len())
                } else {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
            }
            Ok(Err(RecvTimeoutError::Timeout)) => Ok(0),
            Ok(Err(RecvTimeoutError::Disconnected)) => Err(DataSourceError::Disconnected),
            Err(join_err) => {
                error!("Chunk receive task failed: {join_err}");
                Err(DataSourceError::Disconnected)
            }
        }
    }
}

impl Drop for AdcSource {
    fn drop(&mut self) {
        self.is_streaming.store(false, AtomicOrdering::SeqCst);
        if let Some(handle) = self.reader_thread.take() {
            if handle.join().is_err() {
                error!("ADC reader thread panicked during drop");
            }
        }
    }
}
