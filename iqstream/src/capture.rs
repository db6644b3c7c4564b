//! Acquisition sequence and streaming consumer loop.

use std::time::Duration;

use lib::decoder::{samples_to_le_bytes, Sc12Decoder};
use lib::sinks::{FileSink, Sink, StdoutSink};
use lib::sources::adc::AdcSource;
use lib::sources::DataSourceT;
use lib::throughput::ThroughputMeter;
use log::{error, info, warn};

use crate::config::CaptureConfig;
use crate::errors::AppError;

/// Run one capture session: configure the board, trigger acquisition and
/// consume the stream until it fails or the user interrupts.
pub async fn run(config: CaptureConfig) -> Result<(), AppError> {
    let mut source = AdcSource::new(config.source.clone());
    source.start().await?;

    for pin in &config.gpio_pins {
        source.configure_gpio(pin.group, pin.pin, pin.mode, pin.value)?;
    }
    source.configure_dma()?;
    source.configure_adc()?;
    source.trigger_adc()?;
    source.begin_read_adc()?;

    let mut stdout_sink = StdoutSink::new();
    let mut capture_sink = match &config.capture_file {
        Some(path) => Some(FileSink::create(path).await?),
        None => None,
    };
    let mut decoder = Sc12Decoder::new();
    let mut meter = ThroughputMeter::new(Duration::from_millis(config.report_interval_ms));
    let mut buf = vec![0u8; config.source.chunk_size];

    let result = stream(
        &mut source,
        &mut stdout_sink,
        capture_sink.as_mut(),
        &mut decoder,
        &mut meter,
        &mut buf,
    )
    .await;

    // Orderly shutdown on every exit path: stop the reader first, then
    // flush and close each sink.
    if let Err(e) = source.stop().await {
        error!("Failed to stop ADC source: {e}");
    }
    if let Some(sink) = capture_sink.as_mut() {
        if let Err(e) = sink.close().await {
            error!("Failed to close capture file: {e}");
        }
    }
    if let Err(e) = stdout_sink.close().await {
        error!("Failed to flush stdout: {e}");
    }
    if let Err(e) = decoder.finish() {
        warn!("{e}");
    }
    result
}

async fn stream(
    source: &mut AdcSource,
    stdout_sink: &mut StdoutSink,
    mut capture_sink: Option<&mut FileSink>,
    decoder: &mut Sc12Decoder,
    meter: &mut ThroughputMeter,
    buf: &mut [u8],
) -> Result<(), AppError> {
    info!("Streaming from {}; interrupt (Ctrl-C) to stop", source.port_name());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; shutting down");
                return Ok(());
            }
            read = source.read(buf) => {
                let n = read?;
                if n > 0 {
                    let raw = &buf[..n];
                    if let Some(sink) = capture_sink.as_deref_mut() {
                        sink.provide(raw).await?;
                    }
                    let samples = decoder.decode(raw);
                    meter.record(samples.len() as u64);
                    if !samples.is_empty() {
                        stdout_sink.provide(&samples_to_le_bytes(&samples)).await?;
                    }
                }
                if let Some(rate) = meter.poll() {
                    info!("{rate} samples per second");
                }
            }
        }
    }
}
