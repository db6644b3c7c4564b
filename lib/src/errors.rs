use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Short response: expected {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    #[error("Command echo mismatch: sent {sent:#06x}, device echoed {echoed:#06x}")]
    EchoMismatch { sent: u32, echoed: u32 },

    #[error("Device reported status {status} for command {code:#06x}")]
    FailureStatus { code: u32, status: u32 },

    #[error("Unknown command code: {0:#06x}")]
    UnknownCommand(u32),

    #[error("Command frame length {0} is not a whole number of words")]
    TruncatedFrame(usize),
}

/// Raised when a sample stream terminates in the middle of a 3-byte group.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("Stream ended with {0} dangling byte(s) of an incomplete sample group")]
    TrailingBytes(usize),
}

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Source not started (must call `start` before)")]
    NotStarted,

    #[error("Source is already streaming")]
    AlreadyStreaming,

    #[error("Read before streaming (must call `begin_read_adc` before)")]
    ReadBeforeStart,

    #[error("Chunk channel disconnected; reader thread stopped")]
    Disconnected,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
