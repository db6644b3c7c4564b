//! Host to device control protocol
//!
//! Defines the command frames understood by the AT32 capture firmware and
//! the fixed 8-byte control response. All wire values are little-endian
//! 32-bit words, matching the firmware's `usb_cmd_t` layout.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Control response size: echoed command code plus status word.
pub const RESPONSE_LEN: usize = 8;

/// Command codes recognized by the firmware. Must match the firmware's
/// `#define` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandCode {
    CfgGpioPin = 0x1000,
    CfgDma = 0x1001,
    CfgAdc = 0x1002,
    TriggerAdc = 0x1003,
    ReadAdc = 0x1004,
}

impl CommandCode {
    /// Construct a `CommandCode` from its wire value.
    pub fn new(value: u32) -> Result<Self, ProtocolError> {
        match value {
            0x1000 => Ok(CommandCode::CfgGpioPin),
            0x1001 => Ok(CommandCode::CfgDma),
            0x1002 => Ok(CommandCode::CfgAdc),
            0x1003 => Ok(CommandCode::TriggerAdc),
            0x1004 => Ok(CommandCode::ReadAdc),
            _ => Err(ProtocolError::UnknownCommand(value)),
        }
    }
}

/// GPIO port group argument for `CfgGpioPin`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GpioGroup {
    A = 0x00,
    B = 0x01,
}

/// GPIO pin mode argument for `CfgGpioPin`. Values mirror the AT32 SDK
/// `gpio_mode` constants the firmware feeds straight into `gpio_init`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GpioMode {
    Input = 0x00,
    Analog = 0x03,
    Mux = 0x08,
    Output = 0x10,
}

/// GPIO pull argument enumeration, AT32 SDK `gpio_pull` values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GpioPull {
    None = 0x04,
    Up = 0x18,
    Down = 0x28,
}

/// A single request frame: command code plus zero or more word arguments.
///
/// Built, serialized once and discarded. Absent (`None`) arguments are
/// elided at construction time, so the wire argument count is decided per
/// call site rather than per command code. The firmware relies on this:
/// `CfgGpioPin` applies its output value only when the frame carries a
/// fifth word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    code: CommandCode,
    args: Vec<u32>,
}

impl Command {
    pub fn new(code: CommandCode, args: &[Option<u32>]) -> Self {
        Command {
            code,
            args: args.iter().copied().flatten().collect(),
        }
    }

    pub fn code(&self) -> CommandCode {
        self.code
    }

    pub fn args(&self) -> &[u32] {
        &self.args
    }

    /// Serialize to the wire layout: code word first, then each argument
    /// word in order, all little-endian.
    pub fn serialize(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(4 + 4 * self.args.len());
        frame.extend_from_slice(&(self.code as u32).to_le_bytes());
        for arg in &self.args {
            frame.extend_from_slice(&arg.to_le_bytes());
        }
        frame
    }

    /// Parse a serialized frame back into a command. Counterpart of
    /// [`Command::serialize`].
    pub fn parse(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < 4 || frame.len() % 4 != 0 {
            return Err(ProtocolError::TruncatedFrame(frame.len()));
        }
        let code = CommandCode::new(u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]))?;
        let args = frame[4..]
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        Ok(Command { code, args })
    }
}

/// The fixed control response: the echoed command code and a status word,
/// 0 meaning success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub code: u32,
    pub status: u32,
}

impl Response {
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < RESPONSE_LEN {
            return Err(ProtocolError::ShortResponse {
                expected: RESPONSE_LEN,
                actual: buf.len(),
            });
        }
        let mut cursor = Cursor::new(buf);
        let code = cursor.read_u32::<LittleEndian>().map_err(|_| ProtocolError::ShortResponse {
            expected: RESPONSE_LEN,
            actual: buf.len(),
        })?;
        let status = cursor.read_u32::<LittleEndian>().map_err(|_| ProtocolError::ShortResponse {
            expected: RESPONSE_LEN,
            actual: buf.len(),
        })?;
        Ok(Response { code, status })
    }

    /// Check the response against the command that was sent: the code must
    /// be echoed unchanged and the status must be zero.
    pub fn validate(&self, sent: CommandCode) -> Result<(), ProtocolError> {
        if self.code != sent as u32 {
            return Err(ProtocolError::EchoMismatch {
                sent: sent as u32,
                echoed: self.code,
            });
        }
        if self.status != 0 {
            return Err(ProtocolError::FailureStatus {
                code: self.code,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_values() {
        // Command codes are protocol constants and must match the firmware.
        assert_eq!(CommandCode::CfgGpioPin as u32, 0x1000);
        assert_eq!(CommandCode::CfgDma as u32, 0x1001);
        assert_eq!(CommandCode::CfgAdc as u32, 0x1002);
        assert_eq!(CommandCode::TriggerAdc as u32, 0x1003);
        assert_eq!(CommandCode::ReadAdc as u32, 0x1004);
    }

    #[test]
    fn test_gpio_argument_values() {
        assert_eq!(GpioGroup::A as u32, 0x00);
        assert_eq!(GpioGroup::B as u32, 0x01);

        assert_eq!(GpioMode::Input as u32, 0x00);
        assert_eq!(GpioMode::Analog as u32, 0x03);
        assert_eq!(GpioMode::Mux as u32, 0x08);
        assert_eq!(GpioMode::Output as u32, 0x10);

        assert_eq!(GpioPull::None as u32, 0x04);
        assert_eq!(GpioPull::Up as u32, 0x18);
        assert_eq!(GpioPull::Down as u32, 0x28);
    }

    #[test]
    fn test_unknown_command_code_rejected() {
        assert!(matches!(CommandCode::new(0x1000), Ok(CommandCode::CfgGpioPin)));
        assert!(matches!(CommandCode::new(0x1005), Err(ProtocolError::UnknownCommand(0x1005))));
    }

    #[test]
    fn test_none_arguments_are_elided() {
        let cmd = Command::new(
            CommandCode::CfgGpioPin,
            &[Some(0), Some(6), Some(GpioMode::Analog as u32), None],
        );
        assert_eq!(cmd.args(), &[0, 6, 0x03]);

        let cmd = Command::new(CommandCode::CfgGpioPin, &[Some(1), None, Some(2)]);
        assert_eq!(cmd.args(), &[1, 2]);
    }

    #[test]
    fn test_zero_argument_serialization() {
        let cmd = Command::new(CommandCode::CfgDma, &[]);
        assert_eq!(cmd.serialize(), vec![0x01, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn test_gpio_command_serialization() {
        // 4-word frame: value elided for an analog input.
        let cmd = Command::new(CommandCode::CfgGpioPin, &[Some(0x01), Some(7), Some(0x03), None]);
        assert_eq!(
            cmd.serialize(),
            vec![
                0x00, 0x10, 0x00, 0x00, // CFG_GPIO_PIN
                0x01, 0x00, 0x00, 0x00, // group B
                0x07, 0x00, 0x00, 0x00, // pin 7
                0x03, 0x00, 0x00, 0x00, // analog mode
            ]
        );

        // 5-word frame: output mode with an initial value.
        let cmd = Command::new(CommandCode::CfgGpioPin, &[Some(0x00), Some(9), Some(0x10), Some(1)]);
        assert_eq!(cmd.serialize().len(), 20);
        assert_eq!(&cmd.serialize()[16..], &[0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_command_round_trip() {
        for args in [
            vec![],
            vec![Some(1), Some(2), Some(3)],
            vec![Some(0), None, Some(0xFFFF_FFFF), None],
        ] {
            let cmd = Command::new(CommandCode::CfgGpioPin, &args);
            let parsed = Command::parse(&cmd.serialize()).unwrap();
            assert_eq!(parsed, cmd);
            let expected: Vec<u32> = args.iter().copied().flatten().collect();
            assert_eq!(parsed.args(), expected.as_slice());
        }
    }

    #[test]
    fn test_parse_rejects_ragged_frames() {
        assert!(matches!(Command::parse(&[]), Err(ProtocolError::TruncatedFrame(0))));
        assert!(matches!(Command::parse(&[0x00, 0x10]), Err(ProtocolError::TruncatedFrame(2))));
        assert!(matches!(
            Command::parse(&[0x00, 0x10, 0x00, 0x00, 0x01]),
            Err(ProtocolError::TruncatedFrame(5))
        ));
    }

    #[test]
    fn test_response_parse() {
        let resp = Response::parse(&[0x02, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(resp.code, 0x1002);
        assert_eq!(resp.status, 0);

        assert!(matches!(
            Response::parse(&[0x02, 0x10, 0x00]),
            Err(ProtocolError::ShortResponse { expected: 8, actual: 3 })
        ));
    }

    #[test]
    fn test_response_validation() {
        let ok = Response { code: 0x1001, status: 0 };
        assert!(ok.validate(CommandCode::CfgDma).is_ok());

        let wrong_echo = Response { code: 0x1002, status: 0 };
        assert!(matches!(
            wrong_echo.validate(CommandCode::CfgDma),
            Err(ProtocolError::EchoMismatch { sent: 0x1001, echoed: 0x1002 })
        ));

        let failed = Response { code: 0x1001, status: 1 };
        assert!(matches!(
            failed.validate(CommandCode::CfgDma),
            Err(ProtocolError::FailureStatus { code: 0x1001, status: 1 })
        ));
    }
}
