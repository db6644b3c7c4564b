use std::path::Path;

use lib::protocol::{GpioGroup, GpioMode};
use lib::sources::adc::AdcSourceConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::errors::AppError;

const DEFAULT_REPORT_INTERVAL_MS: u64 = 1000;

/// A trait for parsing a YAML file into a config struct using Serde.
pub trait FromYaml: Sized + for<'de> Deserialize<'de> {
    fn from_yaml(file: &Path) -> Result<Self, AppError> {
        let yaml = std::fs::read_to_string(file)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }
}

/// One GPIO pin to configure before acquisition starts. `value` drives the
/// pin high or low and only applies to output modes; leave it out for
/// inputs and analog pins.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GpioPinSetup {
    pub group: GpioGroup,
    pub pin: u32,
    pub mode: GpioMode,
    #[serde(default)]
    pub value: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: AdcSourceConfig,
    /// Throughput report cadence on the diagnostic sink.
    pub report_interval_ms: u64,
    /// Optional file receiving the raw, undecoded byte stream.
    pub capture_file: Option<String>,
    /// Pins configured before DMA/ADC setup. Defaults to the four analog
    /// ADC inputs of the reference board wiring.
    pub gpio_pins: Vec<GpioPinSetup>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            source: AdcSourceConfig::default(),
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            capture_file: None,
            gpio_pins: default_gpio_pins(),
        }
    }
}

impl FromYaml for CaptureConfig {}

fn default_gpio_pins() -> Vec<GpioPinSetup> {
    [(GpioGroup::A, 6), (GpioGroup::A, 7), (GpioGroup::B, 0), (GpioGroup::B, 1)]
        .into_iter()
        .map(|(group, pin)| GpioPinSetup {
            group,
            pin,
            mode: GpioMode::Analog,
            value: None,
        })
        .collect()
}

impl CaptureConfig {
    /// Load the configuration file (or defaults) and overlay the CLI
    /// overrides on top.
    pub fn load(args: &Args) -> Result<Self, AppError> {
        let mut config = match &args.config {
            Some(path) => CaptureConfig::from_yaml(path)?,
            None => CaptureConfig::default(),
        };
        if let Some(port) = &args.port {
            config.source.port_name = port.clone();
        }
        if let Some(capture) = &args.capture {
            config.capture_file = Some(capture.display().to_string());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use simplelog::LevelFilter;

    use super::*;

    #[test]
    fn test_default_config_matches_reference_setup() {
        let config = CaptureConfig::default();
        assert_eq!(config.source.port_name, "/dev/ttyACM0");
        assert_eq!(config.source.chunk_size, 3072);
        assert_eq!(config.source.read_timeout_ms, 2000);
        assert_eq!(config.report_interval_ms, 1000);
        assert!(config.capture_file.is_none());

        let pins: Vec<(GpioGroup, u32)> = config.gpio_pins.iter().map(|p| (p.group, p.pin)).collect();
        assert_eq!(
            pins,
            vec![(GpioGroup::A, 6), (GpioGroup::A, 7), (GpioGroup::B, 0), (GpioGroup::B, 1)]
        );
        assert!(config.gpio_pins.iter().all(|p| p.mode == GpioMode::Analog && p.value.is_none()));
    }

    #[test]
    fn test_config_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.yaml");
        std::fs::write(
            &path,
            r#"
source:
  port_name: /dev/ttyACM3
  chunk_size: 1536
capture_file: run1.iq
gpio_pins:
  - { group: B, pin: 2, mode: Output, value: 1 }
"#,
        )
        .unwrap();

        let config = CaptureConfig::from_yaml(&path).unwrap();
        assert_eq!(config.source.port_name, "/dev/ttyACM3");
        assert_eq!(config.source.chunk_size, 1536);
        // Unspecified fields keep their defaults.
        assert_eq!(config.source.read_timeout_ms, 2000);
        assert_eq!(config.report_interval_ms, 1000);
        assert_eq!(config.capture_file.as_deref(), Some("run1.iq"));

        assert_eq!(config.gpio_pins.len(), 1);
        let pin = &config.gpio_pins[0];
        assert_eq!(pin.group, GpioGroup::B);
        assert_eq!(pin.pin, 2);
        assert_eq!(pin.mode, GpioMode::Output);
        assert_eq!(pin.value, Some(1));
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args {
            config: None,
            port: Some("/dev/ttyUSB7".to_string()),
            capture: Some("override.iq".into()),
            level: LevelFilter::Info,
        };

        let config = CaptureConfig::load(&args).unwrap();
        assert_eq!(config.source.port_name, "/dev/ttyUSB7");
        assert_eq!(config.capture_file.as_deref(), Some("override.iq"));
    }
}
