use std::path::PathBuf;

use argh::FromArgs;
use simplelog::LevelFilter;

/// Stream I/Q samples from an AT32 ADC capture board to stdout.
#[derive(FromArgs, Debug)]
pub struct Args {
    /// path to a YAML capture configuration
    #[argh(option)]
    pub config: Option<PathBuf>,

    /// serial device path (overrides the configuration file)
    #[argh(option)]
    pub port: Option<String>,

    /// write the raw, undecoded byte stream to this file
    #[argh(option)]
    pub capture: Option<PathBuf>,

    /// log level for terminal logging (default: Info)
    #[argh(option, default = "LevelFilter::Info")]
    pub level: LevelFilter,
}
