use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Data source error: {0}")]
    Source(#[from] lib::errors::DataSourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] lib::errors::SinkError),
}
