use thiserror::Error;

pub type MurmurResult<T> = Result<T, MurmurError>;

#[derive(Debug, Error)]
pub enum MurmurError {
    #[error("config error: {0}")]
    Config(String),

    #[error("parsing config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
