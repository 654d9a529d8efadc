#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("No API credential found; set one of {}", .0.join(", "))]
    MissingCredential(Vec<String>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for coherence_domain::Error {
    fn from(error: Error) -> Self {
        coherence_domain::Error::Configuration(error.to_string())
    }
}
