use ledgerdoc_core::{ConfigError, DriverError, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DatasourceResult<T> = Result<T, DatasourceError>;

/// Failure surfaced to the host for one datasource call.
#[derive(Debug)]
pub enum DatasourceError {
    Config(ConfigError),
    Payload(serde_json::Error),
    UnknownOperation(String),
    Repo(RepoError),
    Driver(DriverError),
}

impl Display for DatasourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Payload(err) => write!(f, "invalid payload: {err}"),
            Self::UnknownOperation(name) => write!(f, "unknown operation `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Driver(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DatasourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Payload(err) => Some(err),
            Self::UnknownOperation(_) => None,
            Self::Repo(err) => Some(err),
            Self::Driver(err) => Some(err),
        }
    }
}

impl From<ConfigError> for DatasourceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<serde_json::Error> for DatasourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

impl From<RepoError> for DatasourceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DriverError> for DatasourceError {
    fn from(value: DriverError) -> Self {
        Self::Driver(value)
    }
}
