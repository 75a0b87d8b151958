//! Error types for the motd server

use std::fmt;

#[derive(Debug)]
pub enum ServerError {
    /// The listener could not be bound
    Bind {
        addr: String,
        source: Box<std::io::Error>,
    },
    /// The accept loop failed after a successful bind
    Accept(Box<std::io::Error>),
    Cache(motd_cache::CacheError),
    Provider(motd_providers::ProviderError),
    Config(String),
    /// A background task panicked or was aborted
    Task(String),
    Io(Box<std::io::Error>),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Bind { addr, source } => {
                write!(f, "Failed to bind {}: {}", addr, source)
            }
            ServerError::Accept(err) => write!(f, "Failed to accept connection: {}", err),
            ServerError::Cache(err) => write!(f, "Cache error: {}", err),
            ServerError::Provider(err) => write!(f, "Provider error: {}", err),
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Task(msg) => write!(f, "Task error: {}", msg),
            ServerError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind { source, .. } => Some(source.as_ref()),
            ServerError::Accept(err) => Some(err.as_ref()),
            ServerError::Cache(err) => Some(err),
            ServerError::Provider(err) => Some(err),
            ServerError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<motd_cache::CacheError> for ServerError {
    fn from(err: motd_cache::CacheError) -> Self {
        ServerError::Cache(err)
    }
}

impl From<motd_providers::ProviderError> for ServerError {
    fn from(err: motd_providers::ProviderError) -> Self {
        ServerError::Provider(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ServerError::Config("MOTD_LISTEN_PORT must be a port number".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: MOTD_LISTEN_PORT must be a port number"
        );
    }

    #[test]
    fn test_bind_error_display() {
        let err = ServerError::Bind {
            addr: "localhost:4200".to_string(),
            source: Box::new(std::io::Error::from(std::io::ErrorKind::AddrInUse)),
        };
        assert!(format!("{}", err).starts_with("Failed to bind localhost:4200"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cache_error_conversion() {
        let err: ServerError = motd_cache::CacheError::EmptyCache.into();
        assert_eq!(format!("{}", err), "Cache error: No cached files found");
    }

    #[test]
    fn test_error_is_debug() {
        let err = ServerError::Task("worker panicked".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Task"));
    }
}
