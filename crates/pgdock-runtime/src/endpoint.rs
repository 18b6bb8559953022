//! Engine endpoint addresses.
//!
//! Accepted forms:
//! - `""`: the engine's local defaults (`DOCKER_HOST` or the default socket)
//! - `unix:///var/run/docker.sock`
//! - `tcp://host:2375` or `http://host:2375` (port defaults to 2375)
//! - `npipe:////./pipe/docker_engine` (Windows only)
//!
//! `https://` endpoints are recognised but rejected: TLS is not supported.

use std::fmt;
use std::path::PathBuf;

use pgdock_common::constants::LOCAL_HOST;
use pgdock_common::error::EngineError;

/// Default plain-HTTP port of the Docker API.
const DEFAULT_TCP_PORT: u16 = 2375;

/// A parsed engine endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Whatever the engine client picks from the environment.
    LocalDefaults,
    /// A Unix domain socket.
    Unix(PathBuf),
    /// A plain-HTTP TCP address.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// A Windows named pipe.
    NamedPipe(String),
}

impl Endpoint {
    /// Parses an endpoint address.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidEndpoint`] if the address is malformed
    /// or uses an unsupported scheme.
    pub fn parse(endpoint: &str) -> Result<Self, EngineError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Ok(Self::LocalDefaults);
        }

        let invalid = |reason: &str| EngineError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = endpoint
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }
        if rest.is_empty() {
            return Err(invalid("missing address"));
        }

        match scheme {
            "unix" => Ok(Self::Unix(PathBuf::from(rest))),
            "tcp" | "http" => {
                let authority = rest.trim_end_matches('/');
                let (host, port) = match authority.rsplit_once(':') {
                    Some((host, port)) => {
                        let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
                        (host, port)
                    }
                    None => (authority, DEFAULT_TCP_PORT),
                };
                if host.is_empty() || host.contains('/') {
                    return Err(invalid("invalid host"));
                }
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            "https" => Err(invalid("TLS endpoints are not supported")),
            "npipe" if cfg!(windows) => Ok(Self::NamedPipe(rest.to_string())),
            _ => Err(invalid("unsupported scheme")),
        }
    }

    /// Host that ports published by this engine are reachable on.
    #[must_use]
    pub fn published_host(&self) -> &str {
        match self {
            Self::Tcp { host, .. } => host,
            _ => LOCAL_HOST,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalDefaults => write!(f, "local defaults"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::NamedPipe(pipe) => write!(f, "npipe://{pipe}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_means_local_defaults() {
        assert_eq!(Endpoint::parse("").unwrap(), Endpoint::LocalDefaults);
        assert_eq!(Endpoint::parse("  ").unwrap(), Endpoint::LocalDefaults);
    }

    #[test]
    fn missing_scheme_is_rejected() {
        let err = Endpoint::parse("://endpoint").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid endpoint `://endpoint`: missing scheme"
        );
        assert!(Endpoint::parse("endpoint").is_err());
    }

    #[test]
    fn unix_socket_path_is_kept() {
        assert_eq!(
            Endpoint::parse("unix:///var/run/docker.sock").unwrap(),
            Endpoint::Unix(PathBuf::from("/var/run/docker.sock"))
        );
    }

    #[test]
    fn tcp_port_defaults_to_2375() {
        assert_eq!(
            Endpoint::parse("tcp://docker.internal").unwrap(),
            Endpoint::Tcp {
                host: "docker.internal".into(),
                port: 2375
            }
        );
    }

    #[test]
    fn http_scheme_is_tcp() {
        let endpoint = Endpoint::parse("http://10.0.0.5:2376/").unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Tcp {
                host: "10.0.0.5".into(),
                port: 2376
            }
        );
        assert_eq!(endpoint.published_host(), "10.0.0.5");
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(Endpoint::parse("tcp://host:notaport").is_err());
        assert!(Endpoint::parse("tcp://:2375").is_err());
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = Endpoint::parse("ftp://host").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn tls_endpoints_get_their_own_reason() {
        let err = Endpoint::parse("https://docker.internal:2376").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid endpoint `https://docker.internal:2376`: TLS endpoints are not supported"
        );
    }

    #[test]
    fn local_endpoints_publish_on_localhost() {
        assert_eq!(Endpoint::LocalDefaults.published_host(), "localhost");
        assert_eq!(
            Endpoint::parse("unix:///tmp/d.sock").unwrap().published_host(),
            "localhost"
        );
    }
}
