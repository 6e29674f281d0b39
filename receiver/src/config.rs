use crate::errors::{Error, Result};
use crate::queue::DEFAULT_CAPACITY;
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_INGRESS_TOPIC: &str = "ruuvi-event-ingress";
const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8088";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 10_000;

/// SASL mechanism used when talking to the brokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    None,
    Plain,
    ScramSha256,
    ScramSha512,
}

impl AuthMechanism {
    pub fn is_scram(self) -> bool {
        matches!(self, Self::ScramSha256 | Self::ScramSha512)
    }
}

impl FromStr for AuthMechanism {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "NONE" => Ok(Self::None),
            "PLAIN" => Ok(Self::Plain),
            "SCRAM-SHA-256" => Ok(Self::ScramSha256),
            "SCRAM-SHA-512" => Ok(Self::ScramSha512),
            other => Err(Error::Config(format!("invalid auth mechanism: {}", other))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything the broker publisher needs. Resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerConfig {
    pub brokers: Vec<String>,
    pub status_topic: String,
    pub own_name: String,
    pub auth_mechanism: AuthMechanism,
    pub credentials: Option<Credentials>,
    pub partition: i32,
    pub publish_timeout: Duration,
}

impl ProducerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let brokers: Vec<String> = get("KAFKA_BROKERS")
            .map(|b| {
                b.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let status_topic = get("KAFKA_STATUS_TOPIC");
        let own_name = get("OWN_NAME");

        let (status_topic, own_name) = match (brokers.is_empty(), status_topic, own_name) {
            (false, Some(status_topic), Some(own_name)) => (status_topic, own_name),
            _ => {
                return Err(Error::Config(
                    "KAFKA_BROKERS, KAFKA_STATUS_TOPIC and OWN_NAME must be set".to_string(),
                ))
            }
        };

        let auth_mechanism: AuthMechanism = get("KAFKA_AUTH_MECHANISM")
            .unwrap_or_default()
            .parse()?;

        let credentials = match (get("KAFKA_USERNAME"), get("KAFKA_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        if auth_mechanism.is_scram() && credentials.is_none() {
            return Err(Error::Config(
                "KAFKA_USERNAME and KAFKA_PASSWORD must be set for SCRAM authentication"
                    .to_string(),
            ));
        }

        let partition = parse_or(&get, "KAFKA_PARTITION", 0)?;
        let publish_timeout_ms = parse_or(&get, "KAFKA_PUBLISH_TIMEOUT_MS", DEFAULT_PUBLISH_TIMEOUT_MS)?;

        Ok(Self {
            brokers,
            status_topic,
            own_name,
            auth_mechanism,
            credentials,
            partition,
            publish_timeout: Duration::from_millis(publish_timeout_ms),
        })
    }
}

/// Settings for the HTTP side and the delivery queue.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub ingress_topic: String,
    pub queue_capacity: usize,
    pub request_timeout: Duration,
    pub json_logs: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let http_addr = get("HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = http_addr
            .parse()
            .map_err(|e| Error::Config(format!("invalid HTTP_ADDR {}: {}", http_addr, e)))?;

        let queue_capacity = parse_or(&get, "QUEUE_CAPACITY", DEFAULT_CAPACITY)?;
        if queue_capacity == 0 {
            return Err(Error::Config("QUEUE_CAPACITY must be greater than 0".to_string()));
        }

        let request_timeout_ms = parse_or(&get, "HTTP_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        let json_logs = match get("LOG_FORMAT").as_deref() {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                return Err(Error::Config(format!("invalid LOG_FORMAT: {}", other)))
            }
        };

        Ok(Self {
            http_addr,
            ingress_topic: get("KAFKA_INGRESS_TOPIC")
                .unwrap_or_else(|| DEFAULT_INGRESS_TOPIC.to_string()),
            queue_capacity,
            request_timeout: Duration::from_millis(request_timeout_ms),
            json_logs,
        })
    }
}

/// Loads `.env` from the working directory into the process environment.
///
/// A missing file is fine; a file that cannot be parsed is a configuration error.
pub fn load_dotenv() -> Result<bool> {
    load_dotenv_from(Path::new(".env"))
}

pub fn load_dotenv_from(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(Error::Config(format!(
            "failed to load {}: {}",
            path.display(),
            e
        ))),
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid {} {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn scratch_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("edge-receiver-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let path = env::temp_dir().join("edge-receiver-no-such-dir/.env");
        assert!(!load_dotenv_from(&path).unwrap());
    }

    #[test]
    fn test_dotenv_values_reach_environment() {
        let path = scratch_file("valid.env", "EDGE_RECEIVER_TEST_DOTENV=loaded\n");
        let result = load_dotenv_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(result.unwrap());
        assert_eq!(env::var("EDGE_RECEIVER_TEST_DOTENV").unwrap(), "loaded");
    }

    #[test]
    fn test_malformed_dotenv_is_config_error() {
        let path = scratch_file("malformed.env", "EDGE_RECEIVER_TEST_BROKEN=\"unterminated\n");
        let result = load_dotenv_from(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    const BASE: [(&str, &str); 3] = [
        ("KAFKA_BROKERS", "localhost:9092"),
        ("KAFKA_STATUS_TOPIC", "status"),
        ("OWN_NAME", "test"),
    ];

    #[test]
    fn test_producer_config_table() {
        struct Case {
            name: &'static str,
            vars: Vec<(&'static str, &'static str)>,
            want_err: bool,
        }

        let with_base = |extra: &[(&'static str, &'static str)]| {
            let mut vars = BASE.to_vec();
            vars.extend_from_slice(extra);
            vars
        };

        let cases = vec![
            Case {
                name: "all set, no auth",
                vars: with_base(&[]),
                want_err: false,
            },
            Case {
                name: "all set, PLAIN auth",
                vars: with_base(&[("KAFKA_AUTH_MECHANISM", "PLAIN")]),
                want_err: false,
            },
            Case {
                name: "all set, SCRAM auth",
                vars: with_base(&[
                    ("KAFKA_AUTH_MECHANISM", "SCRAM-SHA-512"),
                    ("KAFKA_USERNAME", "user"),
                    ("KAFKA_PASSWORD", "pass"),
                ]),
                want_err: false,
            },
            Case {
                name: "SCRAM without credentials",
                vars: with_base(&[("KAFKA_AUTH_MECHANISM", "SCRAM-SHA-256")]),
                want_err: true,
            },
            Case {
                name: "SCRAM without password",
                vars: with_base(&[
                    ("KAFKA_AUTH_MECHANISM", "SCRAM-SHA-256"),
                    ("KAFKA_USERNAME", "user"),
                ]),
                want_err: true,
            },
            Case {
                name: "unknown auth mechanism",
                vars: with_base(&[("KAFKA_AUTH_MECHANISM", "KERBEROS")]),
                want_err: true,
            },
            Case {
                name: "missing KAFKA_BROKERS",
                vars: vec![("KAFKA_STATUS_TOPIC", "status"), ("OWN_NAME", "test")],
                want_err: true,
            },
            Case {
                name: "missing KAFKA_STATUS_TOPIC",
                vars: vec![("KAFKA_BROKERS", "localhost:9092"), ("OWN_NAME", "test")],
                want_err: true,
            },
            Case {
                name: "missing OWN_NAME",
                vars: vec![
                    ("KAFKA_BROKERS", "localhost:9092"),
                    ("KAFKA_STATUS_TOPIC", "status"),
                ],
                want_err: true,
            },
            Case {
                name: "empty OWN_NAME",
                vars: with_base(&[("OWN_NAME", "")]),
                want_err: true,
            },
            Case {
                name: "bad publish timeout",
                vars: with_base(&[("KAFKA_PUBLISH_TIMEOUT_MS", "soon")]),
                want_err: true,
            },
        ];

        for case in cases {
            let result = ProducerConfig::from_lookup(lookup(&case.vars));
            assert_eq!(
                result.is_err(),
                case.want_err,
                "{}: got {:?}",
                case.name,
                result
            );
        }
    }

    #[test]
    fn test_producer_config_values() {
        let config = ProducerConfig::from_lookup(lookup(&[
            ("KAFKA_BROKERS", "kafka-0:9092, kafka-1:9092,"),
            ("KAFKA_STATUS_TOPIC", "status"),
            ("OWN_NAME", "edge-1"),
            ("KAFKA_AUTH_MECHANISM", "SCRAM-SHA-512"),
            ("KAFKA_USERNAME", "user"),
            ("KAFKA_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.brokers, vec!["kafka-0:9092", "kafka-1:9092"]);
        assert_eq!(config.auth_mechanism, AuthMechanism::ScramSha512);
        assert_eq!(config.partition, 0);
        assert_eq!(config.publish_timeout, Duration::from_secs(10));
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_plain_without_credentials() {
        let config = ProducerConfig::from_lookup(lookup(&[
            ("KAFKA_BROKERS", "localhost:9092"),
            ("KAFKA_STATUS_TOPIC", "status"),
            ("OWN_NAME", "test"),
            ("KAFKA_AUTH_MECHANISM", "PLAIN"),
        ]))
        .unwrap();

        assert_eq!(config.auth_mechanism, AuthMechanism::Plain);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.http_addr, "0.0.0.0:8088".parse().unwrap());
        assert_eq!(config.ingress_topic, "ruuvi-event-ingress");
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_server_config_rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("QUEUE_CAPACITY", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("QUEUE_CAPACITY", "lots")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("HTTP_ADDR", "nowhere")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }
}
