use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use hcs_types::Consistency;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::statement::Schema;

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_KEYSPACE: &str = "vault";
pub const DEFAULT_TABLE: &str = "entries";
pub const DEFAULT_BUCKET_TABLE: &str = "buckets";
pub const DEFAULT_PROTOCOL_VERSION: u8 = 2;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_PARALLEL: usize = 128;

/// Largest permit count the statement semaphore can hold.
pub const MAX_PARALLEL_LIMIT: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Highest native protocol version any supported cluster speaks.
pub const MAX_PROTOCOL_VERSION: u8 = 5;

/// Connection and schema settings for a column-store cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Contact points as `host:port`.
    pub hosts: Vec<String>,
    pub keyspace: String,
    /// Entries table (full key → value).
    pub table: String,
    /// Bucket membership table (bucket → set of child names).
    pub bucket_table: String,
    pub read_consistency: Consistency,
    pub write_consistency: Consistency,
    pub protocol_version: u8,
    /// Upper bound on establishing the initial session.
    pub connect_timeout: Duration,
    /// Maximum number of statements in flight at once.
    pub max_parallel: usize,
    pub credentials: Option<Credentials>,
    pub tls: Option<TlsConfig>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            keyspace: DEFAULT_KEYSPACE.to_string(),
            table: DEFAULT_TABLE.to_string(),
            bucket_table: DEFAULT_BUCKET_TABLE.to_string(),
            read_consistency: Consistency::default(),
            write_consistency: Consistency::default(),
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_parallel: DEFAULT_MAX_PARALLEL,
            credentials: None,
            tls: None,
        }
    }
}

impl ClusterConfig {
    /// Parse the flat string map a storage backend is constructed with.
    ///
    /// Fails if `hosts` is missing or empty, or if any recognised value is
    /// malformed. Unknown keys are ignored.
    pub fn from_map(conf: &HashMap<String, String>) -> SessionResult<Self> {
        let get = |key: &str| conf.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let port = match get("port") {
            Some(raw) => parse_value::<u16>("port", raw)?,
            None => DEFAULT_PORT,
        };

        let hosts = get("hosts")
            .map(|raw| parse_hosts(raw, port))
            .transpose()?
            .unwrap_or_default();
        if hosts.is_empty() {
            return Err(SessionError::Config("'hosts' must be set".into()));
        }

        let mut config = ClusterConfig {
            hosts,
            ..Default::default()
        };

        if let Some(keyspace) = get("keyspace") {
            config.keyspace = parse_identifier("keyspace", keyspace)?;
        }
        if let Some(table) = get("table") {
            config.table = parse_identifier("table", table)?;
        }
        if let Some(table) = get("bucket_table") {
            config.bucket_table = parse_identifier("bucket_table", table)?;
        }
        if config.table == config.bucket_table {
            return Err(SessionError::Config(
                "'table' and 'bucket_table' must name different tables".into(),
            ));
        }

        if let Some(level) = get("consistency") {
            let level: Consistency = level.parse()?;
            config.read_consistency = level;
            config.write_consistency = level;
        }
        if let Some(level) = get("read_consistency") {
            config.read_consistency = level.parse()?;
        }
        if let Some(level) = get("write_consistency") {
            config.write_consistency = level.parse()?;
        }
        if !config.read_consistency.is_valid_for_reads() {
            return Err(SessionError::Config(format!(
                "consistency {} cannot be used for reads",
                config.read_consistency
            )));
        }

        if let Some(raw) = get("protocol_version") {
            let version = parse_value::<u8>("protocol_version", raw)?;
            if !(1..=MAX_PROTOCOL_VERSION).contains(&version) {
                return Err(SessionError::Config(format!(
                    "'protocol_version' must be between 1 and {MAX_PROTOCOL_VERSION}, got {version}"
                )));
            }
            config.protocol_version = version;
        }

        if let Some(raw) = get("connection_timeout") {
            let secs = parse_value::<u64>("connection_timeout", raw)?;
            if secs > 0 {
                config.connect_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(raw) = get("max_parallel") {
            let max = parse_value::<usize>("max_parallel", raw)?;
            if max > MAX_PARALLEL_LIMIT {
                return Err(SessionError::Config(format!(
                    "'max_parallel' must be at most {MAX_PARALLEL_LIMIT}, got {max}"
                )));
            }
            if max > 0 {
                config.max_parallel = max;
            }
        }

        config.credentials = match (get("username"), get("password")) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }),
            (None, None) => None,
            _ => {
                return Err(SessionError::Config(
                    "'username' and 'password' must be set together".into(),
                ))
            }
        };

        let tls_enabled = match get("tls") {
            Some(raw) => parse_bool("tls", raw)?,
            None => false,
        };
        if tls_enabled {
            let mut tls = TlsConfig {
                pem_bundle_file: get("pem_bundle_file").map(PathBuf::from),
                pem_json_file: get("pem_json_file").map(PathBuf::from),
                ..Default::default()
            };
            if let Some(raw) = get("tls_skip_verify") {
                tls.skip_verify = parse_bool("tls_skip_verify", raw)?;
            }
            if let Some(raw) = get("tls_min_version") {
                tls.min_version = raw.parse()?;
            }
            config.tls = Some(tls);
        }

        Ok(config)
    }

    /// Keyspace and table names used to render statements.
    pub fn schema(&self) -> Schema {
        Schema {
            keyspace: self.keyspace.clone(),
            entries_table: self.table.clone(),
            buckets_table: self.bucket_table.clone(),
        }
    }

    /// Contact points joined for logs and error messages.
    pub fn hosts_display(&self) -> String {
        self.hosts.join(",")
    }
}

/// Username/password authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TLS settings. Material is loaded from disk when the session is opened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// PEM file holding the client certificate, its key and any CA chain.
    pub pem_bundle_file: Option<PathBuf>,
    /// JSON file with `certificate`, `private_key` and `ca_chain` PEM fields.
    pub pem_json_file: Option<PathBuf>,
    pub skip_verify: bool,
    pub min_version: TlsVersion,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsVersion {
    Tls10,
    Tls11,
    #[default]
    Tls12,
    Tls13,
}

impl FromStr for TlsVersion {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls10" => Ok(TlsVersion::Tls10),
            "tls11" => Ok(TlsVersion::Tls11),
            "tls12" => Ok(TlsVersion::Tls12),
            "tls13" => Ok(TlsVersion::Tls13),
            other => Err(SessionError::Config(format!(
                "'tls_min_version' must be one of tls10, tls11, tls12, tls13, got {other:?}"
            ))),
        }
    }
}

fn parse_hosts(raw: &str, default_port: u16) -> SessionResult<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(|host| match host.rsplit_once(':') {
            Some((name, port)) if !name.is_empty() && !name.ends_with(':') => {
                let port = parse_value::<u16>("hosts", port)?;
                Ok(format!("{name}:{port}"))
            }
            Some(_) => Err(SessionError::Config(format!("invalid host {host:?}"))),
            None => Ok(format!("{host}:{default_port}")),
        })
        .collect()
}

fn parse_identifier(key: &str, value: &str) -> SessionResult<String> {
    let valid = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(SessionError::Config(format!(
            "'{key}' must be an identifier of letters, digits and '_', got {value:?}"
        )));
    }
    Ok(value.to_string())
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> SessionResult<T>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| SessionError::Config(format!("invalid '{key}' value {value:?}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> SessionResult<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(SessionError::Config(format!(
            "invalid '{key}' value {value:?}: expected a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let c = ClusterConfig::from_map(&map(&[("hosts", "10.0.0.1")])).unwrap();
        assert_eq!(c.hosts, vec!["10.0.0.1:9042"]);
        assert_eq!(c.keyspace, "vault");
        assert_eq!(c.table, "entries");
        assert_eq!(c.bucket_table, "buckets");
        assert_eq!(c.read_consistency, Consistency::LocalQuorum);
        assert_eq!(c.write_consistency, Consistency::LocalQuorum);
        assert_eq!(c.protocol_version, 2);
        assert_eq!(c.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(c.max_parallel, 128);
        assert!(c.credentials.is_none());
        assert!(c.tls.is_none());
    }

    #[test]
    fn missing_or_blank_hosts_fail() {
        assert!(matches!(
            ClusterConfig::from_map(&HashMap::new()),
            Err(SessionError::Config(_))
        ));
        assert!(ClusterConfig::from_map(&map(&[("hosts", "")])).is_err());
        assert!(ClusterConfig::from_map(&map(&[("hosts", " , ")])).is_err());
    }

    #[test]
    fn hosts_with_ports() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "a.example:9142, b.example"),
            ("port", "9043"),
        ]))
        .unwrap();
        assert_eq!(c.hosts, vec!["a.example:9142", "b.example:9043"]);
        assert_eq!(c.hosts_display(), "a.example:9142,b.example:9043");
    }

    #[test]
    fn invalid_host_port() {
        assert!(ClusterConfig::from_map(&map(&[("hosts", "a:notaport")])).is_err());
        assert!(ClusterConfig::from_map(&map(&[("hosts", ":9042")])).is_err());
    }

    #[test]
    fn protocol_version_range() {
        let c = ClusterConfig::from_map(&map(&[("hosts", "h"), ("protocol_version", "3")]))
            .unwrap();
        assert_eq!(c.protocol_version, 3);
        assert!(
            ClusterConfig::from_map(&map(&[("hosts", "h"), ("protocol_version", "0")])).is_err()
        );
        assert!(
            ClusterConfig::from_map(&map(&[("hosts", "h"), ("protocol_version", "9")])).is_err()
        );
        assert!(
            ClusterConfig::from_map(&map(&[("hosts", "h"), ("protocol_version", "x")])).is_err()
        );
    }

    #[test]
    fn consistency_overrides() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("consistency", "QUORUM"),
            ("write_consistency", "all"),
        ]))
        .unwrap();
        assert_eq!(c.read_consistency, Consistency::Quorum);
        assert_eq!(c.write_consistency, Consistency::All);
    }

    #[test]
    fn any_is_rejected_for_reads() {
        let err = ClusterConfig::from_map(&map(&[("hosts", "h"), ("consistency", "ANY")]))
            .unwrap_err();
        assert!(err.to_string().contains("cannot be used for reads"));

        let c = ClusterConfig::from_map(&map(&[("hosts", "h"), ("write_consistency", "ANY")]))
            .unwrap();
        assert_eq!(c.write_consistency, Consistency::Any);
    }

    #[test]
    fn unknown_consistency() {
        let err = ClusterConfig::from_map(&map(&[("hosts", "h"), ("consistency", "MOST")]))
            .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(err.to_string().contains("MOST"));
    }

    #[test]
    fn table_names_are_identifiers() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("keyspace", "secrets"),
            ("table", "kv_entries"),
            ("bucket_table", "kv_buckets"),
        ]))
        .unwrap();
        let schema = c.schema();
        assert_eq!(schema.keyspace, "secrets");
        assert_eq!(schema.entries_table, "kv_entries");
        assert_eq!(schema.buckets_table, "kv_buckets");

        assert!(ClusterConfig::from_map(&map(&[("hosts", "h"), ("table", "drop table;")])).is_err());
        assert!(ClusterConfig::from_map(&map(&[("hosts", "h"), ("keyspace", "1ks")])).is_err());
        assert!(
            ClusterConfig::from_map(&map(&[("hosts", "h"), ("bucket_table", "entries")])).is_err()
        );
    }

    #[test]
    fn timeouts_and_parallelism() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("connection_timeout", "3"),
            ("max_parallel", "4"),
        ]))
        .unwrap();
        assert_eq!(c.connect_timeout, Duration::from_secs(3));
        assert_eq!(c.max_parallel, 4);

        // Zero means "use the default".
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("connection_timeout", "0"),
            ("max_parallel", "0"),
        ]))
        .unwrap();
        assert_eq!(c.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(c.max_parallel, DEFAULT_MAX_PARALLEL);
    }

    #[test]
    fn max_parallel_out_of_range() {
        let too_many = usize::MAX.to_string();
        let err = ClusterConfig::from_map(&map(&[("hosts", "h"), ("max_parallel", too_many.as_str())]))
            .unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(err.to_string().contains("max_parallel"));

        let at_limit = MAX_PARALLEL_LIMIT.to_string();
        let c = ClusterConfig::from_map(&map(&[("hosts", "h"), ("max_parallel", at_limit.as_str())]))
            .unwrap();
        assert_eq!(c.max_parallel, MAX_PARALLEL_LIMIT);
    }

    #[test]
    fn credentials_must_be_paired() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("username", "vault"),
            ("password", "s3cret"),
        ]))
        .unwrap();
        let creds = c.credentials.unwrap();
        assert_eq!(creds.username, "vault");
        assert!(!format!("{creds:?}").contains("s3cret"));

        assert!(ClusterConfig::from_map(&map(&[("hosts", "h"), ("username", "vault")])).is_err());
    }

    #[test]
    fn tls_settings() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("tls", "1"),
            ("pem_bundle_file", "/etc/hcs/bundle.pem"),
            ("tls_skip_verify", "true"),
            ("tls_min_version", "tls13"),
        ]))
        .unwrap();
        let tls = c.tls.unwrap();
        assert_eq!(tls.pem_bundle_file, Some(PathBuf::from("/etc/hcs/bundle.pem")));
        assert!(tls.skip_verify);
        assert_eq!(tls.min_version, TlsVersion::Tls13);
    }

    #[test]
    fn tls_fields_ignored_when_disabled() {
        let c = ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("tls", "0"),
            ("pem_bundle_file", "/nope"),
        ]))
        .unwrap();
        assert!(c.tls.is_none());
    }

    #[test]
    fn invalid_tls_values() {
        assert!(ClusterConfig::from_map(&map(&[("hosts", "h"), ("tls", "yes")])).is_err());
        assert!(ClusterConfig::from_map(&map(&[
            ("hosts", "h"),
            ("tls", "1"),
            ("tls_min_version", "ssl3"),
        ]))
        .is_err());
    }

    #[test]
    fn password_not_serialized() {
        let creds = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("\"p\""));
    }
}
