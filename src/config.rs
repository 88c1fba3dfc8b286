use crate::error::CollectorError;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_OUTPUT_FILE: &str = "query_results";

/// One run of the collector: a query, the hosts to run it on, and where the merged rows go.
#[derive(Debug, Clone)]
pub struct Job {
    pub query: String,
    pub targets: Vec<String>,
    pub workers: usize,
    pub output: OutputOptions,
}

/// Destination and encoding of the merged result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    pub directory: PathBuf,
    pub file_name: String,
    pub append_timestamp: bool,
    pub delimiter: u8,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            file_name: DEFAULT_OUTPUT_FILE.to_string(),
            append_timestamp: true,
            delimiter: b',',
        }
    }
}

impl Default for Job {
    /// The job used when the workload file cannot be loaded.
    fn default() -> Self {
        Self {
            query: String::new(),
            targets: Vec::new(),
            workers: 1,
            output: OutputOptions::default(),
        }
    }
}

impl Job {
    /// Fail on a job that has nothing to run.
    pub fn validate(&self) -> Result<(), CollectorError> {
        if self.query.trim().is_empty() {
            return Err(CollectorError::Config {
                message: "SQL query is required in the workload file".to_string(),
            });
        }
        if self.targets.is_empty() {
            return Err(CollectorError::Config {
                message: "at least one target host is required in the workload file".to_string(),
            });
        }
        Ok(())
    }
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    MySql,
    Postgres,
}

impl DatabaseKind {
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseKind::MySql => 3306,
            DatabaseKind::Postgres => 5432,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseKind::MySql => "mysql",
            DatabaseKind::Postgres => "postgres",
        }
    }
}

/// TLS negotiation for PostgreSQL targets.
///
/// Connections are made without a TLS connector, so `prefer` falls back to plaintext and
/// `require` is rejected when the settings are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Prefer,
}

/// Everything needed to open a connection, except the host, which comes from each target.
#[derive(Debug)]
pub struct ConnectionSettings {
    pub kind: DatabaseKind,
    pub port: u16,
    pub user: String,
    pub password: Option<SecretString>,
    pub database: String,
    pub ssl_mode: SslMode,
}

// --- Workload file structs ---

#[derive(Debug, Deserialize, Default)]
struct WorkloadFile {
    workers: Option<i64>,
    #[serde(default)]
    targets: Vec<String>,
    query: Option<String>,
    outdir: Option<String>,
    outfile: Option<String>,
    delimiter: Option<char>,
    append_timestamp: Option<bool>,
}

/// Treat empty strings as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Read an env var, treating unset and empty the same.
pub fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Clamp a configured worker count to at least one.
pub fn coerce_workers(requested: Option<i64>) -> usize {
    match requested {
        None => 1,
        Some(n) if n <= 0 => {
            warn!(workers = n, "invalid number of workers, defaulting to 1");
            1
        }
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
    }
}

/// Load a workload file. `.toml` files are parsed as TOML, everything else as JSON.
pub fn load_job(path: &Path) -> Result<Job, CollectorError> {
    let load_err = |message: String| CollectorError::ConfigLoad {
        path: path.display().to_string(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let file: WorkloadFile = if is_toml {
        toml::from_str(&content).map_err(|e| load_err(e.to_string()))?
    } else {
        serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?
    };

    job_from_file(file).map_err(|e| match e {
        CollectorError::Config { message } => load_err(message),
        other => other,
    })
}

/// Load a workload file, substituting the default job when it cannot be read or parsed.
pub fn load_job_or_default(path: &Path) -> Job {
    match load_job(path) {
        Ok(job) => job,
        Err(err) => {
            warn!(error = %err, "failed to load workload file, using defaults");
            Job::default()
        }
    }
}

fn job_from_file(file: WorkloadFile) -> Result<Job, CollectorError> {
    let delimiter = match file.delimiter {
        None => b',',
        Some(c) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => c as u8,
        Some(c) => {
            return Err(CollectorError::Config {
                message: format!("unsupported delimiter {c:?}: must be a single ASCII character"),
            });
        }
    };

    let defaults = OutputOptions::default();
    let output = OutputOptions {
        directory: non_empty(file.outdir.as_deref())
            .map(PathBuf::from)
            .unwrap_or(defaults.directory),
        file_name: non_empty(file.outfile.as_deref())
            .map(str::to_string)
            .unwrap_or(defaults.file_name),
        append_timestamp: file.append_timestamp.unwrap_or(true),
        delimiter,
    };

    Ok(Job {
        query: file.query.unwrap_or_default(),
        targets: file.targets,
        workers: coerce_workers(file.workers),
        output,
    })
}

impl ConnectionSettings {
    /// Build settings from the process environment (after `.env` has been applied).
    pub fn from_env() -> Result<Self, CollectorError> {
        Self::from_vars(env_non_empty)
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self, CollectorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let kind = match get("DB_TYPE").as_deref() {
            None | Some("mysql") => DatabaseKind::MySql,
            Some("postgres") | Some("postgresql") => DatabaseKind::Postgres,
            Some(other) => {
                return Err(CollectorError::Config {
                    message: format!(
                        "unsupported database type: '{other}' (expected 'mysql' or 'postgres')"
                    ),
                });
            }
        };

        let port = match get("DB_PORT") {
            None => kind.default_port(),
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|e| {
                warn!(value = %raw, error = %e, "invalid DB_PORT, using default");
                kind.default_port()
            }),
        };

        let database = get("DB_NAME").ok_or_else(|| CollectorError::Config {
            message: "database name is required, set DB_NAME".to_string(),
        })?;

        let ssl_mode = match get("DB_SSL_MODE").as_deref() {
            None | Some("disable") => SslMode::Disable,
            Some("prefer") => SslMode::Prefer,
            Some("require") => {
                return Err(CollectorError::Config {
                    message: "DB_SSL_MODE=require is not supported: connections are made \
                              without TLS (use disable or prefer)"
                        .to_string(),
                });
            }
            Some(other) => {
                return Err(CollectorError::Config {
                    message: format!(
                        "unsupported DB_SSL_MODE: '{other}' (expected disable or prefer)"
                    ),
                });
            }
        };

        Ok(Self {
            kind,
            port,
            user: get("DB_USER").unwrap_or_else(|| "root".to_string()),
            password: get("DB_PASSWORD").map(SecretString::from),
            database,
            ssl_mode,
        })
    }
}
