use secrecy::{ExposeSecret, SecretString};

use crate::config::ConnectionSettings;

pub const REDACTED: &str = "[REDACTED]";

/// Render an optional password for logs, respecting the show_secrets flag.
pub fn redact_password(secret: Option<&SecretString>, show_secrets: bool) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if show_secrets => s.expose_secret().to_string(),
        Some(_) => REDACTED.to_string(),
    }
}

/// One-line description of connection settings, safe to log.
pub fn connection_summary(settings: &ConnectionSettings, show_secrets: bool) -> String {
    format!(
        "type={} port={} user={} password={} database={} ssl_mode={:?}",
        settings.kind.as_str(),
        settings.port,
        settings.user,
        redact_password(settings.password.as_ref(), show_secrets),
        settings.database,
        settings.ssl_mode,
    )
}
