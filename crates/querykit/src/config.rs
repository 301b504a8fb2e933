//! Database connection settings.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::fmt;

/// Environment variable read by [`DatabaseConfig::from_env`].
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
}

impl Backend {
    pub fn dialect(self) -> Dialect {
        match self {
            Backend::Postgres => Dialect::Postgres,
        }
    }
}

/// Connection settings for one repository.
///
/// Either set a full `connection_string`, or the individual `server`,
/// `db_name`, `user` and `password` parts. A manual connection string always
/// wins.
///
/// Can be deserialized from a `[database]`-style TOML table:
///
/// ```toml
/// backend = "postgres"
/// server = "localhost"
/// db_name = "shop"
/// user = "app"
/// password = "secret"
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub connection_string: Option<String>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub db_name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub application_name: Option<String>,
}

impl DatabaseConfig {
    /// Settings for `db_name` on `server`.
    pub fn new(server: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            db_name: Some(db_name.into()),
            ..Self::default()
        }
    }

    /// Settings from a ready-made URL or key/value connection string.
    pub fn from_connection_string(conn: impl Into<String>) -> Self {
        Self {
            connection_string: Some(conn.into()),
            ..Self::default()
        }
    }

    /// Settings from the `DATABASE_URL` environment variable.
    pub fn from_env() -> OrmResult<Self> {
        std::env::var(DATABASE_URL_ENV)
            .map(Self::from_connection_string)
            .map_err(|_| OrmError::configuration(format!("{DATABASE_URL_ENV} is not set")))
    }

    /// Settings from a TOML document.
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        toml::from_str(raw)
            .map_err(|e| OrmError::configuration(format!("invalid database config: {e}")))
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// Connection string for tokio-postgres.
    ///
    /// Returns the manual string when set, otherwise a key/value string built
    /// from the parts. `server` and `db_name` are required in that case.
    pub fn connection_string(&self) -> OrmResult<String> {
        if let Some(conn) = self.connection_string.as_deref().filter(|c| !c.trim().is_empty()) {
            return Ok(conn.to_string());
        }

        let server = required(&self.server, "server")?;
        let db_name = required(&self.db_name, "db_name")?;

        let mut parts = vec![
            format!("host={}", quote(server)),
            format!("dbname={}", quote(db_name)),
        ];
        if let Some(port) = self.port {
            parts.push(format!("port={port}"));
        }
        if let Some(user) = &self.user {
            parts.push(format!("user={}", quote(user)));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={}", quote(password)));
        }
        if let Some(name) = &self.application_name {
            parts.push(format!("application_name={}", quote(name)));
        }
        Ok(parts.join(" "))
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> OrmResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            OrmError::configuration(format!(
                "database config needs `{key}` when no connection_string is set"
            ))
        })
}

/// Quote a key/value connection string value when needed.
fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if plain {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("server", &self.server)
            .field("port", &self.port)
            .field("db_name", &self.db_name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("application_name", &self.application_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_key_value_string() {
        let config = DatabaseConfig::new("localhost", "shop")
            .port(5433)
            .user("app")
            .password("s3cret pass");
        assert_eq!(
            config.connection_string().unwrap(),
            "host=localhost dbname=shop port=5433 user=app password='s3cret pass'"
        );
    }

    #[test]
    fn manual_string_wins() {
        let mut config = DatabaseConfig::from_connection_string("postgres://u@h/db");
        config.server = Some("ignored".into());
        assert_eq!(config.connection_string().unwrap(), "postgres://u@h/db");
    }

    #[test]
    fn missing_parts_are_configuration_errors() {
        let err = DatabaseConfig::default().connection_string().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("server"));

        let err = DatabaseConfig {
            server: Some("h".into()),
            ..Default::default()
        }
        .connection_string()
        .unwrap_err();
        assert!(err.to_string().contains("db_name"));
    }

    #[test]
    fn parses_toml() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            backend = "postgres"
            server = "db"
            db_name = "shop"
            user = "app"
            "#,
        )
        .unwrap();
        assert_eq!(config.dialect(), Dialect::Postgres);
        assert_eq!(
            config.connection_string().unwrap(),
            "host=db dbname=shop user=app"
        );
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = DatabaseConfig::from_toml_str("backend = \"oracle\"").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = DatabaseConfig::new("h", "d").password("hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(""), "''");
    }
}
