//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::error::{CatalogError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.driver.trim().is_empty() {
        return Err(CatalogError::Config("driver is required".into()));
    }
    validate_connection(&config.connection)
}

/// Validate a connection descriptor on its own.
pub fn validate_connection(conn: &ConnectionConfig) -> Result<()> {
    if conn.database.is_empty() {
        return Err(CatalogError::Config("connection.database is required".into()));
    }
    if !is_database_path(&conn.database) {
        return Err(CatalogError::Config(format!(
            "connection.database must look like projects/<p>/instances/<i>/databases/<d>, got '{}'",
            conn.database
        )));
    }
    if !(conn.endpoint.starts_with("https://") || conn.endpoint.starts_with("http://")) {
        return Err(CatalogError::Config(format!(
            "connection.endpoint must be an http(s) URL, got '{}'",
            conn.endpoint
        )));
    }
    if conn.request_timeout_secs == 0 {
        return Err(CatalogError::Config(
            "connection.request_timeout_secs must be at least 1".into(),
        ));
    }
    Ok(())
}

fn is_database_path(path: &str) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    parts.len() == 6
        && parts[0] == "projects"
        && parts[2] == "instances"
        && parts[4] == "databases"
        && [parts[1], parts[3], parts[5]].iter().all(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            driver: "spanner".to_string(),
            connection: ConnectionConfig::new("projects/p1/instances/i1/databases/music"),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_database() {
        let mut config = valid_config();
        config.connection.database = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_malformed_database_path() {
        let mut config = valid_config();
        config.connection.database = "projects/p1/databases/music".to_string();
        assert!(validate(&config).is_err());

        config.connection.database = "projects//instances/i1/databases/music".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_driver() {
        let mut config = valid_config();
        config.driver = " ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_endpoint() {
        let mut config = valid_config();
        config.connection.endpoint = "spanner.googleapis.com".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = valid_config();
        config.connection.request_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_config_debug_redacts_token() {
        let mut config = valid_config();
        config.connection.access_token = Some("ya29.super_secret_token".to_string());
        let debug_output = format!("{:?}", config.connection);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_token"),
            "Debug output should not contain actual token value"
        );
    }
}
