//! Cloud Spanner REST session.
//!
//! Opens one Spanner session per connection (`POST v1/{database}/sessions`),
//! runs every statement as a single-use, strong, read-only query through
//! `executeStreamingSql`, and deletes the session on close. Works against
//! the production endpoint with a bearer token or against the emulator
//! without auth.
//!
//! Results are decoded while the response body streams in, so a cursor
//! holds at most one HTTP chunk plus the rows not yet taken.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value as WireValue};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::context::Context;
use crate::core::statement::{ResultRow, Statement};
use crate::core::traits::{RowCursor, Session, SessionFactory};
use crate::error::{CatalogError, Result};

use super::partial::PartialResultDecoder;

/// Environment variable the Spanner tooling uses to point at the emulator.
pub const EMULATOR_HOST_ENV: &str = "SPANNER_EMULATOR_HOST";

/// Where requests go and how they authenticate.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct RestTarget {
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for RestTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestTarget")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RestTarget {
    /// Resolve endpoint and credentials.
    ///
    /// An emulator host (from config, else from `emulator_env`) wins and
    /// disables auth. Otherwise the token comes from the config or from the
    /// variable named by `access_token_env`, looked up through `env`.
    pub(crate) fn resolve<F>(
        config: &ConnectionConfig,
        emulator_env: Option<String>,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let emulator = config
            .emulator_host
            .clone()
            .or(emulator_env)
            .filter(|h| !h.trim().is_empty());
        if let Some(host) = emulator {
            let host = host.trim().trim_end_matches('/');
            let base_url = if host.starts_with("http://") || host.starts_with("https://") {
                host.to_string()
            } else {
                format!("http://{}", host)
            };
            return Ok(Self {
                base_url,
                token: None,
            });
        }

        let token = config
            .access_token
            .clone()
            .or_else(|| env(&config.access_token_env))
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CatalogError::Connection(format!(
                    "no access token: set connection.access_token or ${}",
                    config.access_token_env
                ))
            })?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            token: Some(token),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Request body for `executeStreamingSql`.
pub(crate) fn execute_sql_body(stmt: &Statement) -> WireValue {
    let mut body = json!({
        "sql": stmt.sql,
        "transaction": { "singleUse": { "readOnly": { "strong": true } } },
    });
    if !stmt.params.is_empty() {
        let mut params = Map::new();
        let mut types = Map::new();
        for (name, param) in &stmt.params {
            params.insert(name.clone(), param.to_wire());
            types.insert(name.clone(), json!({ "code": param.type_code() }));
        }
        body["params"] = WireValue::Object(params);
        body["paramTypes"] = WireValue::Object(types);
    }
    body
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    name: String,
}

/// Pull the human-readable message out of a Google API error body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<WireValue>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("HTTP {}: {}", status.as_u16(), message)
}

/// Spanner session over the REST API.
pub struct RestSession {
    client: reqwest::Client,
    target: RestTarget,
    session_name: String,
    timeout: Duration,
    closed: AtomicBool,
}

impl RestSession {
    /// Create a Spanner session for `config.database`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let target = RestTarget::resolve(config, std::env::var(EMULATOR_HOST_ENV).ok(), |name| {
            std::env::var(name).ok()
        })?;

        // Per-request timeouts; streamed reads are bounded per chunk instead.
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Connection(format!("building HTTP client: {}", e)))?;

        let url = target.url(&format!("{}/sessions", config.database));
        let resp = target
            .authorize(client.post(&url))
            .timeout(timeout)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| CatalogError::Connection(format!("creating session: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Connection(format!(
                "creating session: {}",
                error_message(status, &body)
            )));
        }
        let created: SessionResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Connection(format!("reading session response: {}", e)))?;

        info!("Connected to Spanner: {} ({})", config.database, target.base_url);
        Ok(Self {
            client,
            target,
            session_name: created.name,
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Server-side session name.
    pub fn session_name(&self) -> &str {
        &self.session_name
    }
}

#[async_trait]
impl Session for RestSession {
    async fn query(&self, stmt: Statement) -> Result<Box<dyn RowCursor>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CatalogError::Connection("session is closed".into()));
        }
        let context = stmt.summary();
        let url = self
            .target
            .url(&format!("{}:executeStreamingSql", self.session_name));
        debug!("executeStreamingSql: {}", context);

        let request = self
            .target
            .authorize(self.client.post(&url))
            .json(&execute_sql_body(&stmt))
            .send();
        let resp = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| CatalogError::query("request timed out", context.clone()))?
            .map_err(|e| CatalogError::query(e, context.clone()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::query(error_message(status, &body), context));
        }

        Ok(Box::new(StreamingCursor {
            response: Some(resp),
            decoder: PartialResultDecoder::new(context.clone()),
            fields: None,
            timeout: self.timeout,
            context,
        }))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let url = self.target.url(&self.session_name);
        let request = self.target.authorize(self.client.delete(&url)).timeout(self.timeout);
        match request.send().await {
            Ok(resp) if !resp.status().is_success() => {
                debug!(
                    "Deleting session {} returned HTTP {}",
                    self.session_name,
                    resp.status().as_u16()
                );
            }
            Err(e) => debug!("Deleting session {} failed: {}", self.session_name, e),
            Ok(_) => debug!("Deleted session {}", self.session_name),
        }
    }

    fn supports_concurrent_queries(&self) -> bool {
        // One Spanner session runs one request at a time.
        false
    }
}

/// Cursor over a streamed response body.
struct StreamingCursor {
    /// `None` once the body is exhausted or the cursor is stopped.
    response: Option<reqwest::Response>,
    decoder: PartialResultDecoder,
    fields: Option<Arc<[String]>>,
    timeout: Duration,
    context: String,
}

#[async_trait]
impl RowCursor for StreamingCursor {
    async fn next(&mut self) -> Result<Option<ResultRow>> {
        loop {
            if let Some(cells) = self.decoder.next_row()? {
                if self.fields.is_none() {
                    self.fields = self.decoder.fields();
                }
                let fields = self.fields.clone().ok_or_else(|| {
                    CatalogError::query("row without metadata", self.context.clone())
                })?;
                return ResultRow::new(fields, cells).map(Some);
            }

            let Some(response) = self.response.as_mut() else {
                return Ok(None);
            };
            let chunk = tokio::time::timeout(self.timeout, response.chunk())
                .await
                .map_err(|_| CatalogError::query("result stream stalled", self.context.clone()))?
                .map_err(|e| CatalogError::query(e, self.context.clone()))?;

            match chunk {
                Some(bytes) => self.decoder.extend(&bytes),
                None => {
                    self.response = None;
                    self.decoder.finish()?;
                }
            }
        }
    }

    async fn stop(&mut self) {
        // Dropping the response aborts the body transfer.
        self.response = None;
        self.decoder = PartialResultDecoder::new(self.context.clone());
    }
}

/// Session factory backed by [`RestSession`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RestSessionFactory;

#[async_trait]
impl SessionFactory for RestSessionFactory {
    async fn create(&self, ctx: &Context, config: &ConnectionConfig) -> Result<Arc<dyn Session>> {
        let session = ctx.run(RestSession::connect(config)).await?;
        Ok(Arc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::statement::Param;

    fn config() -> ConnectionConfig {
        ConnectionConfig::new("projects/p/instances/i/databases/d")
    }

    #[test]
    fn test_resolve_emulator_from_env() {
        let target =
            RestTarget::resolve(&config(), Some("localhost:9020".into()), |_| None).unwrap();
        assert_eq!(target.base_url, "http://localhost:9020");
        assert!(target.token.is_none());
        assert_eq!(
            target.url("projects/p/instances/i/databases/d/sessions"),
            "http://localhost:9020/v1/projects/p/instances/i/databases/d/sessions"
        );
    }

    #[test]
    fn test_resolve_config_emulator_wins_over_env() {
        let mut cfg = config();
        cfg.emulator_host = Some("http://emu:9020/".into());
        let target = RestTarget::resolve(&cfg, Some("other:1".into()), |_| None).unwrap();
        assert_eq!(target.base_url, "http://emu:9020");
    }

    #[test]
    fn test_resolve_token_from_env_var() {
        let target = RestTarget::resolve(&config(), None, |name| {
            (name == "SPANNER_ACCESS_TOKEN").then(|| "tok".to_string())
        })
        .unwrap();
        assert_eq!(target.base_url, "https://spanner.googleapis.com");
        assert_eq!(target.token.as_deref(), Some("tok"));
        assert!(!format!("{:?}", target).contains("tok\""));
    }

    #[test]
    fn test_resolve_without_token_fails() {
        let res = RestTarget::resolve(&config(), None, |_| None);
        assert!(matches!(res, Err(CatalogError::Connection(_))));
    }

    #[test]
    fn test_execute_sql_body_binds_params() {
        let stmt = Statement::new("SELECT 1 FROM t WHERE TABLE_NAME = @tableName")
            .bind("tableName", Param::String("Sing'ers".into()));
        let body = execute_sql_body(&stmt);
        assert_eq!(body["params"]["tableName"], json!("Sing'ers"));
        assert_eq!(body["paramTypes"]["tableName"]["code"], json!("STRING"));
        assert_eq!(
            body["transaction"]["singleUse"]["readOnly"]["strong"],
            json!(true)
        );
        assert!(!body["sql"].as_str().unwrap().contains("Sing'ers"));
    }

    #[test]
    fn test_execute_sql_body_without_params() {
        let body = execute_sql_body(&Statement::new("SELECT 1"));
        assert!(body.get("params").is_none());
        assert!(body.get("paramTypes").is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":404,"message":"Database not found","status":"NOT_FOUND"}}"#;
        assert_eq!(
            error_message(reqwest::StatusCode::NOT_FOUND, body),
            "HTTP 404: Database not found"
        );
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down\n"),
            "HTTP 502: upstream down"
        );
    }
}
