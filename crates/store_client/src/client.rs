//! Store HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Every request carries
//! the project key as `apikey` and a bearer token: the session token when
//! logged in as a user, else the project key itself.

use std::time::Duration;

use serde_json::Value;

use crate::auth::{load_auth, AuthCredentials};
use crate::error::StoreError;
use crate::query::Query;

/// Hosted store client (blocking).
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    token: Option<String>,
}

impl StoreClient {
    /// Create a new client using saved auth credentials.
    pub fn from_saved_auth() -> Result<Self, StoreError> {
        let creds = load_auth().ok_or(StoreError::NotAuthenticated)?;
        Self::new(creds)
    }

    /// Create a new client with explicit credentials.
    pub fn new(creds: AuthCredentials) -> Result<Self, StoreError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("bestie/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: creds.api_base.trim_end_matches('/').to_string(),
            api_key: creds.api_key,
            token: creds.token.filter(|t| !t.is_empty()),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Run a record query. The store answers with a JSON array of rows.
    pub fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/rest/v1/{}", self.api_base, query.table_name());
        log::debug!("select {} {:?}", query.table_name(), query.params());

        let resp = self.get(&url, &query.params())?;
        let json: Value = resp.json().map_err(|e| StoreError::Parse(e.to_string()))?;
        match json {
            Value::Array(rows) => Ok(rows),
            other => Err(StoreError::Parse(format!(
                "expected an array of rows from {}, got {}",
                query.table_name(),
                json_kind(&other)
            ))),
        }
    }

    /// First matching row, if any.
    pub fn select_one(&self, query: &Query) -> Result<Option<Value>, StoreError> {
        let rows = self.select(&query.clone().limit(1))?;
        Ok(rows.into_iter().next())
    }

    /// Call a remote procedure. An empty response body yields `null`.
    pub fn invoke(&self, function: &str, body: &Value) -> Result<Value, StoreError> {
        let url = format!("{}/functions/v1/{}", self.api_base, function);
        log::debug!("invoke {function}");

        let resp = self.post_json(&url, body)?;
        let text = resp.text().map_err(|e| StoreError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Parse(format!("{function} returned invalid JSON: {e}")))
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        let bearer = self.token.as_deref().unwrap_or(&self.api_key);
        request.header("apikey", &self.api_key).bearer_auth(bearer)
    }

    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::blocking::Response, StoreError> {
        let response = self
            .authorize(self.http.get(url))
            .query(params)
            .send()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        check_status(response)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<reqwest::blocking::Response, StoreError> {
        let response = self
            .authorize(self.http.post(url))
            .json(body)
            .send()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        check_status(response)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, StoreError> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = error_message(&body);
    match status {
        400 | 422 => Err(StoreError::Validation(message)),
        401 | 403 => Err(StoreError::Unauthorized(message)),
        _ => Err(StoreError::Http(status, message)),
    }
}

/// `message`, `error` or `msg` from a JSON error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, token: Option<&str>) -> StoreClient {
        let creds = AuthCredentials {
            token: token.map(String::from),
            ..AuthCredentials::new(format!("{}/", server.base_url()), "anon_key".into())
        };
        StoreClient::new(creds).unwrap()
    }

    // ── Test: select sends key headers and filters ──────────────────

    #[test]
    fn test_select_sends_headers_and_filters() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/sponsorships")
                .header("apikey", "anon_key")
                .header("Authorization", "Bearer user_token")
                .query_param("select", "*")
                .query_param("sponsor_id", "eq.u_1")
                .query_param("order", "created_at.desc");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([{ "id": "sp_1" }, { "id": "sp_2" }]));
        });

        let rows = client(&server, Some("user_token"))
            .select(
                &Query::table("sponsorships")
                    .eq("sponsor_id", "u_1")
                    .order("created_at", false),
            )
            .unwrap();

        mock.assert();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], "sp_2");
    }

    #[test]
    fn test_anonymous_bearer_is_project_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/featured_besties")
                .header("Authorization", "Bearer anon_key")
                .query_param("limit", "1");
            then.status(200).json_body(json!([{ "id": "f_1" }]));
        });

        let row = client(&server, None)
            .select_one(&Query::table("featured_besties"))
            .unwrap();

        mock.assert();
        assert_eq!(row.unwrap()["id"], "f_1");
    }

    #[test]
    fn test_select_one_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/sponsorships");
            then.status(200).json_body(json!([]));
        });

        let row = client(&server, None)
            .select_one(&Query::table("sponsorships").eq("id", "missing"))
            .unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn test_non_array_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/sponsorships");
            then.status(200).json_body(json!({ "id": "sp_1" }));
        });

        let err = client(&server, None)
            .select(&Query::table("sponsorships"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Parse(ref m) if m.contains("an object")), "{err}");
    }

    // ── Test: status mapping ────────────────────────────────────────

    #[test]
    fn test_bad_filter_is_validation() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/sponsorships");
            then.status(400).json_body(json!({
                "code": "42703",
                "message": "column sponsorships.nope does not exist"
            }));
        });

        let err = client(&server, None)
            .select(&Query::table("sponsorships").eq("nope", "1"))
            .unwrap_err();
        match err {
            StoreError::Validation(msg) => assert!(msg.contains("nope does not exist")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/functions/v1/reveal-sticker");
            then.status(401).json_body(json!({ "msg": "JWT expired" }));
        });

        let err = client(&server, Some("old"))
            .invoke("reveal-sticker", &json!({}))
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "unauthorized: JWT expired");
    }

    #[test]
    fn test_server_error_keeps_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/functions/v1/generate-receipt");
            then.status(503).body("upstream unavailable");
        });

        let err = client(&server, None)
            .invoke("generate-receipt", &json!({ "sponsorship_id": "sp_1" }))
            .unwrap_err();
        assert!(matches!(err, StoreError::Http(503, ref m) if m == "upstream unavailable"));
    }

    // ── Test: remote procedures ─────────────────────────────────────

    #[test]
    fn test_invoke_posts_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/functions/v1/open-sticker-pack")
                .header("apikey", "anon_key")
                .json_body(json!({ "pack_id": "pk_1" }));
            then.status(200).json_body(json!({ "sticker_id": "s_9", "rarity": "epic" }));
        });

        let result = client(&server, Some("tok"))
            .invoke("open-sticker-pack", &json!({ "pack_id": "pk_1" }))
            .unwrap();

        mock.assert();
        assert_eq!(result["rarity"], "epic");
    }

    #[test]
    fn test_invoke_empty_body_is_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/functions/v1/ping");
            then.status(204);
        });

        let result = client(&server, None).invoke("ping", &Value::Null).unwrap();
        assert!(result.is_null());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"bad"}"#), "bad");
        assert_eq!(error_message(r#"{"error":"nope"}"#), "nope");
        assert_eq!(error_message(r#"{"error":{"code":1}}"#), r#"{"error":{"code":1}}"#);
        assert_eq!(error_message("  plain  "), "plain");
    }
}
