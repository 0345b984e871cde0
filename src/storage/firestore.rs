// src/storage/firestore.rs

//! Firestore-backed seen-appointment store.
//!
//! Talks to the Firestore REST API with a service-account bearer token.
//! The whole state lives in one document; a merge write PATCHes exactly one
//! doctor field via `updateMask.fieldPaths`, so other doctors' histories
//! are never rewritten.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::storage::{SeenAppointments, SeenStore};

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Collection and document holding the seen-appointment mapping.
const DOCUMENT_PATH: &str = "luxmed-sniper/seen-appointments";

/// Relevant fields of a Google service-account key file.
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    project_id: String,
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Firestore document body: field name → typed value.
#[derive(Debug, Default, Deserialize)]
struct Document {
    #[serde(default)]
    fields: BTreeMap<String, serde_json::Value>,
}

/// Seen-appointment store backed by a single Firestore document.
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    bearer: String,
}

impl FirestoreStore {
    /// Authenticate with a service-account key file and open the store.
    pub async fn connect(client: Client, key_path: impl AsRef<Path>) -> Result<Self> {
        let key_path = key_path.as_ref();
        let raw = std::fs::read_to_string(key_path).map_err(|e| {
            AppError::storage(
                "firestore credentials",
                format!("cannot read key file {}: {}", key_path.display(), e),
            )
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            AppError::storage(
                "firestore credentials",
                format!("malformed key file {}: {}", key_path.display(), e),
            )
        })?;

        let bearer = Self::fetch_token(&client, &key).await?;
        Ok(Self {
            client,
            base_url: FIRESTORE_BASE.to_string(),
            project_id: key.project_id,
            bearer,
        })
    }

    /// Exchange a signed service-account assertion for an access token.
    async fn fetch_token(client: &Client, key: &ServiceAccountKey) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            iss: &key.client_email,
            scope: TOKEN_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let signing_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| {
                AppError::storage("firestore credentials", format!("invalid private key: {e}"))
            })?;
        let assertion = jsonwebtoken::encode(&header, &claims, &signing_key).map_err(|e| {
            AppError::storage(
                "firestore credentials",
                format!("cannot sign token request: {e}"),
            )
        })?;

        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let response = client.post(&key.token_uri).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(AppError::storage(
                "firestore token exchange",
                format!("status {}", response.status()),
            ));
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    fn document_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, DOCUMENT_PATH
        )
    }

    #[cfg(test)]
    fn with_token(client: Client, base_url: &str, project_id: &str, bearer: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            project_id: project_id.to_string(),
            bearer: bearer.to_string(),
        }
    }
}

#[async_trait]
impl SeenStore for FirestoreStore {
    async fn load(&self) -> Result<SeenAppointments> {
        let response = self
            .client
            .get(self.document_url())
            .bearer_auth(&self.bearer)
            .send()
            .await?;

        // A missing document means no prior state, not an error.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(SeenAppointments::new());
        }
        if !response.status().is_success() {
            return Err(AppError::storage(
                "firestore read",
                format!("status {}", response.status()),
            ));
        }

        let document: Document = response.json().await?;
        let mut seen = SeenAppointments::new();
        for (doctor_name, value) in &document.fields {
            seen.set_dates(doctor_name, decode_dates(value));
        }
        Ok(seen)
    }

    async fn merge(&self, doctor_name: &str, dates: &[String]) -> Result<()> {
        let body = json!({ "fields": { doctor_name: encode_dates(dates) } });
        let response = self
            .client
            .patch(self.document_url())
            .bearer_auth(&self.bearer)
            .query(&[("updateMask.fieldPaths", quote_field_path(doctor_name))])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::storage(
                "firestore write",
                format!("status {} for {}", response.status(), doctor_name),
            ));
        }
        Ok(())
    }
}

/// Decode a Firestore `arrayValue` of strings; anything else is an empty list.
fn decode_dates(value: &serde_json::Value) -> Vec<String> {
    value
        .pointer("/arrayValue/values")
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.get("stringValue").and_then(|s| s.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Encode a date list as a Firestore `arrayValue` of strings.
fn encode_dates(dates: &[String]) -> serde_json::Value {
    json!({
        "arrayValue": {
            "values": dates.iter().map(|d| json!({ "stringValue": d })).collect::<Vec<_>>()
        }
    })
}

/// Quote a field path segment for `updateMask.fieldPaths`.
///
/// Doctor names contain spaces and dots, so the segment is always
/// backtick-quoted, with backslashes and backticks escaped.
fn quote_field_path(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PROJECT: &str = "sniper-test";

    fn document_path() -> String {
        format!(
            "/projects/{PROJECT}/databases/(default)/documents/{DOCUMENT_PATH}"
        )
    }

    #[test]
    fn test_quote_field_path_plain() {
        assert_eq!(quote_field_path("Dr. A"), "`Dr. A`");
    }

    #[test]
    fn test_quote_field_path_escapes() {
        assert_eq!(quote_field_path("a`b\\c"), "`a\\`b\\\\c`");
    }

    #[test]
    fn test_decode_dates() {
        let value = json!({
            "arrayValue": {
                "values": [
                    { "stringValue": "2024-05-01 10:00" },
                    { "stringValue": "2024-05-02 09:00" }
                ]
            }
        });
        assert_eq!(
            decode_dates(&value),
            ["2024-05-01 10:00", "2024-05-02 09:00"]
        );
    }

    #[test]
    fn test_decode_unexpected_shape_is_empty() {
        assert!(decode_dates(&json!({ "stringValue": "oops" })).is_empty());
        assert!(decode_dates(&json!({ "arrayValue": {} })).is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_document_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(document_path()))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store =
            FirestoreStore::with_token(Client::new(), &server.uri(), PROJECT, "token");
        let seen = store.load().await.unwrap();
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_load_decodes_document_fields() {
        let server = MockServer::start().await;
        let body = json!({
            "name": "projects/sniper-test/databases/(default)/documents/luxmed-sniper/seen-appointments",
            "fields": {
                "Dr. A": {
                    "arrayValue": { "values": [{ "stringValue": "2024-05-01 10:00" }] }
                }
            }
        });
        Mock::given(method("GET"))
            .and(path(document_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let store =
            FirestoreStore::with_token(Client::new(), &server.uri(), PROJECT, "token");
        let seen = store.load().await.unwrap();
        assert!(seen.is_known("Dr. A", "2024-05-01 10:00"));
    }

    #[tokio::test]
    async fn test_merge_masks_exactly_one_field() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(document_path()))
            .and(query_param("updateMask.fieldPaths", "`Dr. A`"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store =
            FirestoreStore::with_token(Client::new(), &server.uri(), PROJECT, "token");
        store
            .merge("Dr. A", &["2024-05-01 10:00".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_merge_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(document_path()))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store =
            FirestoreStore::with_token(Client::new(), &server.uri(), PROJECT, "token");
        let result = store.merge("Dr. A", &["2024-05-01 10:00".to_string()]).await;
        assert!(result.is_err());
    }
}
