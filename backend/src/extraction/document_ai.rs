//! # Document AI Client
//!
//! Sends a certificate to a Google Document AI processor and reads the
//! validity date out of the returned document model.
//!
//! ## Request
//!
//! `POST {endpoint}/{api_version}/projects/{project}/locations/{location}/processors/{processor}[/processorVersions/{version}]:process`
//! with body `{"rawDocument": {"content": <base64 bytes>, "mimeType": <mime>}}`.
//! The endpoint defaults to the regional host `https://{location}-documentai.googleapis.com`.
//! Every request carries a bearer token from an [`AccessTokenSource`].
//!
//! ## Response
//!
//! Only `document.entities` is read. The processor is trained to emit a
//! `validity` entity whose properties include `validity_date` and `signed_at`.
//! When several `validity` entities are present the last one wins, and within
//! it `validity_date` is preferred over `signed_at`. Empty mentions count as
//! absent; anything else is returned as written.

use super::auth::{AccessTokenSource, DefaultCredentials, StaticToken};
use super::{ExtractionError, ExtractionService, SourceDocument};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VALIDITY_ENTITY: &str = "validity";
const VALIDITY_DATE: &str = "validity_date";
const SIGNED_AT: &str = "signed_at";

/// Routing and transport settings for the processor.
#[derive(Debug, Clone)]
pub struct DocumentAiConfig {
    pub project_id: String,
    pub location: String,
    pub processor_id: String,
    pub processor_version: Option<String>,
    /// Overrides the regional host, e.g. for a proxy.
    pub endpoint: Option<String>,
    pub api_version: String,
    /// Static bearer token; application default credentials otherwise.
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl DocumentAiConfig {
    pub fn process_url(&self) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-documentai.googleapis.com", self.location),
        };
        let mut url = format!(
            "{}/{}/projects/{}/locations/{}/processors/{}",
            base, self.api_version, self.project_id, self.location, self.processor_id
        );
        if let Some(version) = &self.processor_version {
            url.push_str("/processorVersions/");
            url.push_str(version);
        }
        url.push_str(":process");
        url
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    raw_document: RawDocument<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument<'a> {
    content: String,
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct ProcessResponse {
    document: Option<Document>,
}

/// The subset of the Document AI document model the inventory reads.
#[derive(Debug, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// An entity or one of its properties; both share the same shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub mention_text: String,
    #[serde(default)]
    pub properties: Vec<Entity>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn find_validity_date(document: &Document) -> Option<String> {
    let mut validity_date = None;
    let mut signed_at = None;

    for entity in document.entities.iter().filter(|e| e.kind == VALIDITY_ENTITY) {
        validity_date = None;
        signed_at = None;
        for property in &entity.properties {
            match property.kind.as_str() {
                VALIDITY_DATE => validity_date = Some(property.mention_text.clone()),
                SIGNED_AT => signed_at = Some(property.mention_text.clone()),
                _ => {}
            }
        }
    }

    non_empty(validity_date).or_else(|| non_empty(signed_at))
}

/// Parses a `:process` response body.
pub fn parse_response(body: &str) -> Result<Option<String>, ExtractionError> {
    let parsed: ProcessResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;
    let document = parsed
        .document
        .ok_or_else(|| ExtractionError::MalformedResponse("response has no document".into()))?;
    Ok(find_validity_date(&document))
}

/// Blocking Document AI client.
pub struct DocumentAiClient {
    config: DocumentAiConfig,
    client: reqwest::blocking::Client,
    tokens: Box<dyn AccessTokenSource>,
    url: String,
}

impl DocumentAiClient {
    pub fn new(config: DocumentAiConfig) -> Result<Self, ExtractionError> {
        let tokens: Box<dyn AccessTokenSource> = match &config.access_token {
            Some(token) => Box::new(StaticToken::new(token.clone())),
            None => Box::new(DefaultCredentials::new()?),
        };
        Self::with_token_source(config, tokens)
    }

    pub fn with_token_source(
        config: DocumentAiConfig,
        tokens: Box<dyn AccessTokenSource>,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;
        let url = config.process_url();
        Ok(Self {
            config,
            client,
            tokens,
            url,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            ExtractionError::Timeout(self.config.timeout.as_secs())
        } else if e.is_connect() {
            ExtractionError::Transport(format!("cannot connect to {}: {}", self.url, e))
        } else {
            ExtractionError::Transport(e.to_string())
        }
    }
}

impl ExtractionService for DocumentAiClient {
    fn extract_validity_date(
        &self,
        document: &SourceDocument<'_>,
    ) -> Result<Option<String>, ExtractionError> {
        let body = ProcessRequest {
            raw_document: RawDocument {
                content: BASE64.encode(document.bytes),
                mime_type: document.mime_type,
            },
        };

        let token = self.tokens.bearer_token()?;
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&body)
            .send().map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().map_err(|e| self.transport_error(e))?;
        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Instant, SystemTime};

    fn config() -> DocumentAiConfig {
        DocumentAiConfig {
            project_id: "1011010917669".to_string(),
            location: "eu".to_string(),
            processor_id: "51b6ccf5a4eecb2".to_string(),
            processor_version: None,
            endpoint: None,
            api_version: "v1".to_string(),
            access_token: Some("test-token".to_string()),
            timeout: Duration::from_secs(2),
        }
    }

    fn pdf() -> SourceDocument<'static> {
        SourceDocument {
            path: Path::new("ISO.pdf"),
            modified_at: SystemTime::UNIX_EPOCH,
            bytes: b"%PDF-1.4",
            mime_type: "application/pdf",
        }
    }

    /// Answers `requests` HTTP requests with `body`, one connection each, and
    /// returns the request heads it received.
    fn serve_json(body: &'static str, requests: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for _ in 0..requests {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);
                let mut head = String::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                    head.push_str(&line);
                }
                let mut request_body = vec![0; content_length];
                reader.read_exact(&mut request_body).unwrap();
                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .unwrap();
                heads.push(head);
            }
            heads
        });
        (endpoint, handle)
    }

    struct CountingTokens(AtomicUsize);

    impl AccessTokenSource for CountingTokens {
        fn bearer_token(&self) -> Result<String, ExtractionError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("token-{}", n))
        }
    }

    struct NoCredentials;

    impl AccessTokenSource for NoCredentials {
        fn bearer_token(&self) -> Result<String, ExtractionError> {
            Err(ExtractionError::Auth("no default credentials".to_string()))
        }
    }

    #[test]
    fn url_targets_regional_processor() {
        assert_eq!(
            config().process_url(),
            "https://eu-documentai.googleapis.com/v1/projects/1011010917669/locations/eu/processors/51b6ccf5a4eecb2:process"
        );
    }

    #[test]
    fn url_includes_version_and_endpoint_override() {
        let mut cfg = config();
        cfg.processor_version = Some("c6dd0d7cd5fb9b38".to_string());
        cfg.endpoint = Some("http://localhost:8089/".to_string());
        cfg.api_version = "v1beta3".to_string();
        assert_eq!(
            cfg.process_url(),
            "http://localhost:8089/v1beta3/projects/1011010917669/locations/eu/processors/51b6ccf5a4eecb2/processorVersions/c6dd0d7cd5fb9b38:process"
        );
    }

    #[test]
    fn reads_validity_date_property() {
        let body = r#"{
            "document": {
                "text": "...",
                "entities": [
                    {"type": "supplier", "mentionText": "ACME"},
                    {"type": "validity", "mentionText": "valid until 2026",
                     "properties": [
                        {"type": "signed_at", "mentionText": "01/02/2023"},
                        {"type": "validity_date", "mentionText": "01/02/2026"}
                     ]}
                ]
            }
        }"#;
        assert_eq!(parse_response(body).unwrap(), Some("01/02/2026".to_string()));
    }

    #[test]
    fn falls_back_to_signed_at() {
        let body = r#"{"document": {"entities": [
            {"type": "validity", "properties": [
                {"type": "validity_date", "mentionText": ""},
                {"type": "signed_at", "mentionText": "15 March 2024"}
            ]}
        ]}}"#;
        assert_eq!(
            parse_response(body).unwrap(),
            Some("15 March 2024".to_string())
        );
    }

    #[test]
    fn missing_validity_entity_is_absent_not_error() {
        let body = r#"{"document": {"entities": [{"type": "supplier", "mentionText": "ACME"}]}}"#;
        assert_eq!(parse_response(body).unwrap(), None);

        let body = r#"{"document": {}}"#;
        assert_eq!(parse_response(body).unwrap(), None);
    }

    #[test]
    fn empty_mentions_are_absent() {
        let body = r#"{"document": {"entities": [
            {"type": "validity", "properties": [
                {"type": "validity_date", "mentionText": ""}
            ]}
        ]}}"#;
        assert_eq!(parse_response(body).unwrap(), None);
    }

    #[test]
    fn mention_text_is_returned_verbatim() {
        let body = r#"{"document": {"entities": [
            {"type": "validity", "properties": [
                {"type": "validity_date", "mentionText": " 12 May 2026\n"}
            ]}
        ]}}"#;
        assert_eq!(
            parse_response(body).unwrap(),
            Some(" 12 May 2026\n".to_string())
        );
    }

    #[test]
    fn last_validity_entity_wins() {
        let body = r#"{"document": {"entities": [
            {"type": "validity", "properties": [{"type": "validity_date", "mentionText": "2020-01-01"}]},
            {"type": "validity", "properties": [{"type": "signed_at", "mentionText": "2022-06-30"}]}
        ]}}"#;
        assert_eq!(parse_response(body).unwrap(), Some("2022-06-30".to_string()));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            parse_response("<html>502</html>"),
            Err(ExtractionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"error": "quota"}"#),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn refused_connection_is_a_transport_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut cfg = config();
        cfg.endpoint = Some(format!("http://127.0.0.1:{}", port));
        let client = DocumentAiClient::new(cfg).unwrap();
        assert!(matches!(
            client.extract_validity_date(&pdf()),
            Err(ExtractionError::Transport(_))
        ));
    }

    #[test]
    fn silent_service_times_out_after_configured_limit() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut cfg = config();
        cfg.endpoint = Some(format!("http://{}", listener.local_addr().unwrap()));
        cfg.timeout = Duration::from_secs(1);
        let client = DocumentAiClient::new(cfg).unwrap();

        let start = Instant::now();
        let result = client.extract_validity_date(&pdf());
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(ExtractionError::Timeout(1))), "{:?}", result);
        assert!(elapsed >= Duration::from_millis(900), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "{:?}", elapsed);
        drop(listener);
    }

    #[test]
    fn token_is_fetched_for_every_call() {
        let body = r#"{"document": {"entities": [
            {"type": "validity", "properties": [{"type": "validity_date", "mentionText": "2026-09-30"}]}
        ]}}"#;
        let (endpoint, server) = serve_json(body, 2);
        let mut cfg = config();
        cfg.endpoint = Some(endpoint);
        cfg.access_token = None;
        let client =
            DocumentAiClient::with_token_source(cfg, Box::new(CountingTokens(AtomicUsize::new(0))))
                .unwrap();

        for _ in 0..2 {
            assert_eq!(
                client.extract_validity_date(&pdf()).unwrap(),
                Some("2026-09-30".to_string())
            );
        }

        let heads = server.join().unwrap();
        assert!(heads[0].to_ascii_lowercase().contains("authorization: bearer token-1"));
        assert!(heads[1].to_ascii_lowercase().contains("authorization: bearer token-2"));
        assert!(heads[0].starts_with("POST /v1/projects/1011010917669/locations/eu/processors/51b6ccf5a4eecb2:process"));
    }

    #[test]
    fn missing_credentials_fail_before_any_request() {
        let mut cfg = config();
        cfg.endpoint = Some("http://127.0.0.1:9".to_string());
        let client = DocumentAiClient::with_token_source(cfg, Box::new(NoCredentials)).unwrap();
        assert!(matches!(
            client.extract_validity_date(&pdf()),
            Err(ExtractionError::Auth(_))
        ));
    }
}
