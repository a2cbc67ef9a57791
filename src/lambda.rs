//! Step-function task handler: fetch a document from S3, store its pages in
//! the result bucket, and report the stored keys.
//!
//! ## Event
//!
//! ```json
//! { "bucket": "uploads", "resultBucket": "pages", "pdfKey": "inbox/Report.docx",
//!   "fileId": "42", "outputPrefix": "images", "format": "png" }
//! ```
//!
//! `outputPrefix` defaults to `""` and `format` to `"png"`. Any other fields
//! are echoed back untouched.
//!
//! ## Responses
//!
//! | Outcome          | Shape                                                        |
//! |------------------|--------------------------------------------------------------|
//! | success          | the event plus `pages` and `items` (`[{key, page, filename, fileId}]`) |
//! | unsupported kind | `{statusCode: 200, headers, body: "{\"message\": ...}"}`     |
//! | any failure      | `{statusCode: 500, body: "{\"message\": \"Error processing file: ...\"}"}` |
//!
//! Document problems never surface as a Lambda invocation error; the state
//! machine branches on the returned payload.

use crate::config::{ConversionConfig, ImageFormat};
use crate::convert::convert_bytes;
use crate::document::{dotted_extension, DocumentKind};
use crate::error::Doc2PagesError;
use crate::layout::PageGeometry;
use crate::output::StoredPage;
use crate::sink::{PageSink, S3Sink};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Region used when `REGION` is unset.
pub const DEFAULT_REGION: &str = "eu-central-1";

// ── Event ────────────────────────────────────────────────────────────────

/// The fields of the task input this handler reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub bucket: String,
    pub result_bucket: String,
    pub pdf_key: String,
    pub file_id: String,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "png".to_string()
}

/// Where a document key points, split the way the upload layout expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Second key segment up to its first dot.
    pub filename: String,
    /// The key with any `s3://` scheme removed.
    pub key_path: String,
}

/// Split `<folder>/<file>.<ext>` (optionally prefixed by `s3://`).
///
/// Keys with any other number of segments are rejected.
pub fn parse_s3_key(key: &str) -> Result<KeyInfo, Doc2PagesError> {
    let key_path = key.rsplit("s3://").next().unwrap_or(key);
    let parts: Vec<&str> = key_path.split('/').collect();
    if parts.len() != 2 {
        return Err(Doc2PagesError::InvalidKey {
            key: key.to_string(),
        });
    }
    let filename = parts[1].split('.').next().unwrap_or_default();
    Ok(KeyInfo {
        filename: filename.to_string(),
        key_path: key_path.to_string(),
    })
}

/// Undo the URL encoding S3 event notifications apply to object keys.
pub fn decode_key(key: &str) -> String {
    percent_decode_str(key)
        .decode_utf8_lossy()
        .replace('+', " ")
}

// ── Responses ────────────────────────────────────────────────────────────

/// API-style response with a JSON-encoded body.
pub fn lambda_response(status_code: u16, body: Value) -> Value {
    json!({
        "statusCode": status_code,
        "headers": {
            "Access-Control-Allow-Origin": "*",
            "Content-Type": "application/json",
        },
        "body": body.to_string(),
    })
}

/// Failure payload for any error while processing the file.
pub fn error_response(err: &dyn std::fmt::Display) -> Value {
    json!({
        "statusCode": 500,
        "body": json!({ "message": format!("Error processing file: {}", err) }).to_string(),
    })
}

/// The original event with `pages` and `items` added.
pub fn success_response(event: Value, items: &[StoredPage]) -> Value {
    let mut out = match event {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    out.insert("pages".into(), json!(items.len()));
    out.insert("items".into(), json!(items));
    Value::Object(out)
}

// ── Configuration ────────────────────────────────────────────────────────

/// Handler settings, read once at cold start.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub region: String,
    /// Base conversion settings; format, prefix and file id come per event.
    pub conversion: ConversionConfig,
}

impl LambdaConfig {
    /// Load from environment variables.
    ///
    /// | Variable            | Default        |
    /// |---------------------|----------------|
    /// | `REGION`            | `eu-central-1` |
    /// | `PAGE_WIDTH`        | 2480           |
    /// | `PAGE_HEIGHT`       | 3508           |
    /// | `MARGIN`            | 200            |
    /// | `FONT_SIZE`         | 36             |
    /// | `LINE_HEIGHT`       | font size × 1.5|
    /// | `MAX_CHARS_PER_LINE`| 80             |
    /// | `FONT_FACE`         | `10x20`        |
    /// | `PDF_DPI`           | 100            |
    /// | `CONCURRENCY`       | 4              |
    pub fn from_env() -> Result<Self, Doc2PagesError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`LambdaConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Doc2PagesError> {
        let number = |name: &str| -> Result<Option<u32>, Doc2PagesError> {
            match lookup(name) {
                None => Ok(None),
                Some(v) => v.trim().parse().map(Some).map_err(|_| {
                    Doc2PagesError::InvalidConfig(format!("{name} must be a whole number, got '{v}'"))
                }),
            }
        };

        let defaults = PageGeometry::default();
        let mut geometry = PageGeometry::builder()
            .page_width(number("PAGE_WIDTH")?.unwrap_or(defaults.page_width))
            .page_height(number("PAGE_HEIGHT")?.unwrap_or(defaults.page_height))
            .margin(number("MARGIN")?.unwrap_or(defaults.margin))
            .font_size(number("FONT_SIZE")?.unwrap_or(defaults.font_size));
        if let Some(line_height) = number("LINE_HEIGHT")? {
            geometry = geometry.line_height(line_height);
        }
        if let Some(max_chars) = number("MAX_CHARS_PER_LINE")? {
            geometry = geometry.max_chars_per_line(max_chars as usize);
        }

        let mut conversion = ConversionConfig::builder().geometry(geometry.build()?);
        if let Some(face) = lookup("FONT_FACE").filter(|f| !f.trim().is_empty()) {
            conversion = conversion.font_face(face);
        }
        if let Some(dpi) = number("PDF_DPI")? {
            conversion = conversion.pdf_dpi(dpi);
        }
        if let Some(n) = number("CONCURRENCY")? {
            conversion = conversion.concurrency(n as usize);
        }

        Ok(Self {
            region: lookup("REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            conversion: conversion.build()?,
        })
    }
}

// ── Handler ──────────────────────────────────────────────────────────────

/// Reads source documents from object storage.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Doc2PagesError>;
}

/// [`ObjectSource`] backed by `get_object`.
#[derive(Debug, Clone)]
pub struct S3Source {
    client: aws_sdk_s3::Client,
}

impl S3Source {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectSource for S3Source {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Doc2PagesError> {
        let location = format!("s3://{bucket}/{key}");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Doc2PagesError::DownloadFailed {
                url: location.clone(),
                reason: aws_sdk_s3::error::DisplayErrorContext(&e).to_string(),
            })?;
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| Doc2PagesError::DownloadFailed {
                url: location,
                reason: e.to_string(),
            })?;
        Ok(body.into_bytes().to_vec())
    }
}

/// Handle one task input and build the payload returned to the state machine.
///
/// `make_sink` is called with the result bucket.
pub async fn process_event<F>(
    payload: Value,
    source: &dyn ObjectSource,
    make_sink: F,
    config: &LambdaConfig,
) -> Value
where
    F: Fn(&str) -> Arc<dyn PageSink>,
{
    match try_process(&payload, source, make_sink, config).await {
        Ok(Outcome::Stored(items)) => success_response(payload, &items),
        Ok(Outcome::Unsupported(err)) => {
            info!("{}", err);
            lambda_response(200, json!({ "message": err.to_string() }))
        }
        Err(e) => {
            error!("Error processing file: {}", e);
            error_response(&e)
        }
    }
}

enum Outcome {
    Stored(Vec<StoredPage>),
    Unsupported(Doc2PagesError),
}

async fn try_process<F>(
    payload: &Value,
    source: &dyn ObjectSource,
    make_sink: F,
    config: &LambdaConfig,
) -> Result<Outcome, Doc2PagesError>
where
    F: Fn(&str) -> Arc<dyn PageSink>,
{
    let event = StepEvent::deserialize(payload)
        .map_err(|e| Doc2PagesError::InvalidEvent(e.to_string()))?;
    info!(key = %event.pdf_key, file_id = %event.file_id, "Processing event");

    let key_info = parse_s3_key(&event.pdf_key)?;
    if DocumentKind::from_path(&key_info.key_path).is_none() {
        return Ok(Outcome::Unsupported(Doc2PagesError::UnsupportedDocument {
            extension: dotted_extension(&key_info.key_path),
        }));
    }

    let format: ImageFormat = event.format.parse()?;
    let mut conversion = config.conversion.clone();
    conversion.image_format = format;
    conversion.output_prefix = event.output_prefix.clone();
    conversion.file_id = event.file_id.clone();

    let bytes = source
        .fetch(&event.bucket, &decode_key(&key_info.key_path))
        .await?;
    info!("Fetched {} bytes from s3://{}", bytes.len(), event.bucket);

    let sink = make_sink(&event.result_bucket);
    let output = convert_bytes(&bytes, &key_info.key_path, sink.as_ref(), &conversion).await?;
    Ok(Outcome::Stored(output.pages))
}

/// Owns the S3 client and configuration for the lifetime of the function.
pub struct StepHandler {
    client: aws_sdk_s3::Client,
    source: S3Source,
    config: LambdaConfig,
}

impl StepHandler {
    pub fn new(client: aws_sdk_s3::Client, config: LambdaConfig) -> Self {
        Self {
            source: S3Source::new(client.clone()),
            client,
            config,
        }
    }

    pub async fn handle(
        &self,
        event: lambda_runtime::LambdaEvent<Value>,
    ) -> Result<Value, lambda_runtime::Error> {
        let client = self.client.clone();
        let make_sink = move |bucket: &str| -> Arc<dyn PageSink> {
            Arc::new(S3Sink::new(client.clone(), bucket))
        };
        Ok(process_event(event.payload, &self.source, make_sink, &self.config).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::collections::HashMap;

    struct FixedSource(HashMap<(String, String), Vec<u8>>);

    impl FixedSource {
        fn with(bucket: &str, key: &str, bytes: &[u8]) -> Self {
            let mut map = HashMap::new();
            map.insert((bucket.to_string(), key.to_string()), bytes.to_vec());
            Self(map)
        }
    }

    #[async_trait]
    impl ObjectSource for FixedSource {
        async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Doc2PagesError> {
            self.0
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| Doc2PagesError::DownloadFailed {
                    url: format!("s3://{bucket}/{key}"),
                    reason: "NoSuchKey".into(),
                })
        }
    }

    fn config() -> LambdaConfig {
        LambdaConfig::from_lookup(|name| match name {
            "PAGE_WIDTH" => Some("400".into()),
            "PAGE_HEIGHT" => Some("300".into()),
            "MARGIN" => Some("20".into()),
            "FONT_SIZE" => Some("10".into()),
            "MAX_CHARS_PER_LINE" => Some("30".into()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn parse_key_takes_stem_of_second_segment() {
        let info = parse_s3_key("uploads/Annual Report.v2.pdf").unwrap();
        assert_eq!(info.filename, "Annual Report");
        assert_eq!(info.key_path, "uploads/Annual Report.v2.pdf");

        let info = parse_s3_key("s3://uploads/a.txt").unwrap();
        assert_eq!(info.key_path, "uploads/a.txt");
    }

    #[test]
    fn parse_key_requires_two_segments() {
        assert!(matches!(
            parse_s3_key("a/b/c.pdf"),
            Err(Doc2PagesError::InvalidKey { .. })
        ));
        assert!(parse_s3_key("c.pdf").is_err());
    }

    #[test]
    fn decode_key_handles_percent_and_plus() {
        assert_eq!(decode_key("inbox/My+Notes%C3%A9.md"), "inbox/My Notesé.md");
        assert_eq!(decode_key("inbox/a%2Bb.txt"), "inbox/a b.txt");
    }

    #[test]
    fn config_reads_overrides_and_defaults() {
        let c = config();
        assert_eq!(c.region, DEFAULT_REGION);
        assert_eq!(c.conversion.geometry.page_width, 400);
        assert_eq!(c.conversion.geometry.line_height, 15);
        assert_eq!(c.conversion.pdf_dpi, 100);
    }

    #[test]
    fn config_rejects_garbage_numbers() {
        let err = LambdaConfig::from_lookup(|name| (name == "MARGIN").then(|| "wide".into()))
            .unwrap_err();
        assert!(err.to_string().contains("MARGIN"));
    }

    #[test]
    fn error_response_body_is_json_string() {
        let resp = error_response(&"boom");
        assert_eq!(resp["statusCode"], 500);
        let body: Value = serde_json::from_str(resp["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["message"], "Error processing file: boom");
    }

    #[tokio::test]
    async fn text_event_returns_items_and_echoes_fields() {
        let source = FixedSource::with("in", "docs/My Notes.txt", b"hello\nworld");
        let sink = Arc::new(MemorySink::new());
        let sink_for_handler = sink.clone();
        let payload = json!({
            "bucket": "in",
            "resultBucket": "out",
            "pdfKey": "docs/My+Notes.txt",
            "fileId": "abc",
            "outputPrefix": "pages",
            "runId": 7
        });

        let resp = process_event(
            payload,
            &source,
            move |bucket: &str| -> Arc<dyn PageSink> {
                assert_eq!(bucket, "out");
                sink_for_handler.clone()
            },
            &config(),
        )
        .await;

        assert_eq!(resp["runId"], 7);
        assert_eq!(resp["pages"], 1);
        assert_eq!(
            resp["items"][0],
            json!({"key": "pages/My+Notes-1.png", "page": 1, "filename": "My+Notes", "fileId": "abc"})
        );
        assert_eq!(sink.keys(), vec!["pages/My+Notes-1.png".to_string()]);
    }

    #[tokio::test]
    async fn unsupported_type_is_a_200_message() {
        let source = FixedSource(HashMap::new());
        let payload = json!({
            "bucket": "in", "resultBucket": "out", "pdfKey": "docs/sheet.xlsx", "fileId": "1"
        });
        let resp = process_event(
            payload,
            &source,
            |_: &str| -> Arc<dyn PageSink> { Arc::new(MemorySink::new()) },
            &config(),
        )
        .await;

        assert_eq!(resp["statusCode"], 200);
        assert_eq!(resp["headers"]["Content-Type"], "application/json");
        let body: Value = serde_json::from_str(resp["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["message"], "File type .xlsx not supported for conversion");
    }

    #[tokio::test]
    async fn missing_object_is_a_500() {
        let source = FixedSource(HashMap::new());
        let payload = json!({
            "bucket": "in", "resultBucket": "out", "pdfKey": "docs/a.txt", "fileId": "1"
        });
        let resp = process_event(
            payload,
            &source,
            |_: &str| -> Arc<dyn PageSink> { Arc::new(MemorySink::new()) },
            &config(),
        )
        .await;

        assert_eq!(resp["statusCode"], 500);
        assert!(resp["body"].as_str().unwrap().contains("NoSuchKey"));
    }

    #[tokio::test]
    async fn missing_field_is_a_500() {
        let source = FixedSource(HashMap::new());
        let resp = process_event(
            json!({ "bucket": "in" }),
            &source,
            |_: &str| -> Arc<dyn PageSink> { Arc::new(MemorySink::new()) },
            &config(),
        )
        .await;
        assert_eq!(resp["statusCode"], 500);
        assert!(resp["body"].as_str().unwrap().contains("Invalid task event"));
    }
}
