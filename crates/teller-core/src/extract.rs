//! Raw document-extraction boundary
//!
//! One PDF goes in, a `RawDocument` comes out: zero or more tables (ordered
//! rows of ordered cells, with a header flag and optional per-cell
//! confidence) and zero or more key/value entities. Everything downstream is
//! agnostic to which extraction backend produced the shape.
//!
//! The shipped backend targets the Google Document AI `process` endpoint.
//! `MockExtractor` returns a canned document for tests and offline use.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A single text cell in a detected table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub text: String,
    pub confidence: Option<f32>,
}

impl RawCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// One row of a detected table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: Vec<RawCell>,
    /// True when the extraction service flagged this as a header row
    pub header: bool,
}

/// A detected table: ordered rows of ordered cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// The first header row, if the service detected one
    pub fn header_row(&self) -> Option<&RawRow> {
        self.rows.iter().find(|r| r.header)
    }

    /// Rows that are not header rows, with their position in the table
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &RawRow)> {
        self.rows.iter().enumerate().filter(|(_, r)| !r.header)
    }
}

/// A detected key/value entity (e.g. "Opening Balance" -> "1,200.00")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub name: String,
    pub value: String,
    pub confidence: Option<f32>,
}

/// The unprocessed structured result of extracting one PDF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub tables: Vec<RawTable>,
    pub entities: Vec<RawEntity>,
}

/// Boundary to the external document-extraction service
///
/// The sole external extraction dependency of the core. Retry/backoff, if
/// any, belongs behind this trait, never in the normalizer or ledger.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn process(&self, pdf: &Path) -> Result<RawDocument>;
}

// =============================================================================
// Document AI backend
// =============================================================================

/// Document AI `process` response, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct ProcessResponse {
    document: DocAiDocument,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiDocument {
    text: String,
    pages: Vec<DocAiPage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiPage {
    tables: Vec<DocAiTable>,
    form_fields: Vec<DocAiFormField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiTable {
    header_rows: Vec<DocAiRow>,
    body_rows: Vec<DocAiRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocAiRow {
    cells: Vec<DocAiCell>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DocAiCell {
    layout: DocAiLayout,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiLayout {
    text_anchor: DocAiTextAnchor,
    confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiTextAnchor {
    text_segments: Vec<DocAiTextSegment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiTextSegment {
    #[serde(deserialize_with = "index_from_string_or_number")]
    start_index: i64,
    #[serde(deserialize_with = "index_from_string_or_number")]
    end_index: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocAiFormField {
    field_name: DocAiLayout,
    field_value: DocAiLayout,
}

/// Document AI serializes int64 as JSON strings; accept both forms
fn index_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Resolve a layout's text anchor against the full document text
fn anchor_text(doc_text: &str, layout: &DocAiLayout) -> String {
    let mut text = String::new();
    for segment in &layout.text_anchor.text_segments {
        let start = segment.start_index.max(0) as usize;
        let end = segment.end_index.max(0) as usize;
        match doc_text.get(start..end) {
            Some(slice) => text.push_str(slice),
            None => warn!(start, end, doc_len = doc_text.len(), "Invalid text segment indices"),
        }
    }
    text.trim().replace('\n', " ")
}

fn map_document(doc: &DocAiDocument) -> RawDocument {
    let mut tables = Vec::new();
    let mut entities = Vec::new();

    for page in &doc.pages {
        for table in &page.tables {
            let mut rows = Vec::new();
            for row in &table.header_rows {
                rows.push(map_row(&doc.text, row, true));
            }
            for row in &table.body_rows {
                rows.push(map_row(&doc.text, row, false));
            }
            tables.push(RawTable { rows });
        }

        for field in &page.form_fields {
            entities.push(RawEntity {
                name: anchor_text(&doc.text, &field.field_name),
                value: anchor_text(&doc.text, &field.field_value),
                confidence: field.field_value.confidence,
            });
        }
    }

    RawDocument { tables, entities }
}

fn map_row(doc_text: &str, row: &DocAiRow, header: bool) -> RawRow {
    RawRow {
        cells: row
            .cells
            .iter()
            .map(|cell| RawCell {
                text: anchor_text(doc_text, &cell.layout),
                confidence: cell.layout.confidence,
            })
            .collect(),
        header,
    }
}

/// Extraction backend for Google Document AI
///
/// Configured entirely from the environment; the access token is expected to
/// be short-lived (`gcloud auth print-access-token`).
pub struct DocAiExtractor {
    http_client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl DocAiExtractor {
    pub fn new(project: &str, location: &str, processor: &str, access_token: &str) -> Self {
        let endpoint = format!(
            "https://{location}-documentai.googleapis.com/v1/projects/{project}/locations/{location}/processors/{processor}:process"
        );
        Self {
            http_client: reqwest::Client::new(),
            endpoint,
            access_token: access_token.to_string(),
        }
    }

    /// Create from environment
    ///
    /// Required: `GCP_PROJECT_ID`, `DOCUMENT_AI_PROCESSOR_ID`,
    /// `DOCUMENT_AI_ACCESS_TOKEN`. Optional: `GCP_LOCATION` (default `us`).
    pub fn from_env() -> Result<Self> {
        let project = require_env("GCP_PROJECT_ID")?;
        let location = std::env::var("GCP_LOCATION").unwrap_or_else(|_| "us".to_string());
        let processor = require_env("DOCUMENT_AI_PROCESSOR_ID")?;
        let token = require_env("DOCUMENT_AI_ACCESS_TOKEN")?;
        Ok(Self::new(&project, &location, &processor, &token))
    }
}

pub(crate) fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{name} is not set")))
}

#[async_trait]
impl DocumentExtractor for DocAiExtractor {
    async fn process(&self, pdf: &Path) -> Result<RawDocument> {
        let bytes = tokio::fs::read(pdf).await?;
        let content = base64::engine::general_purpose::STANDARD.encode(&bytes);

        debug!(pdf = %pdf.display(), bytes = bytes.len(), "Sending document for extraction");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "rawDocument": {
                    "content": content,
                    "mimeType": "application/pdf",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "Extraction service rejected the request");
            return Err(Error::Adapter(format!(
                "document extraction failed with HTTP {status}"
            )));
        }

        let parsed: ProcessResponse = response.json().await?;
        let raw = map_document(&parsed.document);

        debug!(
            tables = raw.tables.len(),
            entities = raw.entities.len(),
            "Extraction complete"
        );

        Ok(raw)
    }
}

/// Canned extraction backend for tests and offline runs
pub struct MockExtractor {
    document: RawDocument,
}

impl MockExtractor {
    pub fn new(document: RawDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn process(&self, _pdf: &Path) -> Result<RawDocument> {
        Ok(self.document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_process_response() {
        // Indices arrive as strings (int64) or numbers depending on encoder
        let json = r#"{
            "document": {
                "text": "Date Amount 01/02/2024 -10.00 Opening Balance 500.00",
                "pages": [{
                    "tables": [{
                        "headerRows": [{"cells": [
                            {"layout": {"textAnchor": {"textSegments": [{"startIndex": "0", "endIndex": "4"}]}, "confidence": 0.99}},
                            {"layout": {"textAnchor": {"textSegments": [{"startIndex": 5, "endIndex": 11}]}}}
                        ]}],
                        "bodyRows": [{"cells": [
                            {"layout": {"textAnchor": {"textSegments": [{"startIndex": "12", "endIndex": "22"}]}}},
                            {"layout": {"textAnchor": {"textSegments": [{"startIndex": "23", "endIndex": "29"}]}}}
                        ]}]
                    }],
                    "formFields": [{
                        "fieldName": {"textAnchor": {"textSegments": [{"startIndex": "30", "endIndex": "45"}]}},
                        "fieldValue": {"textAnchor": {"textSegments": [{"startIndex": "46", "endIndex": "52"}]}, "confidence": 0.8}
                    }]
                }]
            }
        }"#;

        let parsed: ProcessResponse = serde_json::from_str(json).unwrap();
        let raw = map_document(&parsed.document);

        assert_eq!(raw.tables.len(), 1);
        let table = &raw.tables[0];
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows[0].header);
        assert_eq!(table.rows[0].cells[0].text, "Date");
        assert_eq!(table.rows[0].cells[0].confidence, Some(0.99));
        assert_eq!(table.rows[0].cells[1].text, "Amount");
        assert!(!table.rows[1].header);
        assert_eq!(table.rows[1].cells[0].text, "01/02/2024");
        assert_eq!(table.rows[1].cells[1].text, "-10.00");

        assert_eq!(raw.entities.len(), 1);
        assert_eq!(raw.entities[0].name, "Opening Balance");
        assert_eq!(raw.entities[0].value, "500.00");
        assert_eq!(raw.entities[0].confidence, Some(0.8));
    }

    #[test]
    fn test_anchor_text_out_of_bounds() {
        let layout = DocAiLayout {
            text_anchor: DocAiTextAnchor {
                text_segments: vec![DocAiTextSegment {
                    start_index: 0,
                    end_index: 99,
                }],
            },
            confidence: None,
        };
        // Invalid range resolves to nothing rather than panicking
        assert_eq!(anchor_text("short", &layout), "");
    }

    #[test]
    fn test_anchor_text_joins_segments_and_flattens_newlines() {
        let text = "ACME\nBANK ignored STATEMENT";
        let layout = DocAiLayout {
            text_anchor: DocAiTextAnchor {
                text_segments: vec![
                    DocAiTextSegment {
                        start_index: 0,
                        end_index: 9,
                    },
                    DocAiTextSegment {
                        start_index: 17,
                        end_index: 27,
                    },
                ],
            },
            confidence: None,
        };
        assert_eq!(anchor_text(text, &layout), "ACME BANK STATEMENT");
    }

    #[test]
    fn test_table_row_accessors() {
        let table = RawTable {
            rows: vec![
                RawRow {
                    cells: vec![RawCell::new("Date")],
                    header: true,
                },
                RawRow {
                    cells: vec![RawCell::new("01/02/2024")],
                    header: false,
                },
            ],
        };
        assert_eq!(table.header_row().unwrap().cells[0].text, "Date");
        let data: Vec<_> = table.data_rows().collect();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].0, 1);
    }

    #[tokio::test]
    async fn test_mock_extractor_returns_canned_document() {
        let doc = RawDocument {
            tables: vec![RawTable::default()],
            entities: vec![],
        };
        let mock = MockExtractor::new(doc.clone());
        let got = mock.process(Path::new("ignored.pdf")).await.unwrap();
        assert_eq!(got, doc);
    }
}
