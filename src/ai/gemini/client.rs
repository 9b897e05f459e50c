//! Gemini API Client
//!
//! Handles communication with Google's Generative Language API:
//! - Files API upload (resumable protocol) to stage a document image
//! - `generateContent` with the classification prompt
//! - Deleting the staged file afterwards, whatever the outcome

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use super::types::*;
use super::utils::{extract_json_object, truncate_for_log};
use super::vision;
use crate::ai::classifier::{ClassifyError, DocumentClassifier};
use crate::ai::http_client::gemini_client;
use crate::ai::prompts::CLASSIFY_DOCUMENT_PROMPT;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";
const MAX_ERROR_BODY_CHARS: usize = 300;

/// A file staged with the Files API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    /// Resource name, e.g. `files/abc123`
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client on top of the shared HTTP connection pool
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: gemini_client().clone(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Stage `data` with the Files API and return the created file
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<StagedFile, ClassifyError> {
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.config.base_url))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name },
            })
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ClassifyError::MalformedResponse(format!(
                    "upload session has no {} header",
                    UPLOAD_URL_HEADER
                ))
            })?;

        let finish = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, mime_type)
            .body(data)
            .send()
            .await?;
        let finish = check_status(finish).await?;

        let body: Value = finish
            .json()
            .await
            .map_err(|e| ClassifyError::MalformedResponse(format!("upload response: {}", e)))?;

        match serde_json::from_value::<UploadResponse>(body.clone()) {
            Ok(response) => Ok(response.file),
            Err(e) => {
                // The file exists server-side once finalize succeeded
                if let Some(name) = body.pointer("/file/name").and_then(Value::as_str) {
                    if let Err(delete_err) = self.delete_file(name).await {
                        warn!(
                            staged = %name,
                            error = %delete_err,
                            "Failed to delete staged file"
                        );
                    }
                }
                Err(ClassifyError::MalformedResponse(format!("upload response: {}", e)))
            }
        }
    }

    /// Ask the model about a staged file; returns the raw response text
    pub async fn generate_json(
        &self,
        prompt: &str,
        file: &StagedFile,
        mime_type: &str,
    ) -> Result<String, ClassifyError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt },
                    Part::FileData {
                        file_data: FileData {
                            mime_type: file.mime_type.as_deref().unwrap_or(mime_type),
                            file_uri: &file.uri,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.config.base_url, self.config.model
            ))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::MalformedResponse(format!("generate response: {}", e)))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyResponse);
        }
        Ok(text)
    }

    /// Delete a staged file by resource name
    pub async fn delete_file(&self, name: &str) -> Result<(), ClassifyError> {
        let response = self
            .client
            .delete(format!("{}/v1beta/{}", self.config.base_url, name))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentClassifier for GeminiClient {
    async fn classify(&self, path: &Path) -> Result<ClassificationResult, ClassifyError> {
        let Some(mime_type) = vision::image_mime_type(path) else {
            let mime = vision::guess_mime_type(path).unwrap_or_else(|| "unknown type".to_string());
            info!(file = %path.display(), mime = %mime, "Skipping non-image file");
            return Err(ClassifyError::NotAnImage { mime });
        };

        let data = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let staged = self.upload_file(data, &mime_type, &display_name).await?;
        debug!(file = %display_name, staged = %staged.name, "Staged file for classification");

        let generated = self
            .generate_json(&CLASSIFY_DOCUMENT_PROMPT, &staged, &mime_type)
            .await;

        // The staged copy goes away on every path past a successful upload.
        if let Err(e) = self.delete_file(&staged.name).await {
            warn!(staged = %staged.name, error = %e, "Failed to delete staged file");
        }

        let result = parse_classification(&generated?)?;
        info!(
            file = %display_name,
            document_type = %result.document_type,
            serial = %result.serial_number,
            site = %result.site,
            "Detected document"
        );
        Ok(result)
    }
}

/// Turn the model's text into a classification.
///
/// `documentType` and `serialNumber` are required; `site` defaults to
/// `"N/A"`. Extra keys are ignored.
pub fn parse_classification(text: &str) -> Result<ClassificationResult, ClassifyError> {
    let json = extract_json_object(text).ok_or_else(|| {
        ClassifyError::MalformedResponse(format!(
            "no JSON object in: {}",
            truncate_for_log(text, MAX_ERROR_BODY_CHARS)
        ))
    })?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ClassifyError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| ClassifyError::MalformedResponse("expected a JSON object".to_string()))?;

    let document_type =
        field_text(object, "documentType").ok_or(ClassifyError::MissingField("documentType"))?;
    let serial_number =
        field_text(object, "serialNumber").ok_or(ClassifyError::MissingField("serialNumber"))?;
    let site = field_text(object, "site").unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let parsed_type = DocumentType::from_label(&document_type);
    if parsed_type.is_unknown() && !document_type.eq_ignore_ascii_case("unknown") {
        debug!(label = %document_type, "Unrecognized document type label");
    }

    Ok(ClassificationResult {
        document_type: parsed_type,
        serial_number,
        site,
    })
}

/// Read a field as text. Null and blank values count as absent.
fn field_text(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    let text = match object.get(key)? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

async fn check_status(response: Response) -> Result<Response, ClassifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClassifyError::Api {
        status: status.as_u16(),
        body: truncate_for_log(body.trim(), MAX_ERROR_BODY_CHARS),
    })
}

// API request/response types

#[derive(Serialize)]
struct UploadStartRequest<'a> {
    file: UploadMetadata<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata<'a> {
    display_name: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: StagedFile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}
