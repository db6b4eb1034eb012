use crate::error::IngestError;
use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::Document;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

/// Native text extraction. Fails when the PDF has no embedded text layer,
/// which is what routes scanned documents to the OCR fallback.
#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}

/// Extracts page texts natively, falling back to the remote OCR endpoint
/// when the PDF carries no text layer. Without an endpoint configured the
/// native parse error stands.
pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    match LopdfExtractor.extract_pages(path) {
        Ok(pages) => Ok(pages),
        Err(IngestError::PdfParse(parse_error)) => match RemoteOcrClient::from_env() {
            Some(ocr) => match ocr.extract(path) {
                Ok(pages) => Ok(pages),
                Err(ocr_error) => Err(IngestError::PdfParse(format!(
                    "{parse_error}; OCR fallback failed: {ocr_error}"
                ))),
            },
            None => Err(IngestError::PdfParse(parse_error)),
        },
        Err(error) => Err(error),
    }
}

#[derive(Debug, Clone, Serialize)]
struct OcrRequest {
    pdf_base64: String,
    source_path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrResponse {
    pages: Option<Vec<OcrPage>>,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OcrPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: Option<String>,
}

/// Client for a remote OCR service that accepts a base64 PDF and returns
/// either a page list or one form-feed-joined text blob.
pub struct RemoteOcrClient {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl RemoteOcrClient {
    /// Reads `OCR_ENDPOINT` and optional `OCR_API_KEY`; `None` when no
    /// endpoint is configured.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("OCR_ENDPOINT").ok()?.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let api_key = std::env::var("OCR_API_KEY").ok().and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        Some(Self {
            endpoint,
            api_key,
            client: Client::new(),
        })
    }

    pub fn extract(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        tokio::task::block_in_place(|| self.extract_blocking(path))
    }

    fn extract_blocking(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let pdf = std::fs::read(path).map_err(IngestError::Io)?;
        let payload = OcrRequest {
            pdf_base64: STANDARD.encode(pdf),
            source_path: path.to_string_lossy().to_string(),
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;

        if !response.status().is_success() {
            return Err(IngestError::OcrFailed(format!(
                "OCR request to {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: OcrResponse = response.json()?;
        response_pages(&payload, path)
    }
}

fn response_pages(payload: &OcrResponse, path: &Path) -> Result<Vec<PageText>, IngestError> {
    if let Some(listed) = &payload.pages {
        let listed = listed
            .iter()
            .filter_map(|page| {
                let text = page.text.as_ref().map(|value| value.trim().to_string())?;
                if text.is_empty() {
                    None
                } else {
                    Some(PageText {
                        number: page.page.unwrap_or(1),
                        text,
                    })
                }
            })
            .collect::<Vec<_>>();

        if !listed.is_empty() {
            return Ok(listed);
        }
    }

    if let Some(raw_text) = &payload.text {
        let pages = raw_text
            .split('\u{000c}')
            .enumerate()
            .filter_map(|(index, chunk)| {
                let normalized = chunk.trim().to_string();
                if normalized.is_empty() {
                    None
                } else {
                    Some(PageText {
                        number: (index + 1) as u32,
                        text: normalized,
                    })
                }
            })
            .collect::<Vec<_>>();

        if !pages.is_empty() {
            return Ok(pages);
        }
    }

    Err(IngestError::OcrFailed(format!(
        "OCR response had no readable text for {}",
        path.display()
    )))
}
