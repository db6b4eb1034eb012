use crate::error::PipelineError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Characters of document context packed into the prompt before
/// truncation.
const CONTEXT_BUDGET_CHARS: usize = 1_000;

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Client for a generative completion endpoint, used to answer questions
/// grounded in the caller's stored document texts. The endpoint is opaque:
/// one prompt in, one text out.
pub struct CompletionClient {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl CompletionClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            client: Client::new(),
        }
    }

    pub async fn ask(
        &self,
        context: &BTreeMap<String, String>,
        question: &str,
    ) -> Result<String, PipelineError> {
        let prompt = build_prompt(context, question);

        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(PipelineError::Completion(format!(
                "completion endpoint {} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload: CompletionResponse = response.json().await?;
        match payload.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(PipelineError::Completion(
                "completion response had no text".to_string(),
            )),
        }
    }
}

fn build_prompt(context: &BTreeMap<String, String>, question: &str) -> String {
    let mut joined = context
        .values()
        .map(|text| text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if joined.chars().count() > CONTEXT_BUDGET_CHARS {
        joined = joined.chars().take(CONTEXT_BUDGET_CHARS).collect();
        joined.push_str("...");
    }

    format!(
        "Context: {joined}\n\nUser Question: {question}\n\nPlease provide a helpful response based on the context above."
    )
}
