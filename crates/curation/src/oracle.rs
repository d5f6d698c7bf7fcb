use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::OracleError;
use crate::lenient::extract_json;
use crate::models::{DiagnosticKind, OracleExchange, Stage};
use crate::state::PipelineState;

/// One retry after the first attempt, then the stage falls back.
const MAX_ATTEMPTS: u32 = 2;

/// A text-completion service that judges articles.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI and compatible endpoints
pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiOracle {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.oracle_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.oracle_timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn try_complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, OracleError> {
        if self.api_key.is_empty() {
            return Err(OracleError::Config("API key is empty".to_string()));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            // gpt-5 models only accept the default temperature
            temperature: if self.model.starts_with("gpt-5") {
                None
            } else {
                Some(0.0)
            },
        };

        debug!(model = %self.model, "Oracle chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| self.transport_error(e))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)
    }

    fn transport_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout)
        } else {
            OracleError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                self.timeout,
                self.try_complete(system_prompt, user_prompt),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(self.timeout)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt < MAX_ATTEMPTS && e.is_retryable() => {
                    // Longer backoff for rate limits
                    let backoff = match &e {
                        OracleError::Api { status: 429, .. } => Duration::from_secs(15),
                        _ => Duration::from_millis(1000),
                    };
                    warn!(error = %e, ?backoff, "Oracle call failed, retrying once");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// The result of asking the oracle for one stage's judgment.
pub(crate) struct Consultation<T> {
    exchange: OracleExchange,
    outcome: std::result::Result<T, (DiagnosticKind, String)>,
}

impl<T> Consultation<T> {
    /// Append the exchange (and any degradation) to the run, handing back the
    /// parsed judgment if there is one.
    pub(crate) fn settle(self, state: &mut PipelineState) -> Option<T> {
        let stage = self.exchange.stage;
        state.exchanges.push(self.exchange);
        match self.outcome {
            Ok(parsed) => Some(parsed),
            Err((kind, detail)) => {
                state.record(stage, kind, detail);
                None
            }
        }
    }
}

pub(crate) async fn consult<T: DeserializeOwned>(
    oracle: &dyn Oracle,
    stage: Stage,
    system_prompt: &str,
    user_prompt: String,
) -> Consultation<T> {
    let result = oracle.complete(system_prompt, &user_prompt).await;

    let mut exchange = OracleExchange {
        stage,
        system_prompt: system_prompt.to_string(),
        user_prompt,
        response: None,
        error: None,
    };

    let outcome = match result {
        Ok(text) => {
            let parsed = extract_json::<T>(&text)
                .map_err(|e| (DiagnosticKind::MalformedResponse, e.to_string()));
            exchange.response = Some(text);
            parsed
        }
        Err(e) => {
            exchange.error = Some(e.to_string());
            Err((DiagnosticKind::OracleUnavailable, e.to_string()))
        }
    };

    Consultation { exchange, outcome }
}
