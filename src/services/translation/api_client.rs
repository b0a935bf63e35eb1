// HTTP client for DeepLX-style batch translation endpoints

use super::Translator;
use crate::core::config::TranslationConfig;
use crate::core::errors::{TranslationError, TranslationResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Header carrying the optional access token
const TOKEN_HEADER: &str = "token";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a [String],
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Option<Vec<TranslationItem>>,
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    text: String,
}

pub struct HttpTranslator {
    http_client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    source_lang: String,
    target_lang: String,
}

impl HttpTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        info!(
            "Translation backend: {} ({} → {})",
            config.endpoint, config.source_lang, config.target_lang
        );

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
        })
    }

    fn parse_response(body: &str, expected: usize) -> TranslationResult<Vec<String>> {
        let response: TranslateResponse = serde_json::from_str(body)
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        let translations = response.translations.ok_or_else(|| {
            TranslationError::InvalidResponse("missing `translations` field".to_string())
        })?;

        if translations.len() != expected {
            return Err(TranslationError::CountMismatch {
                expected,
                actual: translations.len(),
            });
        }

        Ok(translations.into_iter().map(|t| t.text).collect())
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate_batch(&self, texts: &[String]) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = TranslateRequest {
            text: texts,
            source_lang: &self.source_lang,
            target_lang: &self.target_lang,
        };

        let start = Instant::now();
        let mut builder = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranslationError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let translations = Self::parse_response(&body, texts.len())?;
        debug!(
            "Translated {} texts in {:.2}ms",
            translations.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(translations)
    }
}
