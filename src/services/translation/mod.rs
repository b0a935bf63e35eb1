// Batch translation with identity fallback

pub mod api_client;

use crate::core::cancel::CancellationToken;
use crate::core::errors::{TranslationError, TranslationResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub use api_client::HttpTranslator;

/// Remote batch translator. Output order matches input order.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_batch(&self, texts: &[String]) -> TranslationResult<Vec<String>>;
}

/// Translate every non-empty text in one batch request.
///
/// The result is indexed like `texts`: `None` for empty input text, otherwise
/// the translation, or the original text when the batch failed. Returns `None`
/// when cancelled before the response arrived.
#[instrument(skip(translator, texts, cancel), fields(texts = texts.len()))]
pub async fn translate_with_fallback(
    translator: &Arc<dyn Translator>,
    texts: &[String],
    cancel: &CancellationToken,
) -> Option<Vec<Option<String>>> {
    let submitted: Vec<String> = texts.iter().filter(|t| !t.is_empty()).cloned().collect();
    if submitted.is_empty() {
        return Some(vec![None; texts.len()]);
    }

    let result = tokio::select! {
        result = translator.translate_batch(&submitted) => result,
        _ = cancel.cancelled() => {
            debug!("Translation cancelled with {} texts in flight", submitted.len());
            return None;
        }
    };

    let translated = match result.and_then(|translated| {
        if translated.len() == submitted.len() {
            Ok(translated)
        } else {
            Err(TranslationError::CountMismatch {
                expected: submitted.len(),
                actual: translated.len(),
            })
        }
    }) {
        Ok(translated) => {
            debug!("Translated {} texts", translated.len());
            translated
        }
        Err(e) => {
            warn!("Translation failed, keeping source text: {}", e);
            submitted
        }
    };

    Some(reattach_translations(texts, translated))
}

/// Put translations of the non-empty `texts` back at their original positions
pub fn reattach_translations(texts: &[String], translated: Vec<String>) -> Vec<Option<String>> {
    let mut translated = translated.into_iter();
    texts
        .iter()
        .map(|text| {
            if text.is_empty() {
                None
            } else {
                translated.next()
            }
        })
        .collect()
}
