//! Cache-through answer evaluation
//!
//! hash the request → cache hit returns the stored result; a miss runs the
//! scorer and stores the result. Cache failures (including timeouts) are
//! logged and treated as a miss or a skipped write, so evaluation always
//! produces a result.

use exam_core::cache::compute_key;
use exam_core::models::{ScoringInput, ScoringResult};
use exam_core::scorer;
use serde::Serialize;

use crate::services::AppServices;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub result: ScoringResult,
    pub from_cache: bool,
}

pub async fn evaluate(services: &AppServices, input: &ScoringInput) -> Evaluation {
    let key = match compute_key(input) {
        Ok(k) => k,
        Err(e) => {
            tracing::warn!("Cache key computation failed, scoring without cache: {}", e);
            return Evaluation {
                result: scorer::score(input),
                from_cache: false,
            };
        }
    };

    match services.bounded(services.cache.get(&key)).await {
        Ok(Some(entry)) => {
            tracing::debug!("Evaluation cache hit: {}", key);
            return Evaluation {
                result: entry.response,
                from_cache: true,
            };
        }
        Ok(None) => tracing::debug!("Evaluation cache miss: {}", key),
        Err(e) => tracing::warn!(
            "Cache lookup failed on {} backend (treating as miss): {}",
            services.cache.name(),
            e
        ),
    }

    let result = scorer::score(input);

    match serde_json::to_value(input) {
        Ok(payload) => {
            if let Err(e) = services
                .bounded(services.cache.put(&key, payload, &result))
                .await
            {
                tracing::warn!("Cache write failed (non-fatal): {}", e);
            }
        }
        Err(e) => tracing::warn!("Failed to serialize evaluation payload: {}", e),
    }

    Evaluation {
        result,
        from_cache: false,
    }
}
