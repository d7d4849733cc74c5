//! Delegated extraction with a rule-based safety net.
//!
//! A failed, timed-out or empty delegated result never fails the turn; the
//! rule extractor's result is used instead.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use rentwise_core::SlotSet;
use rentwise_core::error::ExtractionError;

use super::{ExtractionInput, SlotExtractor};

pub struct FallbackExtractor {
    name: String,
    primary: Arc<dyn SlotExtractor>,
    fallback: Arc<dyn SlotExtractor>,
}

impl FallbackExtractor {
    pub fn new(primary: Arc<dyn SlotExtractor>, fallback: Arc<dyn SlotExtractor>) -> Self {
        Self {
            name: format!("{}+{}", primary.name(), fallback.name()),
            primary,
            fallback,
        }
    }
}

#[async_trait]
impl SlotExtractor for FallbackExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, input: &ExtractionInput<'_>) -> Result<SlotSet, ExtractionError> {
        match self.primary.extract(input).await {
            Ok(slots) if !slots.is_empty() => return Ok(slots),
            Ok(_) => debug!(
                primary = self.primary.name(),
                "Primary extractor found nothing, trying fallback"
            ),
            Err(e) => warn!(
                primary = self.primary.name(),
                fallback = self.fallback.name(),
                error = %e,
                "Primary extractor failed, falling back"
            ),
        }
        self.fallback.extract(input).await
    }
}
