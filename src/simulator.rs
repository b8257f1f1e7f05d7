//! Callback normalization and scheduling for served events.

use crate::config::{Callback, CallbackConfig, ServedEvent};
use crate::dispatch::HttpDispatcher;
use crate::keyword;
use crate::placeholder::{LookupDocument, PlaceholderEngine};
use crate::scheduler::DelayScheduler;
use crate::store::CallbackHandle;
use anyhow::Context;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

/// Schedules delayed HTTP callbacks for served request/response exchanges.
///
/// For every callback of a served event: resolve the placeholders in its
/// payload and URL against the event's lookup document, persist the
/// normalized definition to disk, and hand it to the delay scheduler.
pub struct CallbackSimulator {
    engine: PlaceholderEngine,
    scheduler: DelayScheduler,
}

impl CallbackSimulator {
    /// Create a simulator with the default scheduler and dispatcher.
    pub fn new() -> Self {
        Self::with_scheduler(DelayScheduler::new(HttpDispatcher::new()))
    }

    /// Create a simulator on top of a custom scheduler.
    pub fn with_scheduler(scheduler: DelayScheduler) -> Self {
        Self {
            engine: PlaceholderEngine::new(),
            scheduler,
        }
    }

    /// Normalize, persist, and schedule every callback of a served event.
    ///
    /// Failures are logged and isolated per callback; siblings proceed.
    /// Returns how many callbacks were scheduled.
    pub fn apply(&self, event: &ServedEvent, config: &CallbackConfig) -> usize {
        let document = LookupDocument::for_served_event(event);
        let mut scheduled = 0;
        for callback in &config.callbacks {
            match self.normalize_and_persist(&document, callback) {
                Ok(handle) => {
                    info!(
                        url = %callback.url,
                        delay_ms = callback.delay_ms,
                        "scheduling callback"
                    );
                    self.scheduler
                        .schedule(handle, Duration::from_millis(callback.delay_ms));
                    scheduled += 1;
                }
                Err(err) => {
                    error!(url = %callback.url, error = %err, "skipping callback");
                }
            }
        }
        scheduled
    }

    fn normalize_and_persist(
        &self,
        document: &LookupDocument,
        callback: &Callback,
    ) -> anyhow::Result<CallbackHandle> {
        let normalized = self.normalize(document, callback)?;
        CallbackHandle::persist(&normalized)
    }

    /// Resolve the payload and URL against the lookup document and ensure a
    /// trace identifier is present.
    pub(crate) fn normalize(
        &self,
        document: &LookupDocument,
        callback: &Callback,
    ) -> anyhow::Result<Callback> {
        let mut normalized = callback.clone();

        let template =
            serde_json::to_string(&callback.data).context("serializing callback payload")?;
        let transformed = self.engine.transform(Some(document), &template)?;
        normalized.data = serde_json::from_str(&transformed)
            .with_context(|| format!("substituted payload is not valid JSON: {transformed}"))?;

        if self.engine.is_placeholder(&callback.url) {
            normalized.url = self.resolve_url(document, &callback.url)?;
        }

        if normalized.trace_id.is_none() {
            normalized.trace_id = Some(keyword::random_uuid().replace('-', ""));
        }

        debug!(url = %normalized.url, "normalized callback");
        Ok(normalized)
    }

    /// The URL is one placeholder expression, not a scanned template.
    fn resolve_url(&self, document: &LookupDocument, url: &str) -> anyhow::Result<String> {
        let patterns = self.engine.find_placeholders(url);
        let pattern = patterns
            .first()
            .ok_or_else(|| anyhow::anyhow!("no placeholder in url '{url}'"))?;
        let value = self.engine.resolve(pattern, Some(document))?;
        let substitute = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(url.replace(pattern.as_str(), &substitute))
    }
}

impl Default for CallbackSimulator {
    fn default() -> Self {
        Self::new()
    }
}
