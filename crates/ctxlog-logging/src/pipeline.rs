//! Enrichment pipeline
//!
//! A [`Pipeline`] owns two ordered lists: enrichers, which mutate the event
//! or the shared logging context, and appenders, which produce output. Every
//! dispatch runs all enrichers before the first appender, whatever order
//! they were registered in.

use std::sync::Arc;

use serde::Deserialize;

use crate::event::LogEvent;
use crate::mdc::SharedLoggingContext;

/// Mutates an event (or ambient logging state) before output
///
/// Implementations must not block, must not panic, and must not emit log
/// events of their own.
pub trait Enricher: Send + Sync {
    /// Stable name used in configuration and diagnostics
    fn name(&self) -> &'static str;

    fn enrich(&self, event: &mut LogEvent);
}

/// Produces output for an enriched event
pub trait Appender: Send + Sync {
    fn append(&self, event: &LogEvent);
}

/// Lifetime of values the extra-fields bridge copies into the shared
/// logging context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// Copied values persist after the event until overwritten or cleared
    #[default]
    Sticky,
    /// The shared logging context is restored after every dispatch.
    ///
    /// This changes observable behavior relative to `Sticky`: code that read
    /// extra fields from the shared context after logging no longer sees
    /// them.
    Scoped,
}

/// Ordered enrichers followed by ordered appenders
pub struct Pipeline {
    enrichers: Vec<Arc<dyn Enricher>>,
    appenders: Vec<Arc<dyn Appender>>,
    share_mode: ShareMode,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn share_mode(&self) -> ShareMode {
        self.share_mode
    }

    pub fn enricher_names(&self) -> Vec<&'static str> {
        self.enrichers.iter().map(|e| e.name()).collect()
    }

    /// Run the enrichers only
    pub fn enrich(&self, event: &mut LogEvent) {
        for enricher in &self.enrichers {
            enricher.enrich(event);
        }
    }

    /// Enrich `event`, then hand it to every appender
    pub fn dispatch(&self, event: LogEvent) {
        self.dispatch_with(event, |_| {});
    }

    /// Like [`dispatch`](Self::dispatch), with `output` run on the enriched
    /// event ahead of the appenders and before a scoped restore
    pub fn dispatch_with(&self, mut event: LogEvent, output: impl FnOnce(&LogEvent)) {
        let saved = match self.share_mode {
            ShareMode::Scoped => Some(SharedLoggingContext::snapshot()),
            ShareMode::Sticky => None,
        };

        self.enrich(&mut event);
        output(&event);
        for appender in &self.appenders {
            appender.append(&event);
        }

        if let Some(saved) = saved {
            SharedLoggingContext::restore(saved);
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("enrichers", &self.enricher_names())
            .field("appenders", &self.appenders.len())
            .field("share_mode", &self.share_mode)
            .finish()
    }
}

/// Builder for [`Pipeline`]
#[derive(Default)]
pub struct PipelineBuilder {
    enrichers: Vec<Arc<dyn Enricher>>,
    appenders: Vec<Arc<dyn Appender>>,
    share_mode: ShareMode,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field(
                "enrichers",
                &self.enrichers.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .field("appenders", &self.appenders.len())
            .field("share_mode", &self.share_mode)
            .finish()
    }
}

impl PipelineBuilder {
    pub fn enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enrichers.push(Arc::new(enricher));
        self
    }

    pub fn appender(mut self, appender: impl Appender + 'static) -> Self {
        self.appenders.push(Arc::new(appender));
        self
    }

    /// Register an appender that is also held elsewhere (e.g. a test capture)
    pub fn shared_appender(mut self, appender: Arc<dyn Appender>) -> Self {
        self.appenders.push(appender);
        self
    }

    pub fn share_mode(mut self, share_mode: ShareMode) -> Self {
        self.share_mode = share_mode;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            enrichers: self.enrichers,
            appenders: self.appenders,
            share_mode: self.share_mode,
        }
    }
}
