//! `tracing` integration
//!
//! [`EnrichmentLayer`] runs synchronously on the thread that emitted the
//! event, so thread-local and task-local context cells are visible to the
//! bridges. An optional output layer (normally a `tracing_subscriber::fmt`
//! layer using [`ContextFormat`](crate::format::ContextFormat)) sees each
//! event after enrichment and before a scoped share mode restores the shared
//! logging context.

use std::sync::Arc;

use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Identity};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::event::LogEvent;
use crate::format::DispatchFrame;
use crate::pipeline::Pipeline;

/// Layer that feeds every `tracing` event through a [`Pipeline`]
pub struct EnrichmentLayer<L = Identity> {
    pipeline: Arc<Pipeline>,
    output: L,
}

impl EnrichmentLayer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            output: Identity::new(),
        }
    }
}

impl<L> EnrichmentLayer<L> {
    /// Render enriched events through `output`
    pub fn with_output<O>(self, output: O) -> EnrichmentLayer<O> {
        EnrichmentLayer {
            pipeline: self.pipeline,
            output,
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl<S, L> Layer<S> for EnrichmentLayer<L>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    L: Layer<S>,
{
    fn on_layer(&mut self, subscriber: &mut S) {
        self.output.on_layer(subscriber);
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        self.output.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, span: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        self.output.on_record(span, values, ctx);
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        self.output.on_enter(id, ctx);
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        self.output.on_exit(id, ctx);
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        self.output.on_close(id, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.pipeline
            .dispatch_with(LogEvent::from_tracing(event), |enriched| {
                let _frame = DispatchFrame::enter(enriched);
                self.output.on_event(event, ctx);
            });
    }
}

impl<L> std::fmt::Debug for EnrichmentLayer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentLayer")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{CorrelationCell, CorrelationContextBridge};
    use crate::logging_facility::test_capture::CaptureAppender;
    use ctxlog_core_types::schema::FIELD_CORRELATION_ID;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_layer_enriches_tracing_events() {
        let (appender, capture) = CaptureAppender::new();
        let pipeline = Pipeline::builder()
            .enricher(CorrelationContextBridge::new(CorrelationCell))
            .appender(appender)
            .build();
        let subscriber = tracing_subscriber::registry().with(EnrichmentLayer::new(pipeline));

        tracing::subscriber::with_default(subscriber, || {
            CorrelationCell::scope("layer-1", || {
                tracing::info!(order_id = 7, "order placed");
            });
        });

        let events = capture.events();
        assert_eq!(events.len(), 1);
        let captured = &events[0].event;
        assert_eq!(captured.message, "order placed");
        assert_eq!(captured.fields.get("order_id"), Some(&"7".to_string()));
        assert_eq!(captured.metadata_value(FIELD_CORRELATION_ID), Some("layer-1"));
    }
}
