//! Console output through `tracing_subscriber::fmt`
//!
//! [`ContextFormat`] is a `FormatEvent` for the fmt layer. Besides the
//! timestamp, level, target and call-site fields it renders the metadata the
//! pipeline's enrichers attached to the event and the emitting thread's
//! shared logging context. The fmt layer must be installed as the output of
//! an [`EnrichmentLayer`](crate::logging_facility::EnrichmentLayer), which
//! publishes the enriched metadata for the duration of the write.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use ctxlog_core_types::schema::{
    FIELD_FIELDS, FIELD_LEVEL, FIELD_MDC, FIELD_MESSAGE, FIELD_METADATA, FIELD_TARGET,
    FIELD_TIMESTAMP,
};
use serde_json::{Map, Value};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, JsonFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::config::AppenderKind;
use crate::event::LogEvent;
use crate::mdc::SharedLoggingContext;

/// Line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

thread_local! {
    static DISPATCHED: RefCell<Option<BTreeMap<String, String>>> = const { RefCell::new(None) };
}

/// Publishes an enriched event's metadata to [`ContextFormat`] until dropped
pub(crate) struct DispatchFrame {
    previous: Option<BTreeMap<String, String>>,
}

impl DispatchFrame {
    pub(crate) fn enter(event: &LogEvent) -> Self {
        let metadata = event.metadata.clone();
        let previous = DISPATCHED
            .try_with(|cell| {
                cell.try_borrow_mut()
                    .ok()
                    .and_then(|mut c| c.replace(metadata))
            })
            .ok()
            .flatten();
        Self { previous }
    }
}

impl Drop for DispatchFrame {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = DISPATCHED.try_with(|cell| {
            if let Ok(mut c) = cell.try_borrow_mut() {
                *c = previous;
            }
        });
    }
}

fn dispatched_metadata() -> BTreeMap<String, String> {
    DISPATCHED
        .try_with(|cell| cell.try_borrow().ok().and_then(|c| c.clone()))
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// `FormatEvent` rendering enrichment metadata and the shared logging context
#[derive(Debug, Clone)]
pub struct ContextFormat {
    format: Format,
    timer: SystemTime,
}

impl ContextFormat {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            timer: SystemTime,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn format_text<S, N>(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        N: for<'a> FormatFields<'a> + 'static,
    {
        let meta = event.metadata();
        self.timer.format_time(&mut writer)?;
        write!(writer, " {:>5} {}: ", meta.level(), meta.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        let metadata = dispatched_metadata();
        if !metadata.is_empty() {
            write!(writer, " {{")?;
            write_pairs(&mut writer, &metadata)?;
            write!(writer, "}}")?;
        }
        let mdc = SharedLoggingContext::snapshot();
        if !mdc.is_empty() {
            write!(writer, " [")?;
            write_pairs(&mut writer, &mdc)?;
            write!(writer, "]")?;
        }
        writeln!(writer)
    }

    fn format_json<S, N>(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        N: for<'a> FormatFields<'a> + 'static,
    {
        let meta = event.metadata();

        let mut timestamp = String::new();
        self.timer.format_time(&mut Writer::new(&mut timestamp))?;

        let mut recorded = String::new();
        ctx.field_format()
            .format_fields(Writer::new(&mut recorded), event)?;
        // JsonFields yields an object; any other field formatter is kept as
        // the message text.
        let mut fields = match serde_json::from_str::<Map<String, Value>>(&recorded) {
            Ok(fields) => fields,
            Err(_) => Map::from_iter([(FIELD_MESSAGE.to_string(), Value::from(recorded))]),
        };
        let message = fields.remove(FIELD_MESSAGE).unwrap_or(Value::Null);

        let mut object = Map::new();
        object.insert(FIELD_TIMESTAMP.into(), Value::from(timestamp));
        object.insert(FIELD_LEVEL.into(), Value::from(meta.level().as_str()));
        object.insert(FIELD_TARGET.into(), Value::from(meta.target()));
        object.insert(FIELD_MESSAGE.into(), message);
        object.insert(FIELD_FIELDS.into(), Value::Object(fields));
        object.insert(FIELD_METADATA.into(), string_map(dispatched_metadata()));
        object.insert(
            FIELD_MDC.into(),
            string_map(SharedLoggingContext::snapshot()),
        );

        let line = serde_json::to_string(&Value::Object(object)).map_err(|_| fmt::Error)?;
        writeln!(writer, "{}", line)
    }
}

impl<S, N> FormatEvent<S, N> for ContextFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        match self.format {
            Format::Text => self.format_text(ctx, writer, event),
            Format::Json => self.format_json(ctx, writer, event),
        }
    }
}

// Values are Debug-quoted so spaces and quotes cannot break the line apart.
fn write_pairs(writer: &mut Writer<'_>, pairs: &BTreeMap<String, String>) -> fmt::Result {
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{}={:?}", key, value)?;
    }
    Ok(())
}

fn string_map(map: BTreeMap<String, String>) -> Value {
    Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

/// fmt layer writing to the configured stream, or `None` for
/// [`AppenderKind::None`]
///
/// `Format::Json` records call-site fields with `JsonFields`, as
/// `tracing_subscriber::fmt().json()` does.
pub fn output_layer<S>(
    format: Format,
    target: AppenderKind,
) -> Option<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = match target {
        AppenderKind::Stdout => BoxMakeWriter::new(std::io::stdout),
        AppenderKind::Stderr => BoxMakeWriter::new(std::io::stderr),
        AppenderKind::None => return None,
    };
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .event_format(ContextFormat::new(format));
    Some(match format {
        Format::Text => layer.boxed(),
        Format::Json => layer.fmt_fields(JsonFields::new()).boxed(),
    })
}
