//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility.

use std::sync::Once;

use ctxlog_errors::Result;
use serde::Deserialize;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{AppenderKind, LoggingConfig};
use crate::format::{output_layer, Format};
use crate::logging_facility::layer::EnrichmentLayer;
use crate::pipeline::{Pipeline, PipelineBuilder};

type Filtered = Layered<EnvFilter, Registry>;
type Output = Option<Box<dyn Layer<Filtered> + Send + Sync>>;

/// Logging profile configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human-readable output for development
    #[default]
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    /// Filter used when neither `RUST_LOG` nor the configuration sets one
    pub fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Production => "info",
            Profile::Test => "trace",
        }
    }

    /// Console line format under this profile
    pub fn format(&self) -> Format {
        match self {
            Profile::Production => Format::Json,
            Profile::Development | Profile::Test => Format::Text,
        }
    }

    /// Console stream `init` writes to; the test profile stays silent
    pub fn default_appender(&self) -> AppenderKind {
        match self {
            Profile::Development | Profile::Production => AppenderKind::Stdout,
            Profile::Test => AppenderKind::None,
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// This function should be called once at application startup, after the
/// context sources have been bound. It installs a global subscriber that
/// feeds every `tracing` event through `pipeline` and renders it with a
/// `tracing_subscriber::fmt` layer. Later calls are ignored.
///
/// # Profiles
///
/// - **Development**: human-readable lines on stdout, debug level by default
/// - **Production**: JSON lines on stdout, info level by default
/// - **Test**: no console output (use the pipeline's appenders), trace level
///
/// `RUST_LOG` overrides the profile's level.
pub fn init(profile: Profile, pipeline: Pipeline) {
    let output = output_layer(profile.format(), profile.default_appender());
    install(profile.default_filter(), output, pipeline);
}

/// Build the pipeline described by `config` and initialize the facility
///
/// # Errors
///
/// Returns a configuration error if the config names an enricher whose
/// context source has not been bound.
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    let pipeline = PipelineBuilder::from_config(config)?.build();
    let output = output_layer(config.profile.format(), config.appender);
    install(config.effective_filter(), output, pipeline);
    Ok(())
}

fn install(fallback_filter: &str, output: Output, pipeline: Pipeline) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(fallback_filter));
        // A subscriber installed by the host application wins.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(EnrichmentLayer::new(pipeline).with_output(output))
            .try_init();
    });
}
