//! Logging configuration
//!
//! A TOML document selects the profile, the level filter, the share mode,
//! the enrichers (in order) and the console stream:
//!
//! ```toml
//! profile = "production"
//! filter = "info,orders=debug"
//! share_mode = "sticky"
//! enrichers = ["correlation-id", "extra-fields"]
//! appender = "stdout"
//! ```
//!
//! Every key is optional; the defaults are shown by [`LoggingConfig::default`].

use std::collections::HashSet;

use ctxlog_errors::{CtxLogError, Result};
use serde::Deserialize;

use crate::correlation::CorrelationContextBridge;
use crate::extra_fields::ExtraFieldsBridge;
use crate::logging_facility::init::Profile;
use crate::pipeline::{PipelineBuilder, ShareMode};

/// Enrichers that can be named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnricherKind {
    CorrelationId,
    ExtraFields,
}

/// Console stream the fmt output layer writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppenderKind {
    #[default]
    Stdout,
    Stderr,
    /// No console output; only the pipeline's own appenders run
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
    /// `EnvFilter` directives; `RUST_LOG` still takes precedence
    pub filter: Option<String>,
    pub share_mode: ShareMode,
    pub enrichers: Vec<EnricherKind>,
    pub appender: AppenderKind,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            filter: None,
            share_mode: ShareMode::default(),
            enrichers: vec![EnricherKind::CorrelationId, EnricherKind::ExtraFields],
            appender: AppenderKind::default(),
        }
    }
}

impl LoggingConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed TOML, unknown keys or values,
    /// and duplicate enrichers.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| CtxLogError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` when an enricher is listed twice.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for kind in &self.enrichers {
            if !seen.insert(kind) {
                return Err(CtxLogError::invalid_config(format!(
                    "enricher {:?} listed more than once",
                    kind
                )));
            }
        }
        Ok(())
    }

    /// Configured filter, or the profile's default
    pub fn effective_filter(&self) -> &str {
        self.filter
            .as_deref()
            .unwrap_or_else(|| self.profile.default_filter())
    }
}

impl PipelineBuilder {
    /// Builder populated from `config`, using the process-wide context
    /// sources
    ///
    /// Console output is not part of the pipeline; `init_from_config`
    /// installs it as a fmt layer according to `config.appender`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the config does not validate, and
    /// `NotBound` if a listed enricher's source was never set up.
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = PipelineBuilder::default().share_mode(config.share_mode);
        for kind in &config.enrichers {
            builder = match kind {
                EnricherKind::CorrelationId => {
                    builder.enricher(CorrelationContextBridge::from_global()?)
                }
                EnricherKind::ExtraFields => builder.enricher(ExtraFieldsBridge::from_global()?),
            };
        }
        Ok(builder)
    }
}
