//! Extra-field context and its log bridge
//!
//! Application code binds a mapping of extra fields around a unit of work
//! with [`ExtraFieldsCell::with_fields`]. On every event
//! [`ExtraFieldsBridge`] copies the non-null entries into the thread's
//! [`SharedLoggingContext`].
//!
//! Inside [`ExtraFieldsCell::with_fields_async`] the mapping lives in a cell
//! owned by the task; `set`, `clear` and `with_fields` called in that task
//! operate on it, so nested scopes keep merging across `.await` points.
//!
//! # Sticky values
//!
//! Copied entries are NOT removed when the event has been written, nor when
//! the `with_fields` scope ends. They stay in the shared logging context
//! until a later event overwrites them or something calls
//! [`SharedLoggingContext::clear`] / [`SharedLoggingContext::remove`].
//! Appenders on the same thread will keep rendering a field after its scope
//! is gone. Use [`ShareMode::Scoped`](crate::pipeline::ShareMode::Scoped)
//! to have the pipeline restore the shared context after each dispatch.

use std::cell::RefCell;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use ctxlog_core_types::schema::ENRICHER_EXTRA_FIELDS;
use ctxlog_core_types::{field_name, field_value_string, ExtraFields};
use ctxlog_errors::{ContextName, CtxLogError, ReadAnomaly, Result};

use crate::event::LogEvent;
use crate::mdc::SharedLoggingContext;
use crate::pipeline::Enricher;

/// Anything able to report the current extra-field mapping
pub trait ExtraFieldsSource: Send + Sync {
    /// `Ok(None)` when no mapping is bound in the current scope
    fn read(&self) -> std::result::Result<Option<ExtraFields>, ReadAnomaly>;
}

thread_local! {
    static CURRENT: RefCell<Option<ExtraFields>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_EXTRA_FIELDS: RefCell<Option<ExtraFields>>;
}

fn with_active_cell<R>(f: impl FnOnce(&RefCell<Option<ExtraFields>>) -> R) -> Option<R> {
    if TASK_EXTRA_FIELDS.try_with(|_| ()).is_ok() {
        TASK_EXTRA_FIELDS.try_with(f).ok()
    } else {
        CURRENT.try_with(f).ok()
    }
}

/// The built-in extra-field source: a thread-local mapping, replaced by a
/// task-local one inside task scopes
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtraFieldsCell;

impl ExtraFieldsCell {
    /// Replace the active mapping, returning the previous one
    pub fn set(fields: ExtraFields) -> Option<ExtraFields> {
        with_active_cell(|cell| {
            cell.try_borrow_mut()
                .ok()
                .and_then(|mut c| c.replace(fields))
        })
        .flatten()
    }

    /// Unbind the active mapping, returning it
    pub fn clear() -> Option<ExtraFields> {
        with_active_cell(|cell| cell.try_borrow_mut().ok().and_then(|mut c| c.take())).flatten()
    }

    /// Current mapping as seen by the bridge, if any
    pub fn get() -> Option<ExtraFields> {
        ExtraFieldsCell.read().ok().flatten()
    }

    /// Run `f` with `fields` merged over the current mapping
    ///
    /// Inner keys win over outer ones. The previous mapping is restored on
    /// exit; values already copied into the shared logging context are not.
    pub fn with_fields<R>(fields: ExtraFields, f: impl FnOnce() -> R) -> R {
        let merged = merge(Self::get(), fields);
        let _guard = ScopeGuard {
            previous: Self::set(merged),
        };
        f()
    }

    /// Run `fut` with `fields` merged over the current mapping, bound for
    /// the current task
    pub async fn with_fields_async<F: Future>(fields: ExtraFields, fut: F) -> F::Output {
        let merged = merge(Self::get(), fields);
        TASK_EXTRA_FIELDS
            .scope(RefCell::new(Some(merged)), fut)
            .await
    }
}

fn merge(outer: Option<ExtraFields>, inner: ExtraFields) -> ExtraFields {
    let mut merged = outer.unwrap_or_default();
    merged.extend(inner);
    merged
}

impl ExtraFieldsSource for ExtraFieldsCell {
    fn read(&self) -> std::result::Result<Option<ExtraFields>, ReadAnomaly> {
        with_active_cell(|cell| {
            cell.try_borrow()
                .map(|c| c.clone())
                .map_err(|_| ReadAnomaly::Busy)
        })
        .unwrap_or(Err(ReadAnomaly::Destroyed))
    }
}

struct ScopeGuard {
    previous: Option<ExtraFields>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        with_active_cell(|cell| {
            if let Ok(mut c) = cell.try_borrow_mut() {
                *c = previous;
            }
        });
    }
}

static SOURCE: OnceLock<Arc<dyn ExtraFieldsSource>> = OnceLock::new();

/// Bind the process-wide extra-field source
///
/// Must be called exactly once during initialization.
///
/// # Errors
///
/// Returns `AlreadyBound` if a source was bound before.
pub fn setup(source: impl ExtraFieldsSource + 'static) -> Result<()> {
    SOURCE
        .set(Arc::new(source))
        .map_err(|_| CtxLogError::AlreadyBound {
            context: ContextName::ExtraFields,
        })?;
    tracing::debug!(
        component = module_path!(),
        op = "setup",
        context = "extra-fields",
        "context source bound"
    );
    Ok(())
}

/// The source bound by [`setup`]
///
/// # Errors
///
/// Returns `NotBound` before setup.
pub fn bound_source() -> Result<Arc<dyn ExtraFieldsSource>> {
    SOURCE.get().cloned().ok_or(CtxLogError::NotBound {
        context: ContextName::ExtraFields,
    })
}

/// Current extra-field mapping as bound by the global source
///
/// # Errors
///
/// Returns `NotBound` before setup.
pub fn current_extra_fields() -> Result<Option<ExtraFields>> {
    Ok(bound_source()?.read().ok().flatten())
}

/// Copies the current extra fields into the shared logging context
///
/// Never touches the event itself. See the module docs for the sticky-value
/// hazard this implies.
#[derive(Clone)]
pub struct ExtraFieldsBridge {
    source: Arc<dyn ExtraFieldsSource>,
}

impl ExtraFieldsBridge {
    pub fn new(source: impl ExtraFieldsSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_source(source: Arc<dyn ExtraFieldsSource>) -> Self {
        Self { source }
    }

    /// Bridge reading the source bound by [`setup`]
    ///
    /// # Errors
    ///
    /// Returns `NotBound` before setup.
    pub fn from_global() -> Result<Self> {
        bound_source().map(Self::from_source)
    }

    /// Copy every non-null entry of the current mapping into the shared
    /// logging context
    pub fn apply(&self) {
        let fields = match self.source.read() {
            Ok(Some(fields)) if !fields.is_empty() => fields,
            _ => return,
        };

        for (key, value) in &fields {
            let Some(value) = field_value_string(value) else {
                continue;
            };
            let name = field_name(key);
            if name.is_empty() {
                continue;
            }
            SharedLoggingContext::put(name, value);
        }
    }
}

impl Enricher for ExtraFieldsBridge {
    fn name(&self) -> &'static str {
        ENRICHER_EXTRA_FIELDS
    }

    fn enrich(&self, _event: &mut LogEvent) {
        self.apply();
    }
}

impl std::fmt::Debug for ExtraFieldsBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtraFieldsBridge").finish_non_exhaustive()
    }
}
