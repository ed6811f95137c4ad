//! Correlation id context and its log bridge
//!
//! The current correlation id lives in a per-thread cell. Inside
//! [`CorrelationCell::scope_async`] a task-local cell takes over: every
//! `set`, `clear`, `scope` and read in that task goes to the task's cell, so
//! the binding survives `.await` points and the innermost binding wins.
//! [`CorrelationContextBridge`] reads it on every event and writes it into
//! the event metadata under `correlation-id`.
//!
//! An unset cell yields the empty string. A cell that cannot be read at
//! event time (re-entrant borrow, thread teardown) also yields the empty
//! string; enrichment never fails an emit.

use std::cell::RefCell;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use ctxlog_core_types::schema::{
    DEFAULT_CORRELATION_ID, ENRICHER_CORRELATION_ID, FIELD_CORRELATION_ID,
};
use ctxlog_core_types::CorrelationId;
use ctxlog_errors::{ContextName, CtxLogError, ReadAnomaly, Result};

use crate::event::LogEvent;
use crate::pipeline::Enricher;

/// Anything able to report the current correlation id
pub trait CorrelationSource: Send + Sync {
    /// `Ok(None)` when no id is bound in the current scope
    fn read(&self) -> std::result::Result<Option<CorrelationId>, ReadAnomaly>;
}

thread_local! {
    static CURRENT: RefCell<Option<CorrelationId>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_CORRELATION_ID: RefCell<Option<CorrelationId>>;
}

/// The task's cell inside a task scope, the thread's otherwise
fn with_active_cell<R>(f: impl FnOnce(&RefCell<Option<CorrelationId>>) -> R) -> Option<R> {
    if TASK_CORRELATION_ID.try_with(|_| ()).is_ok() {
        TASK_CORRELATION_ID.try_with(f).ok()
    } else {
        CURRENT.try_with(f).ok()
    }
}

/// The built-in correlation source: a thread-local cell, replaced by a
/// task-local one inside task scopes
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationCell;

impl CorrelationCell {
    /// Bind `id` in the active cell, returning the previous value
    pub fn set(id: impl Into<CorrelationId>) -> Option<CorrelationId> {
        let id = id.into();
        with_active_cell(|cell| cell.try_borrow_mut().ok().and_then(|mut c| c.replace(id)))
            .flatten()
    }

    /// Unbind the active cell's id, returning it
    pub fn clear() -> Option<CorrelationId> {
        with_active_cell(|cell| cell.try_borrow_mut().ok().and_then(|mut c| c.take())).flatten()
    }

    /// Current id as seen by the bridge, if any
    pub fn get() -> Option<CorrelationId> {
        CorrelationCell.read().ok().flatten()
    }

    /// Run `f` with `id` bound in the active cell; the previous binding is
    /// restored on exit, including on unwind.
    pub fn scope<R>(id: impl Into<CorrelationId>, f: impl FnOnce() -> R) -> R {
        let _guard = ScopeGuard {
            previous: Self::set(id),
        };
        f()
    }

    /// Run `fut` with `id` bound in a fresh cell owned by the current task
    ///
    /// The thread binding is neither read nor written for the duration of
    /// `fut`, on whichever worker thread polls it.
    pub async fn scope_async<F: Future>(id: impl Into<CorrelationId>, fut: F) -> F::Output {
        TASK_CORRELATION_ID
            .scope(RefCell::new(Some(id.into())), fut)
            .await
    }
}

impl CorrelationSource for CorrelationCell {
    fn read(&self) -> std::result::Result<Option<CorrelationId>, ReadAnomaly> {
        with_active_cell(|cell| {
            cell.try_borrow()
                .map(|c| c.clone())
                .map_err(|_| ReadAnomaly::Busy)
        })
        .unwrap_or(Err(ReadAnomaly::Destroyed))
    }
}

struct ScopeGuard {
    previous: Option<CorrelationId>,
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

static SOURCE: OnceLock<Arc<dyn CorrelationSource>> = OnceLock::new();

/// Bind the process-wide correlation source
///
/// Must be called exactly once during initialization.
///
/// # Errors
///
/// Returns `AlreadyBound` if a source was bound before.
pub fn setup(source: impl CorrelationSource + 'static) -> Result<()> {
    SOURCE
        .set(Arc::new(source))
        .map_err(|_| CtxLogError::AlreadyBound {
            context: ContextName::Correlation,
        })?;
    tracing::debug!(
        component = module_path!(),
        op = "setup",
        context = "correlation",
        "context source bound"
    );
    Ok(())
}

/// The source bound by [`setup`]
///
/// # Errors
///
/// Returns `NotBound` before setup.
pub fn bound_source() -> Result<Arc<dyn CorrelationSource>> {
    SOURCE.get().cloned().ok_or(CtxLogError::NotBound {
        context: ContextName::Correlation,
    })
}

/// Current correlation id for use outside the logging path
///
/// Yields the empty string when no id is bound in the current scope.
///
/// # Errors
///
/// Returns `NotBound` before setup.
pub fn current_correlation_id() -> Result<String> {
    let source = bound_source()?;
    Ok(resolve(source.as_ref()).into_string())
}

fn resolve(source: &dyn CorrelationSource) -> CorrelationId {
    match source.read() {
        Ok(Some(id)) => id,
        Ok(None) | Err(_) => CorrelationId::new(DEFAULT_CORRELATION_ID),
    }
}

/// Writes the current correlation id into every event's metadata
#[derive(Clone)]
pub struct CorrelationContextBridge {
    source: Arc<dyn CorrelationSource>,
}

impl CorrelationContextBridge {
    pub fn new(source: impl CorrelationSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_source(source: Arc<dyn CorrelationSource>) -> Self {
        Self { source }
    }

    /// Bridge reading the source bound by [`setup`]
    ///
    /// # Errors
    ///
    /// Returns `NotBound` before setup, so a misconfigured process fails at
    /// startup instead of logging empty ids.
    pub fn from_global() -> Result<Self> {
        bound_source().map(Self::from_source)
    }

    /// Id this bridge would write right now
    pub fn current(&self) -> CorrelationId {
        resolve(self.source.as_ref())
    }
}

impl Enricher for CorrelationContextBridge {
    fn name(&self) -> &'static str {
        ENRICHER_CORRELATION_ID
    }

    fn enrich(&self, event: &mut LogEvent) {
        event.insert_metadata(FIELD_CORRELATION_ID, self.current().into_string());
    }
}

impl std::fmt::Debug for CorrelationContextBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationContextBridge").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    struct Broken;

    impl CorrelationSource for Broken {
        fn read(&self) -> std::result::Result<Option<CorrelationId>, ReadAnomaly> {
            Err(ReadAnomaly::Busy)
        }
    }

    fn enrich_one(bridge: &CorrelationContextBridge) -> LogEvent {
        let mut event = LogEvent::new(Level::INFO, "test", "msg");
        bridge.enrich(&mut event);
        event
    }

    #[test]
    fn test_scope_binds_and_restores() {
        CorrelationCell::clear();
        assert_eq!(CorrelationCell::get(), None);

        CorrelationCell::scope("outer", || {
            assert_eq!(CorrelationCell::get(), Some("outer".into()));
            CorrelationCell::scope("inner", || {
                assert_eq!(CorrelationCell::get(), Some("inner".into()));
            });
            assert_eq!(CorrelationCell::get(), Some("outer".into()));
        });

        assert_eq!(CorrelationCell::get(), None);
    }

    #[test]
    fn test_scope_restores_after_panic() {
        CorrelationCell::clear();
        let result = std::panic::catch_unwind(|| {
            CorrelationCell::scope("doomed", || panic!("boom"));
        });
        assert!(result.is_err());
        assert_eq!(CorrelationCell::get(), None);
    }

    #[test]
    fn test_set_returns_previous() {
        CorrelationCell::clear();
        assert_eq!(CorrelationCell::set("a"), None);
        assert_eq!(CorrelationCell::set("b"), Some("a".into()));
        assert_eq!(CorrelationCell::clear(), Some("b".into()));
    }

    #[test]
    fn test_bridge_writes_bound_id() {
        let bridge = CorrelationContextBridge::new(CorrelationCell);
        let event = CorrelationCell::scope("req-7", || enrich_one(&bridge));
        assert_eq!(event.metadata_value(FIELD_CORRELATION_ID), Some("req-7"));
    }

    #[test]
    fn test_bridge_writes_empty_string_when_unset() {
        CorrelationCell::clear();
        let bridge = CorrelationContextBridge::new(CorrelationCell);
        let event = enrich_one(&bridge);
        assert_eq!(
            event.metadata_value(FIELD_CORRELATION_ID),
            Some(DEFAULT_CORRELATION_ID)
        );
    }

    #[test]
    fn test_bridge_degrades_to_empty_on_read_anomaly() {
        let bridge = CorrelationContextBridge::new(Broken);
        let event = enrich_one(&bridge);
        assert_eq!(event.metadata_value(FIELD_CORRELATION_ID), Some(""));
    }

    #[test]
    fn test_reentrant_read_is_busy() {
        CorrelationCell::clear();
        let anomaly = CURRENT.with(|cell| {
            let _held = cell.borrow_mut();
            CorrelationCell.read()
        });
        assert_eq!(anomaly, Err(ReadAnomaly::Busy));
    }

    #[tokio::test]
    async fn test_task_scope_shadows_thread_binding() {
        CorrelationCell::clear();
        let bridge = CorrelationContextBridge::new(CorrelationCell);

        let seen = CorrelationCell::scope_async("task-1", async {
            tokio::task::yield_now().await;
            bridge.current()
        })
        .await;

        assert_eq!(seen.as_str(), "task-1");
        assert_eq!(CorrelationCell::get(), None);
    }

    #[tokio::test]
    async fn test_sync_scope_inside_task_scope_wins() {
        CorrelationCell::clear();
        let bridge = CorrelationContextBridge::new(CorrelationCell);

        let (inner, after_inner, reassigned) = CorrelationCell::scope_async("task", async {
            let inner = CorrelationCell::scope("inner-unit", || enrich_one(&bridge));
            let after_inner = bridge.current();
            CorrelationCell::set("reassigned");
            tokio::task::yield_now().await;
            (inner, after_inner, bridge.current())
        })
        .await;

        assert_eq!(inner.metadata_value(FIELD_CORRELATION_ID), Some("inner-unit"));
        assert_eq!(after_inner.as_str(), "task");
        assert_eq!(reassigned.as_str(), "reassigned");
        // The task cell never leaked into the thread cell
        assert_eq!(CorrelationCell::get(), None);
    }

    #[tokio::test]
    async fn test_clear_inside_task_scope_unbinds_for_the_task() {
        let bridge = CorrelationContextBridge::new(CorrelationCell);

        let seen = CorrelationCell::scope_async("task", async {
            CorrelationCell::clear();
            bridge.current()
        })
        .await;

        assert_eq!(seen.as_str(), DEFAULT_CORRELATION_ID);
    }
}
