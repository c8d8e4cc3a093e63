//! Application state shared across request handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::seace::SeaceRunner;

/// Counts runs currently holding a browser.
#[derive(Debug, Clone, Default)]
pub struct ActiveRuns {
    inner: Arc<AtomicUsize>,
}

impl ActiveRuns {
    /// Mark a run as started; the returned guard marks it finished on drop.
    pub fn enter(&self) -> ActiveRunGuard {
        self.inner.fetch_add(1, Ordering::SeqCst);
        ActiveRunGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.load(Ordering::SeqCst)
    }
}

pub struct ActiveRunGuard {
    inner: Arc<AtomicUsize>,
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        self.inner.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub runner: SeaceRunner,
    /// Bearer token required by the export endpoint, if any.
    pub auth_token: Option<Arc<str>>,
    pub active_runs: ActiveRuns,
}

impl AppState {
    pub fn new(runner: SeaceRunner, auth_token: Option<&str>) -> Self {
        Self {
            runner,
            auth_token: auth_token.map(Arc::from),
            active_runs: ActiveRuns::default(),
        }
    }
}
