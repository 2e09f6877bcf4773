//! Configurable model: session lifetime management
//!
//! A [`ConfigurableModel`] pairs a [`Runtime`] with a resolved
//! [`ModelConfig`] and decides, according to the configured [`MemoryMode`],
//! when the underlying session is built and how long it lives:
//!
//! | mode          | built               | kept                     |
//! |---------------|---------------------|--------------------------|
//! | `Eager`       | at construction     | until the model drops    |
//! | `LazyCached`  | on first `resolve`  | until the model drops    |
//! | `LazyPerCall` | on every `resolve`  | until the handle drops   |
//!
//! A model is used by one caller at a time; [`ConfigurableModel::resolve`]
//! takes `&mut self`, so the borrow checker enforces that.

use std::time::Instant;

pub mod config;
pub mod error;
pub mod handle;
pub mod metrics;

pub use config::{
    Backend, ConfigBuilder, LogSeverity, MemoryMode, ModelConfig, ModelSource, OptimizationLevel,
    SessionOptions,
};
pub use error::ConfigError;
pub use handle::SessionHandle;
pub use metrics::SessionMetrics;

use crate::runtime::Runtime;
use crate::Result;

/// One logical model and, depending on its memory mode, its live session
pub struct ConfigurableModel<R: Runtime> {
    runtime: R,
    config: ModelConfig,
    session: Option<R::Session>,
    metrics: SessionMetrics,
}

impl<R: Runtime> ConfigurableModel<R> {
    /// Create the model.
    ///
    /// In [`MemoryMode::Eager`] the session is built here and any build
    /// failure is returned. Lazy modes never touch the runtime until the
    /// first [`resolve`](Self::resolve).
    pub fn new(runtime: R, config: ModelConfig) -> Result<Self> {
        let mut metrics = SessionMetrics::default();
        let session = if config.memory_mode().loads_eagerly() {
            Some(build_session(&runtime, &config, &mut metrics)?)
        } else {
            None
        };

        Ok(Self {
            runtime,
            config,
            session,
            metrics,
        })
    }

    /// Obtain a usable session according to the memory mode.
    ///
    /// Cached modes hand out the model's session, building it first if
    /// needed. A failed build leaves nothing cached, so the next call tries
    /// again. `LazyPerCall` builds a new session every time and the returned
    /// handle destroys it when dropped.
    pub fn resolve(&mut self) -> Result<SessionHandle<'_, R::Session>> {
        if !self.config.memory_mode().caches_session() {
            let session = build_session(&self.runtime, &self.config, &mut self.metrics)?;
            return Ok(SessionHandle::per_call(session, &mut self.metrics));
        }

        let session = match self.session.take() {
            Some(session) => {
                self.metrics.increment_hits();
                tracing::trace!("Reusing cached session for {}", self.config.source());
                session
            }
            None => build_session(&self.runtime, &self.config, &mut self.metrics)?,
        };
        Ok(SessionHandle::cached(self.session.insert(session)))
    }

    /// Drop the cached session, if any.
    ///
    /// The next [`resolve`](Self::resolve) builds a fresh one, whatever the
    /// memory mode. Returns whether a session was released.
    pub fn unload(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                drop(session);
                self.metrics.increment_unloads();
                tracing::debug!("Unloaded model {}", self.config.source());
                true
            }
            None => false,
        }
    }

    /// Whether a cached session is currently held
    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /// Resolved configuration
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Configured memory mode
    pub fn memory_mode(&self) -> MemoryMode {
        self.config.memory_mode()
    }

    /// Session counters
    pub fn metrics(&self) -> SessionMetrics {
        self.metrics
    }

    /// Runtime this model builds sessions with
    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R: Runtime> Drop for ConfigurableModel<R> {
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::debug!("Dropping model {} with live session", self.config.source());
        }
    }
}

fn build_session<R: Runtime>(
    runtime: &R,
    config: &ModelConfig,
    metrics: &mut SessionMetrics,
) -> Result<R::Session> {
    let started = Instant::now();
    let session = runtime.build_session(config).map_err(|e| {
        tracing::error!("Failed to build session for {}: {}", config.source(), e);
        e
    })?;
    metrics.increment_builds();
    tracing::info!(
        "Built session for {} on {} ({:?}, {:?})",
        config.source(),
        config.backend(),
        config.memory_mode(),
        started.elapsed()
    );
    Ok(session)
}

impl<R: Runtime> std::fmt::Debug for ConfigurableModel<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurableModel")
            .field("config", &self.config)
            .field("loaded", &self.session.is_some())
            .field("metrics", &self.metrics)
            .finish()
    }
}
