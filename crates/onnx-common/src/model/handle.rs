//! Scoped access to a resolved session

use std::ops::{Deref, DerefMut};

use super::SessionMetrics;
use crate::runtime::NativeSession;
use crate::tensor::{NativeTensor, NativeTensorMut};
use crate::Result;

/// Session returned by [`ConfigurableModel::resolve`](super::ConfigurableModel::resolve).
///
/// For cached modes the handle borrows the model's session. For
/// [`MemoryMode::LazyPerCall`](super::MemoryMode::LazyPerCall) it owns a
/// fresh session which is destroyed when the handle is dropped, on every exit
/// path.
pub struct SessionHandle<'a, S: NativeSession> {
    inner: Inner<'a, S>,
}

enum Inner<'a, S> {
    Cached(&'a mut S),
    PerCall {
        session: S,
        metrics: &'a mut SessionMetrics,
    },
}

impl<'a, S: NativeSession> SessionHandle<'a, S> {
    pub(crate) fn cached(session: &'a mut S) -> Self {
        Self {
            inner: Inner::Cached(session),
        }
    }

    pub(crate) fn per_call(session: S, metrics: &'a mut SessionMetrics) -> Self {
        Self {
            inner: Inner::PerCall { session, metrics },
        }
    }

    /// Whether the session is destroyed when this handle goes away
    pub fn is_per_call(&self) -> bool {
        matches!(self.inner, Inner::PerCall { .. })
    }

    /// Run the session once
    pub fn run(&mut self, inputs: &[NativeTensor<'_>], outputs: &mut [NativeTensorMut<'_>]) -> Result<()> {
        self.deref_mut().run(inputs, outputs)
    }
}

impl<S: NativeSession> Deref for SessionHandle<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.inner {
            Inner::Cached(session) => &**session,
            Inner::PerCall { session, .. } => session,
        }
    }
}

impl<S: NativeSession> DerefMut for SessionHandle<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        match &mut self.inner {
            Inner::Cached(session) => &mut **session,
            Inner::PerCall { session, .. } => session,
        }
    }
}

impl<S: NativeSession> Drop for SessionHandle<'_, S> {
    fn drop(&mut self) {
        if let Inner::PerCall { metrics, .. } = &mut self.inner {
            // The session itself is dropped right after this, with the field.
            metrics.increment_unloads();
            tracing::debug!("Releasing per-call session");
        }
    }
}
