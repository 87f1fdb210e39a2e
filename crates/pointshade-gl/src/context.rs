//! Ownership of the GL context.
//!
//! Every batch of GL calls (allocation, reload, a frame) runs between
//! [`GlContext::acquire`] and the drop of the returned [`ContextGuard`].

use std::sync::atomic::{AtomicU64, Ordering};

use crate::raw::RawGl;
use crate::GlError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one GL context incarnation. A recreated context gets a fresh
/// id, so objects created in the old one can be recognized as dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

pub trait GlContext {
    /// Identity of the context as it currently exists.
    fn id(&self) -> ContextId;

    /// Make the context current on the calling thread.
    fn make_current(&self) -> Result<(), GlError>;

    /// Give the context back to its owner.
    fn release(&self);

    fn acquire(&self) -> Result<ContextGuard<'_, Self>, GlError> {
        self.make_current()?;
        Ok(ContextGuard { context: self })
    }
}

/// Releases the context when dropped.
#[must_use = "the context is released as soon as the guard is dropped"]
pub struct ContextGuard<'a, C: GlContext + ?Sized> {
    context: &'a C,
}

impl<C: GlContext + ?Sized> ContextGuard<'_, C> {
    pub fn id(&self) -> ContextId {
        self.context.id()
    }
}

impl<C: GlContext + ?Sized> Drop for ContextGuard<'_, C> {
    fn drop(&mut self) {
        self.context.release();
    }
}

/// A context created and made current by the host application.
///
/// Acquiring only verifies that a context is current. The host reports
/// display reattachment or similar context loss through [`HostContext::recreate`].
#[derive(Debug)]
pub struct HostContext {
    gl: RawGl,
    id: AtomicU64,
}

impl HostContext {
    pub fn new(gl: RawGl) -> Self {
        Self {
            gl,
            id: AtomicU64::new(ContextId::next().get()),
        }
    }

    /// Record that the host replaced its context.
    pub fn recreate(&self) -> ContextId {
        let id = ContextId::next();
        self.id.store(id.get(), Ordering::Release);
        id
    }
}

impl GlContext for HostContext {
    fn id(&self) -> ContextId {
        ContextId(self.id.load(Ordering::Acquire))
    }

    fn make_current(&self) -> Result<(), GlError> {
        if self.gl.is_context_current() {
            Ok(())
        } else {
            Err(GlError::NotCurrent)
        }
    }

    fn release(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeContext;

    #[test]
    fn guard_releases_on_drop() {
        let ctx = FakeContext::new();
        {
            let guard = ctx.acquire().unwrap();
            assert_eq!(guard.id(), ctx.id());
            assert_eq!(ctx.releases(), 0);
        }
        assert_eq!(ctx.acquires(), 1);
        assert_eq!(ctx.releases(), 1);
    }

    #[test]
    fn failed_acquire_does_not_release() {
        let ctx = FakeContext::new();
        ctx.set_available(false);
        assert!(matches!(ctx.acquire(), Err(GlError::NotCurrent)));
        assert_eq!(ctx.releases(), 0);
    }

    #[test]
    fn recreated_context_has_new_identity() {
        let ctx = FakeContext::new();
        let before = ctx.id();
        ctx.recreate();
        assert_ne!(before, ctx.id());
    }
}
