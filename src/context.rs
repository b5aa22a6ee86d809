//! Current-injector context
//!
//! [`Inject`](crate::Inject) handles resolve against the *current* injector.
//! An injector becomes current for the lifetime of the guard returned by
//! [`Injector::activate`]; activations nest. Under the `async` feature a
//! task-local injector set with [`scope_async`] is used when no thread-local
//! activation is present.
//!
//! This module also keeps the per-thread resolution stack used to report
//! circular dependencies.

use crate::{DiError, Injector, Result, Token};
use std::cell::RefCell;
use std::marker::PhantomData;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

thread_local! {
    static ACTIVE: RefCell<Vec<Injector>> = const { RefCell::new(Vec::new()) };

    static RESOLVING: RefCell<Vec<(usize, Token)>> = const { RefCell::new(Vec::new()) };
}

#[cfg(feature = "async")]
tokio::task_local! {
    static TASK_INJECTOR: Injector;
}

/// The innermost active injector, if any.
pub fn current() -> Option<Injector> {
    let active = ACTIVE.with(|stack| stack.borrow().last().cloned());

    #[cfg(feature = "async")]
    if active.is_none() {
        return TASK_INJECTOR.try_with(Injector::clone).ok();
    }

    active
}

/// Like [`current`], but fails with [`DiError::NoActiveInjector`].
pub fn require() -> Result<Injector> {
    current().ok_or(DiError::NoActiveInjector)
}

/// Number of nested thread-local activations on this thread.
pub fn depth() -> usize {
    ACTIVE.with(|stack| stack.borrow().len())
}

pub(crate) fn activate(injector: Injector) -> ActiveInjector {
    #[cfg(feature = "logging")]
    trace!(target: "djx", scope = injector.scope_name(), "Activating injector");

    let depth = ACTIVE.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(injector);
        stack.len()
    });
    ActiveInjector {
        depth,
        _not_send: PhantomData,
    }
}

/// Guard keeping an injector current on this thread.
///
/// Dropping it restores the previously active injector. The guard is not
/// `Send`: the activation belongs to the thread that created it.
#[must_use = "the injector is only active while the guard is alive"]
pub struct ActiveInjector {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ActiveInjector {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "injector activations dropped out of order");
            stack.truncate(self.depth.saturating_sub(1));
        });
    }
}

impl std::fmt::Debug for ActiveInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveInjector").field("depth", &self.depth).finish()
    }
}

/// Run `future` with `injector` as the task-local current injector.
#[cfg(feature = "async")]
pub async fn scope_async<F>(injector: Injector, future: F) -> F::Output
where
    F: std::future::Future,
{
    TASK_INJECTOR.scope(injector, future).await
}

/// Entry on the resolution stack for one (injector, token) pair.
pub(crate) struct ResolutionGuard {
    _not_send: PhantomData<*const ()>,
}

impl ResolutionGuard {
    /// Push `(owner, token)`, failing if the pair is already being resolved
    /// on this thread.
    pub(crate) fn enter(owner: usize, token: &Token) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack.iter().position(|(o, t)| *o == owner && t == token) {
                let path = stack[start..]
                    .iter()
                    .map(|(_, t)| t.name())
                    .chain(std::iter::once(token.name()))
                    .collect::<Vec<_>>()
                    .join(" -> ");

                #[cfg(feature = "logging")]
                debug!(target: "djx", path = %path, "Circular dependency detected");

                return Err(DiError::CircularDependency { path });
            }
            stack.push((owner, token.clone()));
            Ok(Self {
                _not_send: PhantomData,
            })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
