//! Cross-context signal
//!
//! A one-shot notification that a foreign context (another OS thread, or an
//! interrupt handler on hardware) raises with `set`, and exactly one
//! cooperative task consumes with `wait`.
//!
//! Two layers:
//! - `ThreadSafeFlag`: atomic single-slot flag. Raising it while already
//!   raised is a no-op, so it must be drained before the next producer can
//!   wake anyone.
//! - Event layer: the ready bit and value seen by cooperative waiters. Only
//!   the task currently draining the flag moves it into the event layer.
//!
//! If a waiter is cancelled while it owns the flag, a replacement drain task
//! is spawned on the current runtime so a later `set` still reaches the event
//! layer and the flag never stays raised with nobody draining it.

use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::Notify;
use tracing::trace;

/// Atomic single-slot flag; `set` is safe from any thread
#[derive(Debug, Default)]
struct ThreadSafeFlag {
    raised: AtomicBool,
    notify: Notify,
}

impl ThreadSafeFlag {
    fn set(&self) {
        if !self.raised.swap(true, Ordering::AcqRel) {
            // Stores a permit if nobody is parked yet
            self.notify.notify_one();
        }
    }

    /// Wait until raised, then lower it
    async fn wait(&self) {
        loop {
            if self.raised.swap(false, Ordering::AcqRel) {
                return;
            }
            self.notify.notified().await;
        }
    }
}

struct Inner<T> {
    value: Mutex<Option<T>>,
    flag: ThreadSafeFlag,
    /// Event layer ready bit
    ready: AtomicBool,
    ready_notify: Notify,
    /// A waiter or drain task currently owns the flag
    draining: AtomicBool,
}

impl<T> Inner<T> {
    /// Move a drained flag into the event layer and release flag ownership
    fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.draining.store(false, Ordering::Release);
        self.ready_notify.notify_waiters();
    }

    fn take_ready(&self) -> Option<T> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        let mut slot = self.value.lock();
        self.ready.store(false, Ordering::Release);
        slot.take()
    }
}

/// One-shot value handoff from any thread to one cooperative task
pub struct CrossContextSignal<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CrossContextSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for CrossContextSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> CrossContextSignal<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                value: Mutex::new(None),
                flag: ThreadSafeFlag::default(),
                ready: AtomicBool::new(false),
                ready_notify: Notify::new(),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Store `value` and raise the flag. Callable from any thread; the value
    /// is buffered if nobody is waiting. A second `set` before the value is
    /// consumed replaces it.
    pub fn set(&self, value: T) {
        *self.inner.value.lock() = Some(value);
        self.inner.flag.set();
    }

    /// Suspend until a value has been set since the last clear, then take it.
    ///
    /// Cancel-safe: dropping the returned future never loses a later `set`.
    /// Only one waiter per arm cycle is supported.
    pub async fn wait(&self) -> T {
        loop {
            if let Some(value) = self.inner.take_ready() {
                return value;
            }

            if !self.inner.draining.swap(true, Ordering::AcqRel) {
                if self.inner.ready.load(Ordering::Acquire) {
                    // A drain task finished between our checks
                    self.inner.draining.store(false, Ordering::Release);
                    continue;
                }
                let mut guard = DrainGuard {
                    inner: Some(Arc::clone(&self.inner)),
                };
                self.inner.flag.wait().await;
                guard.disarm();
                self.inner.mark_ready();
            } else {
                // A drain task owns the flag; wait for it to hand over
                let notified = self.inner.ready_notify.notified();
                if self.inner.ready.load(Ordering::Acquire)
                    || !self.inner.draining.load(Ordering::Acquire)
                {
                    continue;
                }
                notified.await;
            }
        }
    }

    /// Lower both layers and drop any buffered value
    pub fn clear(&self) {
        // Under the slot lock so a concurrent `set` either lands fully
        // before this (and is discarded) or fully after (and is kept)
        let mut slot = self.inner.value.lock();
        self.inner.ready.store(false, Ordering::Release);
        self.inner.flag.raised.store(false, Ordering::Release);
        slot.take();
    }

    /// True if a value is ready for the next `wait` without suspending
    pub fn is_set(&self) -> bool {
        let slot = self.inner.value.lock();
        slot.is_some()
            && (self.inner.ready.load(Ordering::Acquire)
                || self.inner.flag.raised.load(Ordering::Acquire))
    }

    /// Run `operation` on a dedicated OS thread and `set` its result
    pub fn run_blocking_and_notify<F>(&self, operation: F) -> io::Result<JoinHandle<()>>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let signal = self.clone();
        std::thread::Builder::new()
            .name("aethermesh-blocking".into())
            .spawn(move || signal.set(operation()))
    }
}

/// Hands flag ownership to a drain task if the owning waiter is dropped
struct DrainGuard<T: Send + 'static> {
    inner: Option<Arc<Inner<T>>>,
}

impl<T: Send + 'static> DrainGuard<T> {
    fn disarm(&mut self) {
        self.inner = None;
    }
}

impl<T: Send + 'static> Drop for DrainGuard<T> {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                trace!("Signal waiter cancelled, spawning drain task");
                handle.spawn(async move {
                    inner.flag.wait().await;
                    inner.mark_ready();
                });
            }
            Err(_) => {
                // No runtime to drain on; the next waiter takes the flag over
                inner.draining.store(false, Ordering::Release);
                inner.ready_notify.notify_waiters();
            }
        }
    }
}
