use std::cell::{Cell, RefCell, RefMut};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use spilink_bus::{BusError, SpiBus};
use tracing::warn;

use crate::transfer::Link;

/// State guarded by the handle's reentrant mutex.
pub(crate) struct Shared<B> {
    /// Nesting depth of live [`BusGuard`]s on the owning thread.
    depth: Cell<usize>,
    link: RefCell<Link<B>>,
}

impl<B: SpiBus> Shared<B> {
    pub(crate) fn new(link: Link<B>) -> ReentrantMutex<Self> {
        ReentrantMutex::new(Self {
            depth: Cell::new(0),
            link: RefCell::new(link),
        })
    }

    /// Drop the bus out of the link, closing its descriptor.
    pub(crate) fn take_bus(&self) -> Option<B> {
        self.link.borrow_mut().bus.take()
    }
}

/// Exclusive access to the bus.
///
/// Holds the in-process reentrant lock and, at the outermost level, the
/// cooperative file lock on the device. A thread that already holds a guard
/// can take another one without blocking; the file lock is released when
/// the outermost guard is dropped.
pub struct BusGuard<'a, B: SpiBus> {
    inner: ReentrantMutexGuard<'a, Shared<B>>,
}

impl<'a, B: SpiBus> BusGuard<'a, B> {
    pub(crate) fn acquire(mutex: &'a ReentrantMutex<Shared<B>>) -> Result<Self, BusError> {
        let inner = mutex.lock();
        let depth = inner.depth.get();
        if depth == 0 {
            if let Some(bus) = inner.link.borrow().bus.as_ref() {
                bus.lock_exclusive()?;
            }
        }
        inner.depth.set(depth + 1);
        Ok(Self { inner })
    }

    /// Borrow the link for one operation. The borrow must end before the
    /// guard is dropped or another operation starts on this thread.
    pub(crate) fn link(&self) -> RefMut<'_, Link<B>> {
        self.inner.link.borrow_mut()
    }

    /// Nesting depth, 1 for the outermost guard.
    pub fn depth(&self) -> usize {
        self.inner.depth.get()
    }
}

impl<B: SpiBus> Drop for BusGuard<'_, B> {
    fn drop(&mut self) {
        let depth = self.inner.depth.get() - 1;
        self.inner.depth.set(depth);
        if depth == 0 {
            if let Some(bus) = self.inner.link.borrow().bus.as_ref() {
                if let Err(err) = bus.unlock() {
                    warn!(error = %err, "failed to release bus lock");
                }
            }
        }
    }
}

impl<B: SpiBus> std::fmt::Debug for BusGuard<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusGuard")
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPeer;

    #[test]
    fn outermost_guard_takes_file_lock() {
        let (peer, probe) = SimPeer::new();
        let mutex = Shared::new(Link::new(peer));

        let outer = BusGuard::acquire(&mutex).unwrap();
        assert!(probe.is_locked());
        assert_eq!(outer.depth(), 1);

        {
            let inner = BusGuard::acquire(&mutex).unwrap();
            assert_eq!(inner.depth(), 2);
        }
        assert!(probe.is_locked(), "inner guard must not release the file lock");
        assert_eq!(probe.lock_calls(), 1);

        drop(outer);
        assert!(!probe.is_locked());
    }

    #[test]
    fn guard_excludes_other_threads() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        let (peer, _probe) = SimPeer::new();
        let mutex = Arc::new(Shared::new(Link::new(peer)));
        let entered = Arc::new(AtomicBool::new(false));

        let guard = BusGuard::acquire(&mutex).unwrap();

        let handle = {
            let mutex = Arc::clone(&mutex);
            let entered = Arc::clone(&entered);
            std::thread::spawn(move || {
                let _guard = BusGuard::acquire(&mutex).unwrap();
                entered.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));

        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn closed_link_skips_file_lock() {
        let (peer, probe) = SimPeer::new();
        let mutex = Shared::new(Link::new(peer));
        mutex.lock().link.borrow_mut().bus = None;

        let guard = BusGuard::acquire(&mutex).unwrap();
        assert_eq!(probe.lock_calls(), 0);
        drop(guard);
    }
}
