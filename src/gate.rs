//! Reader/writer admission gate for the shared registry
//!
//! Implements the first-reader/last-reader policy: any number of readers
//! share the registry at once, and the first reader of an "epoch" takes
//! the exclusive writer gate on behalf of all of them; the last reader
//! out returns it. Writers take the gate directly, so one writer excludes
//! everything else.
//!
//! The policy is deliberately unfair in both directions: a steady stream
//! of readers can keep a writer waiting indefinitely, and nothing orders
//! waiting readers against waiting writers. That liveness gap is part of
//! the admission contract, not a bug to paper over.
//!
//! The gate is not recursive. A task that already holds a guard and
//! acquires again on the same gate deadlocks; that is a programming error
//! with no recovery path, as is dropping the `read()` future after it has
//! started but before it resolved (acquisition is not cancellation-safe).
//! The server never does either: every critical section runs to
//! completion and no admission nests inside another.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, Semaphore};

/// Reader/writer gate wrapping the state it admits access to.
///
/// The guarded value is only reachable through [`ReadGuard`] and
/// [`WriteGuard`] tokens, which tie every traversal to a read admission
/// and every mutation to the write admission.
pub struct SyncGate<T> {
    /// Serializes reader admission bookkeeping. Held across the writer
    /// gate acquisition by the epoch's first reader, so later readers
    /// queue here instead of slipping past an active writer.
    admission: Mutex<()>,
    /// Number of readers currently admitted.
    readers: AtomicUsize,
    /// The exclusive writer gate: one permit, held by the active writer
    /// or collectively by the active readers.
    writer_gate: Semaphore,
    /// The guarded state, only touched through the guards.
    state: UnsafeCell<T>,
}

// Same bounds as std's RwLock: read guards hand out &T to many tasks at
// once (T: Sync), and guards may cross task/thread boundaries (T: Send).
unsafe impl<T: Send> Send for SyncGate<T> {}
unsafe impl<T: Send + Sync> Sync for SyncGate<T> {}

impl<T> SyncGate<T> {
    /// Wrap `state` in a new gate with no admissions outstanding.
    pub fn new(state: T) -> Self {
        Self {
            admission: Mutex::new(()),
            readers: AtomicUsize::new(0),
            writer_gate: Semaphore::new(1),
            state: UnsafeCell::new(state),
        }
    }

    /// Enter a read critical section.
    ///
    /// Resolves immediately while other readers are active; blocks while
    /// a writer holds the gate. Readers never wait on each other beyond
    /// the brief admission bookkeeping.
    pub async fn read(&self) -> ReadGuard<'_, T> {
        let admission = self.admission.lock().await;
        if self.readers.fetch_add(1, Ordering::AcqRel) == 0 {
            // First reader in: lock writers out until the last reader
            // leaves. Later readers piggyback on this permit.
            self.acquire_writer_gate().await;
        }
        drop(admission);
        ReadGuard { gate: self }
    }

    /// Enter the write critical section, exclusive of all readers and
    /// all other writers.
    pub async fn write(&self) -> WriteGuard<'_, T> {
        self.acquire_writer_gate().await;
        WriteGuard { gate: self }
    }

    async fn acquire_writer_gate(&self) {
        // The semaphore is never closed, so this cannot fail.
        self.writer_gate
            .acquire()
            .await
            .expect("writer gate semaphore closed")
            .forget();
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SyncGate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncGate")
            .field("readers", &self.readers.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Shared access token produced by [`SyncGate::read`].
pub struct ReadGuard<'a, T> {
    gate: &'a SyncGate<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Sound: the writer gate is held on the readers' behalf while the
        // count is non-zero, so no &mut T can exist.
        unsafe { &*self.gate.state.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        // AcqRel pairs this decrement with the admission increments so a
        // reader joining a live epoch observes all writes published
        // before the epoch took the gate.
        if self.gate.readers.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last reader out lets writers back in.
            self.gate.writer_gate.add_permits(1);
        }
    }
}

/// Exclusive access token produced by [`SyncGate::write`].
pub struct WriteGuard<'a, T> {
    gate: &'a SyncGate<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Sound: the writer holds the only permit.
        unsafe { &*self.gate.state.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Sound: the writer holds the only permit, so this is the only
        // live reference into the state.
        unsafe { &mut *self.gate.state.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.gate.writer_gate.add_permits(1);
    }
}
