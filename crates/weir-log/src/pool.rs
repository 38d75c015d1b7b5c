//! Bounded pool of read-only file handles
//!
//! Random readers from many transactions contend for the same segment, so
//! handles are pooled: checkout hands back an idle handle, opens a fresh one
//! while under capacity, and otherwise blocks until a handle comes home.
//! Each handle carries a mutable file cursor; the pool guarantees one user
//! at a time.
//!
//! Close flips the open flag, drops the idle handles, and then waits on the
//! condition variable until every checked-out handle has been returned —
//! check-in after close drops the handle instead of re-pooling it.

use std::fs::File;
use std::path::PathBuf;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use weir_core::{Result, WeirError};

struct PoolState {
    idle: Vec<File>,
    /// Handles alive anywhere: idle plus checked out plus mid-open.
    opened: usize,
    open: bool,
}

pub(crate) struct HandlePool {
    path: PathBuf,
    capacity: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl HandlePool {
    /// Open the pool with one eager handle, verifying the segment is
    /// readable up front.
    pub(crate) fn open(path: PathBuf, capacity: usize) -> Result<Self> {
        let first = File::open(&path)?;
        Ok(Self {
            path,
            capacity,
            state: Mutex::new(PoolState {
                idle: vec![first],
                opened: 1,
                open: true,
            }),
            available: Condvar::new(),
        })
    }

    pub(crate) fn checkout(&self) -> Result<File> {
        let mut state = self.state.lock();
        loop {
            if !state.open {
                return Err(WeirError::Closed);
            }
            if let Some(handle) = state.idle.pop() {
                return Ok(handle);
            }
            if state.opened < self.capacity {
                // Reserve the slot before releasing the lock so concurrent
                // checkouts cannot overshoot the capacity.
                state.opened += 1;
                let remaining = self.capacity - state.opened;
                drop(state);

                debug!(remaining, "opening {} for read", self.path.display());
                match File::open(&self.path) {
                    Ok(handle) => return Ok(handle),
                    Err(e) => {
                        let mut state = self.state.lock();
                        state.opened -= 1;
                        self.available.notify_all();
                        return Err(e.into());
                    }
                }
            }
            self.available.wait(&mut state);
        }
    }

    /// Return a handle after a successful read. Dropped instead if the pool
    /// closed while it was out.
    pub(crate) fn checkin(&self, handle: File) {
        let mut state = self.state.lock();
        if state.open {
            state.idle.push(handle);
            self.available.notify_one();
        } else {
            drop(handle);
            state.opened -= 1;
            self.available.notify_all();
        }
    }

    /// Drop a handle whose read failed; its cursor state is suspect.
    pub(crate) fn discard(&self, handle: File) {
        let mut state = self.state.lock();
        drop(handle);
        state.opened -= 1;
        self.available.notify_all();
    }

    /// Close the pool and wait until every handle has been dropped.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        if !state.open {
            return;
        }
        state.open = false;
        let drained = state.idle.len();
        state.idle.clear();
        state.opened -= drained;
        self.available.notify_all();

        while state.opened > 0 {
            self.available.wait(&mut state);
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state.lock().open
    }

    #[cfg(test)]
    fn opened(&self) -> usize {
        self.state.lock().opened
    }
}
