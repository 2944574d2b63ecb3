//! Collective reduction primitive used by the allocator and the proximity adaptor.
//!
//! The coupling only ever needs a global maximum, so the seam is kept that narrow.
//! `SerialComm` covers single-process runs, `ThreadComm` runs several ranks as
//! threads inside one process, and the `mpi` feature implements the trait for an
//! rsmpi communicator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

/// Rank-level communicator.
///
/// Every method that reduces is a collective: all ranks of the group must call it
/// the same number of times and in the same order, or the group deadlocks.
pub trait Communicator {
    /// This rank's index in `0..size()`
    fn rank(&self) -> usize;

    /// Number of ranks in the group
    fn size(&self) -> usize;

    /// Global maximum of an unsigned integer
    fn all_reduce_max_u64(&self, local: u64) -> u64;

    /// Global maximum of a double
    fn all_reduce_max_f64(&self, local: f64) -> f64;
}

/// Single-rank communicator. Reductions are the identity.
#[derive(Debug, Default)]
pub struct SerialComm {
    collectives: AtomicUsize,
}

impl SerialComm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reductions issued through this communicator
    pub fn collective_count(&self) -> usize {
        self.collectives.load(Ordering::Relaxed)
    }
}

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_max_u64(&self, local: u64) -> u64 {
        self.collectives.fetch_add(1, Ordering::Relaxed);
        local
    }

    fn all_reduce_max_f64(&self, local: f64) -> f64 {
        self.collectives.fetch_add(1, Ordering::Relaxed);
        local
    }
}

/// Shared rendezvous state of a thread group
#[derive(Debug)]
struct Rendezvous {
    barrier: Barrier,
    int_slots: Mutex<Vec<u64>>,
    float_slots: Mutex<Vec<f64>>,
}

/// One rank of an in-process group of ranks, each driven by its own thread.
///
/// Each reduction is two barrier phases: every rank publishes its value, then every
/// rank reads the maximum before any slot may be overwritten by the next call.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    shared: Arc<Rendezvous>,
    collectives: AtomicUsize,
}

impl ThreadComm {
    /// Create a group of `size` communicators, one per rank.
    ///
    /// Move each one into the thread that plays that rank. A group of zero
    /// ranks is empty.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        if size == 0 {
            return Vec::new();
        }

        let shared = Arc::new(Rendezvous {
            barrier: Barrier::new(size),
            int_slots: Mutex::new(vec![0; size]),
            float_slots: Mutex::new(vec![0.0; size]),
        });

        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                shared: Arc::clone(&shared),
                collectives: AtomicUsize::new(0),
            })
            .collect()
    }

    /// Number of reductions issued by this rank
    pub fn collective_count(&self) -> usize {
        self.collectives.load(Ordering::Relaxed)
    }

    fn reduce<T, F>(&self, slots: &Mutex<Vec<T>>, local: T, fold: F) -> T
    where
        T: Copy,
        F: Fn(T, T) -> T,
    {
        self.collectives.fetch_add(1, Ordering::Relaxed);

        lock(slots)[self.rank] = local;
        self.shared.barrier.wait();

        let result = {
            let values = lock(slots);
            values.iter().copied().fold(values[0], &fold)
        };
        self.shared.barrier.wait();

        result
    }
}

/// A poisoned slot table means another rank panicked mid-collective; the values
/// themselves are still plain numbers, so keep going with them.
fn lock<T>(slots: &Mutex<Vec<T>>) -> std::sync::MutexGuard<'_, Vec<T>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_max_u64(&self, local: u64) -> u64 {
        self.reduce(&self.shared.int_slots, local, u64::max)
    }

    fn all_reduce_max_f64(&self, local: f64) -> f64 {
        self.reduce(&self.shared.float_slots, local, f64::max)
    }
}

#[cfg(feature = "mpi")]
mod mpi_backend {
    use super::Communicator;
    use mpi::collective::SystemOperation;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as MpiCommunicator, CommunicatorCollectives};

    impl Communicator for SimpleCommunicator {
        fn rank(&self) -> usize {
            MpiCommunicator::rank(self) as usize
        }

        fn size(&self) -> usize {
            MpiCommunicator::size(self) as usize
        }

        fn all_reduce_max_u64(&self, local: u64) -> u64 {
            let mut global = 0u64;
            self.all_reduce_into(&local, &mut global, SystemOperation::max());
            global
        }

        fn all_reduce_max_f64(&self, local: f64) -> f64 {
            let mut global = 0.0f64;
            self.all_reduce_into(&local, &mut global, SystemOperation::max());
            global
        }
    }
}
