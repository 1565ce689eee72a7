//! In-memory collective transport
//!
//! [`LocalCluster`] connects a fixed number of endpoints living in one
//! process, typically one per thread. It is the reference transport used to
//! exercise the coordinator/worker protocol without any network.

use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use crate::distributed::{Collective, COORDINATOR_RANK};
use crate::error::CommError;

#[derive(Debug)]
struct Shared {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Vec<u8>>>>,
}

impl Shared {
    fn slots(&self) -> Result<MutexGuard<'_, Vec<Option<Vec<u8>>>>, CommError> {
        self.slots
            .lock()
            .map_err(|_| CommError::Transport("a participant panicked".into()))
    }
}

/// Factory for a set of connected in-memory endpoints
#[derive(Debug)]
pub struct LocalCluster;

impl LocalCluster {
    /// Create `size` connected endpoints, ranked `0..size`
    ///
    /// Each endpoint must be driven from its own thread; collective calls
    /// block until all of them arrive.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Vec<LocalEndpoint> {
        let shared = Arc::new(Shared {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![None; size]),
        });
        (0..size)
            .map(|rank| LocalEndpoint {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

/// One participant of a [`LocalCluster`]
#[derive(Debug)]
pub struct LocalEndpoint {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl LocalEndpoint {
    fn is_root(&self) -> bool {
        self.rank == COORDINATOR_RANK
    }

    // Two-phase exchange: writers fill slots, everyone waits, readers take
    // their slot, everyone waits again so the next call cannot overwrite
    // data that has not been read yet.
    fn exchange<W, R, T>(&self, write: W, read: R) -> Result<T, CommError>
    where
        W: FnOnce(&mut [Option<Vec<u8>>]),
        R: FnOnce(&mut [Option<Vec<u8>>]) -> Result<T, CommError>,
    {
        let written = self.shared.slots().map(|mut slots| write(&mut slots));
        self.shared.barrier.wait();
        let result = written.and_then(|_| {
            let mut slots = self.shared.slots()?;
            read(&mut slots)
        });
        self.shared.barrier.wait();
        result
    }
}

impl Collective for LocalEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&mut self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        let root = self.is_root();
        let received = self.exchange(
            |slots| {
                if root {
                    slots[COORDINATOR_RANK] = payload;
                }
            },
            |slots| {
                slots[COORDINATOR_RANK]
                    .clone()
                    .ok_or_else(|| CommError::Protocol("coordinator broadcast nothing".into()))
            },
        );
        // The root clears its slot only after every participant has read it.
        let cleared = self.exchange(
            |slots| {
                if root {
                    slots[COORDINATOR_RANK] = None;
                }
            },
            |_| Ok(()),
        );
        let bytes = received?;
        cleared?;
        Ok(bytes)
    }

    fn scatter(&mut self, payloads: Option<Vec<Vec<u8>>>) -> Result<Vec<u8>, CommError> {
        let root = self.is_root();
        let size = self.size;
        let rank = self.rank;
        self.exchange(
            |slots| {
                if let Some(payloads) = payloads.filter(|p| root && p.len() == size) {
                    for (slot, payload) in slots.iter_mut().zip(payloads) {
                        *slot = Some(payload);
                    }
                }
            },
            |slots| {
                slots[rank]
                    .take()
                    .ok_or_else(|| CommError::Protocol(format!("no scatter payload for rank {rank}")))
            },
        )
    }

    fn gather(&mut self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        let root = self.is_root();
        let rank = self.rank;
        let gathered = self.exchange(
            |slots| slots[rank] = Some(payload),
            |slots| {
                if !root {
                    return Ok(None);
                }
                slots
                    .iter()
                    .enumerate()
                    .map(|(i, slot)| {
                        slot.clone()
                            .ok_or_else(|| CommError::Protocol(format!("rank {i} sent nothing")))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some)
            },
        );

        // Clear after the root has read every slot.
        let cleared = self.exchange(|slots| slots[rank] = None, |_| Ok(()));
        let gathered = gathered?;
        cleared?;
        Ok(gathered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::CollectiveExt;
    use std::thread;

    fn run_cluster<F, T>(size: usize, f: F) -> Vec<T>
    where
        F: Fn(LocalEndpoint) -> T + Send + Sync + Copy + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = LocalCluster::new(size)
            .into_iter()
            .map(|endpoint| thread::spawn(move || f(endpoint)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_local_broadcast() {
        let results = run_cluster(3, |mut comm| {
            let value = comm.is_coordinator().then(|| vec![4.0f64, 2.0]);
            comm.broadcast_value::<Vec<f64>>(value.as_ref()).unwrap()
        });
        assert!(results.iter().all(|v| v == &vec![4.0, 2.0]));
    }

    #[test]
    fn test_local_scatter_then_gather() {
        let results = run_cluster(3, |mut comm| {
            let parts = comm.is_coordinator().then(|| vec![10u32, 20, 30]);
            let mine: u32 = comm.scatter_values(parts.as_deref()).unwrap();
            comm.gather_value(&(mine + comm.rank() as u32)).unwrap()
        });
        assert_eq!(results[0], Some(vec![10, 21, 32]));
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
    }

    #[test]
    fn test_local_repeated_rounds() {
        let results = run_cluster(2, |mut comm| {
            let mut seen = Vec::new();
            for round in 0..5u64 {
                let value = comm.is_coordinator().then_some(round * 3);
                seen.push(comm.broadcast_value::<u64>(value.as_ref()).unwrap());
                comm.gather_value(&round).unwrap();
            }
            seen
        });
        assert_eq!(results[0], vec![0, 3, 6, 9, 12]);
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_local_missing_broadcast_fails_everywhere() {
        let results = run_cluster(2, |mut comm| comm.broadcast(None).is_err());
        assert_eq!(results, vec![true, true]);
    }
}
