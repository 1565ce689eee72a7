//! Distributed execution
//!
//! The engine cooperates with other processes only through the synchronous
//! collective operations of [`Collective`]. Every participant must issue the
//! same sequence of collective calls; the coordinator (rank
//! [`COORDINATOR_RANK`]) is the root of every broadcast, scatter and gather.
//!
//! Payloads are opaque bytes at this level. [`CollectiveExt`] layers typed
//! messages on top using `serde_json`, so a transport only has to move bytes.

pub mod local;

use std::ops::Range;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CommError;

/// Rank of the process that runs the operators and master-only plugins
pub const COORDINATOR_RANK: usize = 0;

/// Minimal synchronous collective-operations interface
///
/// Each call is a barrier: it returns only after every participant made the
/// matching call.
pub trait Collective: Send {
    /// This participant's rank, `0..size()`
    fn rank(&self) -> usize;

    /// Number of participants
    fn size(&self) -> usize;

    /// Whether this participant is the coordinator
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    /// Deliver the coordinator's payload to every participant
    ///
    /// The coordinator passes `Some`; everyone else passes `None`.
    fn broadcast(&mut self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError>;

    /// Hand the `i`-th payload to rank `i`
    ///
    /// The coordinator passes one payload per participant; everyone else
    /// passes `None`.
    fn scatter(&mut self, payloads: Option<Vec<Vec<u8>>>) -> Result<Vec<u8>, CommError>;

    /// Collect one payload per participant on the coordinator, in rank order
    ///
    /// Returns `Some` on the coordinator and `None` elsewhere.
    fn gather(&mut self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError>;
}

impl<T: Collective + ?Sized> Collective for Box<T> {
    fn rank(&self) -> usize {
        (**self).rank()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn broadcast(&mut self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        (**self).broadcast(payload)
    }

    fn scatter(&mut self, payloads: Option<Vec<Vec<u8>>>) -> Result<Vec<u8>, CommError> {
        (**self).scatter(payloads)
    }

    fn gather(&mut self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        (**self).gather(payload)
    }
}

/// Typed collective operations over any [`Collective`]
pub trait CollectiveExt: Collective {
    /// Broadcast a value from the coordinator
    fn broadcast_value<T>(&mut self, value: Option<&T>) -> Result<T, CommError>
    where
        T: Serialize + DeserializeOwned,
    {
        let payload = value.map(serde_json::to_vec).transpose()?;
        let bytes = self.broadcast(payload)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Scatter one value per participant from the coordinator
    fn scatter_values<T>(&mut self, values: Option<&[T]>) -> Result<T, CommError>
    where
        T: Serialize + DeserializeOwned,
    {
        let payloads = values
            .map(|values| {
                values
                    .iter()
                    .map(serde_json::to_vec)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        let bytes = self.scatter(payloads)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Gather one value per participant on the coordinator
    fn gather_value<T>(&mut self, value: &T) -> Result<Option<Vec<T>>, CommError>
    where
        T: Serialize + DeserializeOwned,
    {
        let gathered = self.gather(serde_json::to_vec(value)?)?;
        gathered
            .map(|payloads| {
                payloads
                    .iter()
                    .map(|bytes| serde_json::from_slice(bytes).map_err(CommError::from))
                    .collect::<Result<Vec<T>, CommError>>()
            })
            .transpose()
    }
}

impl<C: Collective + ?Sized> CollectiveExt for C {}

/// The trivial one-participant collective
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SingleProcess;

impl Collective for SingleProcess {
    fn rank(&self) -> usize {
        COORDINATOR_RANK
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast(&mut self, payload: Option<Vec<u8>>) -> Result<Vec<u8>, CommError> {
        payload.ok_or_else(|| CommError::Protocol("coordinator broadcast without payload".into()))
    }

    fn scatter(&mut self, payloads: Option<Vec<Vec<u8>>>) -> Result<Vec<u8>, CommError> {
        let payloads =
            payloads.ok_or_else(|| CommError::Protocol("coordinator scatter without payload".into()))?;
        let count = payloads.len();
        let mut payloads = payloads.into_iter();
        match (payloads.next(), count) {
            (Some(payload), 1) => Ok(payload),
            _ => Err(CommError::Protocol(format!(
                "scatter expects 1 payload, got {count}"
            ))),
        }
    }

    fn gather(&mut self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>, CommError> {
        Ok(Some(vec![payload]))
    }
}

/// Split `0..len` into `parts` contiguous, nearly equal ranges
///
/// The first `len % parts` ranges are one element longer. Returns no ranges
/// when `parts` is zero.
pub fn split_range(len: usize, parts: usize) -> Vec<Range<usize>> {
    if parts == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let extra = len % parts;

    let mut start = 0;
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

pub mod prelude {
    pub use super::local::*;
    pub use super::{split_range, Collective, CollectiveExt, SingleProcess, COORDINATOR_RANK};
}
