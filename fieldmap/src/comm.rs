/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides the transport abstraction, the per-participant rank context, and a mailbox exchange.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # comm
//!
//! Rank-to-rank communication plumbing. The mapping core only ever needs a
//! blocking, ordered, reliable channel of `f64` frames; anything that
//! implements [`Transport`] (sockets, MPI, the in-process [`LocalExchange`])
//! can back it.
//!
//! [`CommContext`] replaces the process-wide master/worker singleton of
//! classic coupling codes with an explicit value threaded through mapping and
//! channel construction: local rank, participant size, and the
//! intra-participant link connecting the workers to the coordinator.

use crate::error::TransportError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};

/// Blocking, ordered, reliable double-precision transport between ranks.
///
/// A `send` must be matched by a `receive` of the same length on the peer.
/// Implementations retry nothing; failures surface unchanged.
pub trait Transport: Send + Sync {
    fn is_connected(&self) -> bool;

    fn send(&self, buf: &[f64], peer: usize) -> Result<(), TransportError>;

    fn receive(&self, buf: &mut [f64], peer: usize) -> Result<(), TransportError>;
}

/// Explicit rank/size/link bundle for one participant.
pub struct CommContext {
    rank: usize,
    size: usize,
    link: Option<Arc<dyn Transport>>,
}

impl CommContext {
    /// A single-rank context with no link; collectives become no-ops.
    pub fn serial() -> Self {
        Self {
            rank: 0,
            size: 1,
            link: None,
        }
    }

    pub fn new(rank: usize, size: usize, link: Arc<dyn Transport>) -> Self {
        assert!(size > 0, "participant size must be positive");
        assert!(rank < size, "rank {rank} out of range for size {size}");
        Self {
            rank,
            size,
            link: Some(link),
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Rank 0 of the participant coordinates gathers and scatters.
    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }

    /// The intra-participant worker link. Calling this on a serial context
    /// is a programming error.
    pub fn link(&self) -> &dyn Transport {
        self.link
            .as_deref()
            .expect("no intra-participant link in a serial context")
    }

    /// Sums `values` element-wise across all ranks of the participant and
    /// leaves the result on every rank.
    ///
    /// Worker buffers are accumulated on the coordinator in ascending rank
    /// order, so the floating-point reduction is deterministic.
    pub fn allreduce_sum(&self, values: &mut [f64]) -> Result<(), TransportError> {
        if self.size == 1 {
            return Ok(());
        }
        let link = self.link();
        if self.is_coordinator() {
            let mut incoming = vec![0.0; values.len()];
            for peer in 1..self.size {
                link.receive(&mut incoming, peer)?;
                for (acc, value) in values.iter_mut().zip(&incoming) {
                    *acc += value;
                }
            }
            for peer in 1..self.size {
                link.send(values, peer)?;
            }
        } else {
            link.send(values, 0)?;
            link.receive(values, 0)?;
        }
        Ok(())
    }
}

type SlotKey = (usize, usize); // (source, destination)

#[derive(Default)]
struct Mailbox {
    slots: Mutex<HashMap<SlotKey, VecDeque<Vec<f64>>>>,
    delivered: Condvar,
}

/// In-process transport connecting a fixed number of endpoints through a
/// shared mailbox of per-(source, destination) FIFOs.
///
/// Endpoints are cheap to clone into threads; an endpoint sending to its own
/// rank acts as a loopback link, which is how tests close the coupling loop
/// without a second participant.
pub struct LocalExchange;

impl LocalExchange {
    /// Creates `size` connected endpoints sharing one mailbox.
    pub fn endpoints(size: usize) -> Vec<LocalEndpoint> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| LocalEndpoint {
                rank,
                mailbox: mailbox.clone(),
            })
            .collect()
    }
}

/// One rank's endpoint of a [`LocalExchange`].
#[derive(Clone)]
pub struct LocalEndpoint {
    rank: usize,
    mailbox: Arc<Mailbox>,
}

impl LocalEndpoint {
    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl Transport for LocalEndpoint {
    fn is_connected(&self) -> bool {
        true
    }

    fn send(&self, buf: &[f64], peer: usize) -> Result<(), TransportError> {
        let mut slots = self.mailbox.slots.lock().expect("mailbox poisoned");
        slots
            .entry((self.rank, peer))
            .or_default()
            .push_back(buf.to_vec());
        self.mailbox.delivered.notify_all();
        Ok(())
    }

    fn receive(&self, buf: &mut [f64], peer: usize) -> Result<(), TransportError> {
        let mut slots = self.mailbox.slots.lock().expect("mailbox poisoned");
        loop {
            if let Some(frame) = slots
                .get_mut(&(peer, self.rank))
                .and_then(|queue| queue.pop_front())
            {
                if frame.len() != buf.len() {
                    return Err(TransportError::FrameSizeMismatch {
                        expected: buf.len(),
                        received: frame.len(),
                    });
                }
                buf.copy_from_slice(&frame);
                return Ok(());
            }
            slots = self
                .mailbox
                .delivered
                .wait(slots)
                .expect("mailbox poisoned");
        }
    }
}
