/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the error types surfaced by the mapping core and its transports.
//
// Created on: 21 Apr 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use thiserror::Error;

/// Failures reported by an underlying point-to-point transport.
///
/// The mapping core performs no retry; transport failures propagate upward
/// unchanged and the caller is expected to tear down and rebuild the
/// affected state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint has not been connected, or the peer hung up.
    #[error("transport endpoint is not connected")]
    NotConnected,

    /// The peer closed its side of the channel mid-operation.
    #[error("peer rank {0} closed the channel")]
    ChannelClosed(usize),

    /// A received frame did not match the posted buffer size.
    #[error("received a frame of {received} values where {expected} were expected")]
    FrameSizeMismatch { expected: usize, received: usize },
}

/// Failures reported by mapping computation and application.
///
/// Precondition violations (unset meshes, mapping used before
/// `compute_mapping`, mismatched value dimensions, rank misuse) are
/// programming errors and abort instead of returning a variant.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Cholesky factorisation failed: the kernel matrix is not numerically
    /// positive definite.
    #[error("kernel system factorisation failed: matrix is not positive definite")]
    NotPositiveDefinite,

    /// The kernel system is singular, typically because two centers
    /// coincide under the active-axis mask.
    #[error("kernel system is singular: input mesh contains coincident vertices")]
    SingularSystem,

    /// Rescaling a consistent mapping is impossible: the output surface
    /// integral is zero while the input integral is not.
    #[error("output surface integral is zero; cannot match a non-zero input integral")]
    DegenerateSurfaceIntegral,

    /// An underlying transport failed during a collective step.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
