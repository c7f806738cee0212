// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A list of error types which are produced during an execution of the protocol
use displaydoc::Display;
use thiserror::Error;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum InternalError {
    /// Invalid length for {name}: expected {len}, but is actually {actual_len}.
    SizeError {
        /// name
        name: &'static str,
        /// length
        len: usize,
        /// actual
        actual_len: usize,
    },
    /// Computing HKDF failed while deriving subkeys
    HkdfError,
    /// Computing HMAC failed while supplying a MAC key
    HmacError,
    /// Computing the key stretching function failed
    KsfError,
    /// Deriving a keypair from its seed exhausted the retry counter
    DeriveKeyPairError,
    /// The cryptographically secure random source failed to produce bytes
    RngError,
    /// A byte string was too long for its length encoding
    EncodingOverflow,
}

/// Represents an error occurring during a protocol run
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// Internal error during the protocol run: {0}
    Internal(InternalError),
    /// A message does not match the exact length of its layout
    InvalidMessageLength,
    /// A group element encoding was rejected
    InvalidPointEncoding,
    /// A scalar encoding was rejected
    InvalidScalarEncoding,
    /// The evaluated OPRF element was rejected
    InvalidOprfOutput,
    /// The credential envelope could not be recovered
    CredentialRecoveryFailed,
    /// The server authentication tag did not verify
    ServerAuthenticationFailed,
    /// The client authentication tag did not verify
    ClientAuthenticationFailed,
    /// The configuration carries an unregistered identifier
    ConfigurationInvalid,
    /// Reading from the system random source failed
    RngFailure,
}

impl From<InternalError> for ProtocolError {
    fn from(e: InternalError) -> ProtocolError {
        match e {
            InternalError::RngError => ProtocolError::RngFailure,
            e => ProtocolError::Internal(e),
        }
    }
}
