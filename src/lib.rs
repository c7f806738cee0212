// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the OPAQUE asymmetric password authenticated key
//! exchange protocol
//!
//! OPAQUE is a protocol between a client and a server. It lets the two
//! mutually authenticate from a client-remembered password, without the
//! server ever learning the password or anything password-equivalent, and
//! produces a high-entropy session key on both sides. A successful run also
//! gives the client a private export key, suitable for encrypting
//! application data held server-side.
//!
//! # Overview
//!
//! Both parties must first agree on a collection of primitives to be kept
//! consistent throughout protocol execution. These include:
//! * a finite cyclic group along with a point representation,
//! * a hashing function, and
//! * a key stretching function.
//!
//! We will use the following choices in this example:
//! ```
//! use opaque_auth::ciphersuite::CipherSuite;
//! use opaque_auth::configuration::{AkeGroupId, HashId, KsfId, OprfSuiteId};
//! struct Default;
//! impl CipherSuite for Default {
//!     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//!     type Hash = sha2::Sha512;
//!     type Ksf = opaque_auth::ksf::Identity;
//!     const OPRF_ID: OprfSuiteId = OprfSuiteId::Ristretto255Sha512;
//!     const KDF_ID: HashId = HashId::Sha512;
//!     const MAC_ID: HashId = HashId::Sha512;
//!     const HASH_ID: HashId = HashId::Sha512;
//!     const KSF_ID: KsfId = KsfId::Identity;
//!     const AKE_ID: AkeGroupId = AkeGroupId::Ristretto255;
//! }
//! ```
//!
//! Note that our choice of key stretching function in this example,
//! [Identity](crate::ksf::Identity), is selected only to ensure that the
//! tests execute quickly. A real application should use a memory-hard
//! function such as Argon2id, as the provided
//! [Ristretto255Sha512](crate::ciphersuite::Ristretto255Sha512) suite does.
//!
//! ## Setup
//! To set up the protocol, the server generates its long-term state: a
//! static keypair, the seed from which all per-credential OPRF keys are
//! derived, and the seed of the fake records answering unknown credentials.
//! ```
//! # use opaque_auth::ciphersuite::CipherSuite;
//! # use opaque_auth::configuration::{AkeGroupId, HashId, KsfId, OprfSuiteId};
//! # use opaque_auth::errors::ProtocolError;
//! # struct Default;
//! # impl CipherSuite for Default {
//! #     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//! #     type Hash = sha2::Sha512;
//! #     type Ksf = opaque_auth::ksf::Identity;
//! #     const OPRF_ID: OprfSuiteId = OprfSuiteId::Ristretto255Sha512;
//! #     const KDF_ID: HashId = HashId::Sha512;
//! #     const MAC_ID: HashId = HashId::Sha512;
//! #     const HASH_ID: HashId = HashId::Sha512;
//! #     const KSF_ID: KsfId = KsfId::Identity;
//! #     const AKE_ID: AkeGroupId = AkeGroupId::Ristretto255;
//! # }
//! use opaque_auth::ServerSetup;
//! use rand::rngs::OsRng;
//! let mut rng = OsRng;
//! let server_setup = ServerSetup::<Default>::new(&mut rng)?;
//! # Ok::<(), ProtocolError>(())
//! ```
//! The server must persist this state for the registration and login steps.
//!
//! ## Registration
//! The registration protocol consists of four steps along with three
//! messages: [RegistrationRequest], [RegistrationResponse], and
//! [RegistrationRecord]. A successful execution results in the server
//! holding a record for the client's credential, typically stored under a
//! server-chosen credential identifier and retrieved upon login attempts.
//! ```
//! # use opaque_auth::ciphersuite::CipherSuite;
//! # use opaque_auth::configuration::{AkeGroupId, HashId, KsfId, OprfSuiteId};
//! # use opaque_auth::errors::ProtocolError;
//! # struct Default;
//! # impl CipherSuite for Default {
//! #     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//! #     type Hash = sha2::Sha512;
//! #     type Ksf = opaque_auth::ksf::Identity;
//! #     const OPRF_ID: OprfSuiteId = OprfSuiteId::Ristretto255Sha512;
//! #     const KDF_ID: HashId = HashId::Sha512;
//! #     const MAC_ID: HashId = HashId::Sha512;
//! #     const HASH_ID: HashId = HashId::Sha512;
//! #     const KSF_ID: KsfId = KsfId::Identity;
//! #     const AKE_ID: AkeGroupId = AkeGroupId::Ristretto255;
//! # }
//! use opaque_auth::{
//!     ClientRegistration, ClientRegistrationFinishParameters, ServerRegistration, ServerSetup,
//! };
//! use rand::rngs::OsRng;
//! let mut rng = OsRng;
//! let server_setup = ServerSetup::<Default>::new(&mut rng)?;
//!
//! // Client: blind the password
//! let client_start = ClientRegistration::<Default>::start(&mut rng, b"password")?;
//! // Server: evaluate the OPRF under this credential's key
//! let server_start = ServerRegistration::<Default>::start(
//!     &server_setup,
//!     client_start.message,
//!     b"alice@example.com",
//! )?;
//! // Client: unblind, seal the envelope, emit the record
//! let client_finish = client_start.state.finish(
//!     &mut rng,
//!     server_start.message,
//!     ClientRegistrationFinishParameters::default(),
//! )?;
//! // Server: persist the record
//! let password_file = ServerRegistration::<Default>::finish(client_finish.message);
//! # Ok::<(), ProtocolError>(())
//! ```
//!
//! ## Login
//! The login protocol also consists of four steps along with three messages:
//! [KE1], [KE2], and [KE3]. It succeeds only if the client supplies the same
//! password the record was registered with; the two sides then share a
//! session key, and the client recovers the same export key it obtained
//! during registration.
//! ```
//! # use opaque_auth::ciphersuite::CipherSuite;
//! # use opaque_auth::configuration::{AkeGroupId, HashId, KsfId, OprfSuiteId};
//! # use opaque_auth::errors::ProtocolError;
//! # struct Default;
//! # impl CipherSuite for Default {
//! #     type Group = curve25519_dalek::ristretto::RistrettoPoint;
//! #     type Hash = sha2::Sha512;
//! #     type Ksf = opaque_auth::ksf::Identity;
//! #     const OPRF_ID: OprfSuiteId = OprfSuiteId::Ristretto255Sha512;
//! #     const KDF_ID: HashId = HashId::Sha512;
//! #     const MAC_ID: HashId = HashId::Sha512;
//! #     const HASH_ID: HashId = HashId::Sha512;
//! #     const KSF_ID: KsfId = KsfId::Identity;
//! #     const AKE_ID: AkeGroupId = AkeGroupId::Ristretto255;
//! # }
//! # use opaque_auth::{
//! #     ClientRegistration, ClientRegistrationFinishParameters, ServerRegistration, ServerSetup,
//! # };
//! use opaque_auth::{
//!     ClientLogin, ClientLoginFinishParameters, ServerLogin, ServerLoginStartParameters,
//! };
//! use rand::rngs::OsRng;
//! let mut rng = OsRng;
//! # let server_setup = ServerSetup::<Default>::new(&mut rng)?;
//! # let client_start = ClientRegistration::<Default>::start(&mut rng, b"password")?;
//! # let server_start = ServerRegistration::<Default>::start(
//! #     &server_setup,
//! #     client_start.message,
//! #     b"alice@example.com",
//! # )?;
//! # let client_finish = client_start.state.finish(
//! #     &mut rng,
//! #     server_start.message,
//! #     ClientRegistrationFinishParameters::default(),
//! # )?;
//! # let password_file = ServerRegistration::<Default>::finish(client_finish.message);
//!
//! // Client: blind the password, sample the ephemeral key, emit KE1
//! let client_login_start = ClientLogin::<Default>::start(&mut rng, b"password")?;
//! // Server: evaluate the OPRF, mask the record, authenticate, emit KE2
//! let server_login_start = ServerLogin::<Default>::start(
//!     &mut rng,
//!     &server_setup,
//!     Some(password_file),
//!     client_login_start.message,
//!     b"alice@example.com",
//!     ServerLoginStartParameters::default(),
//! )?;
//! // Client: recover the envelope, verify the server, emit KE3
//! let client_login_finish = client_login_start.state.finish(
//!     server_login_start.message,
//!     ClientLoginFinishParameters::default(),
//! )?;
//! // Server: verify the client and release the session key
//! let server_login_finish = server_login_start.state.finish(client_login_finish.message)?;
//!
//! assert_eq!(
//!     client_login_finish.session_key,
//!     server_login_finish.session_key,
//! );
//! # Ok::<(), ProtocolError>(())
//! ```
//! On failure, the client reports
//! [CredentialRecoveryFailed](errors::ProtocolError::CredentialRecoveryFailed)
//! without learning whether the password was wrong, the credential unknown,
//! or the response tampered with; the server reports
//! [ClientAuthenticationFailed](errors::ProtocolError::ClientAuthenticationFailed)
//! when KE3 does not verify.

#![deny(missing_docs)]
#![deny(unsafe_code)]

#[cfg(not(any(feature = "u64_backend", feature = "u32_backend",)))]
compile_error!(
    "no dalek arithmetic backend cargo feature enabled! \
     please enable one of: u64_backend, u32_backend"
);

// Error types
pub mod errors;

// High-level API
mod opaque;

mod messages;

pub mod ciphersuite;
pub mod configuration;
mod envelope;
pub mod group;
pub mod keypair;
pub mod ksf;

mod encoding;
mod key_exchange;
mod key_schedule;
mod oprf;

#[cfg(test)]
mod tests;

// Exports

pub use crate::messages::{
    RegistrationRecord, RegistrationRequest, RegistrationResponse, KE1, KE2, KE3,
};
pub use crate::opaque::{
    ClientLogin, ClientLoginFinishParameters, ClientLoginFinishResult, ClientLoginStartResult,
    ClientRegistration, ClientRegistrationFinishParameters, ClientRegistrationFinishResult,
    ClientRegistrationStartResult, Identifiers, ServerLogin, ServerLoginFinishResult,
    ServerLoginStartParameters, ServerLoginStartResult, ServerRegistration,
    ServerRegistrationStartResult, ServerSetup,
};
