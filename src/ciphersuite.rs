// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Defines the CipherSuite trait to specify the underlying primitives for
//! OPAQUE

use crate::configuration::{AkeGroupId, HashId, KsfId, OprfSuiteId};
use crate::group::Group;
use crate::ksf::Ksf;

use digest::{BlockInput, Digest, FixedOutput, Reset, Update};
use generic_array::typenum::Unsigned;

/// Trait inheriting the digest requirements a suite hash must satisfy to
/// drive HKDF and HMAC
pub trait Hash: Update + BlockInput + FixedOutput + Reset + Default + Clone {}

impl<T: Update + BlockInput + FixedOutput + Reset + Default + Clone> Hash for T {}

/// Configures the underlying primitives used in OPAQUE
/// * `Group`: a finite cyclic group along with a point representation, shared
///   by the OPRF and the key exchange
/// * `Hash`: the main hash function, also parameterizing HKDF and HMAC
/// * `Ksf`: the memory-hard key stretching function applied to OPRF outputs
///
/// The associated constants carry the registry identifiers of the chosen
/// primitives, so a [Configuration](crate::configuration::Configuration) can
/// be produced from (and checked against) a compiled suite.
pub trait CipherSuite {
    /// A finite cyclic group along with a point representation
    type Group: Group;
    /// The main hash function
    type Hash: Hash;
    /// The key stretching function
    type Ksf: Ksf;

    /// Registry identifier of the OPRF ciphersuite
    const OPRF_ID: OprfSuiteId;
    /// Registry identifier of the KDF hash
    const KDF_ID: HashId;
    /// Registry identifier of the MAC hash
    const MAC_ID: HashId;
    /// Registry identifier of the plain hash
    const HASH_ID: HashId;
    /// Registry identifier of the key stretching function
    const KSF_ID: KsfId;
    /// Registry identifier of the key exchange group
    const AKE_ID: AkeGroupId;
}

/// The recommended ciphersuite: ristretto255 with SHA-512 and Argon2id
pub struct Ristretto255Sha512;

impl CipherSuite for Ristretto255Sha512 {
    type Group = curve25519_dalek::ristretto::RistrettoPoint;
    type Hash = sha2::Sha512;
    type Ksf = argon2::Argon2<'static>;

    const OPRF_ID: OprfSuiteId = OprfSuiteId::Ristretto255Sha512;
    const KDF_ID: HashId = HashId::Sha512;
    const MAC_ID: HashId = HashId::Sha512;
    const HASH_ID: HashId = HashId::Sha512;
    const KSF_ID: KsfId = KsfId::Argon2id;
    const AKE_ID: AkeGroupId = AkeGroupId::Ristretto255;
}

/// Byte length of a serialized group element (Np)
pub(crate) fn elem_len<CS: CipherSuite>() -> usize {
    <CS::Group as Group>::ElemLen::to_usize()
}

/// Byte length of a serialized scalar (Ns)
pub(crate) fn scalar_len<CS: CipherSuite>() -> usize {
    <CS::Group as Group>::ScalarLen::to_usize()
}

/// Byte length of a hash or MAC output (Nh, Nm)
pub(crate) fn hash_len<CS: CipherSuite>() -> usize {
    <CS::Hash as Digest>::OutputSize::to_usize()
}

/// Byte length of a serialized envelope (Ne)
pub(crate) fn envelope_len<CS: CipherSuite>() -> usize {
    crate::key_schedule::NONCE_LEN + hash_len::<CS>()
}

/// Byte length of the masked credential response (Np + Ne)
pub(crate) fn masked_response_len<CS: CipherSuite>() -> usize {
    elem_len::<CS>() + envelope_len::<CS>()
}
