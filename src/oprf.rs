// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Low-level API
// =============
// This file contains an implementation of the two-message non-verifiable
// EC-OPRF on which both registration and login are built.

use crate::ciphersuite::CipherSuite;
use crate::encoding::{encode_vector, i2osp};
use crate::errors::{InternalError, ProtocolError};
use crate::group::Group;

use digest::Digest;
use generic_array::GenericArray;
use rand::{CryptoRng, RngCore};

static STR_HASH_TO_GROUP: &[u8] = b"HashToGroup-";
static STR_OPRF: &[u8] = b"OPRFV1-";
static STR_FINALIZE: &[u8] = b"Finalize";
static STR_DERIVE_KEYPAIR: &[u8] = b"OPAQUE-DeriveKeyPair";

// The OPRF always runs in the non-verifiable base mode.
const MODE_BASE: usize = 0;

/// The client state kept between Blind and Finalize: the input itself and the
/// blinding factor. A fresh blind is sampled for every run.
pub(crate) struct Token<G: Group> {
    pub(crate) data: Vec<u8>,
    pub(crate) blind: G::Scalar,
}

fn hash_to_group_dst<CS: CipherSuite>() -> Result<Vec<u8>, InternalError> {
    Ok([
        STR_HASH_TO_GROUP,
        STR_OPRF,
        &i2osp(MODE_BASE, 1)?,
        &i2osp(CS::OPRF_ID as usize, 2)?,
    ]
    .concat())
}

/// Computes the first step of the multiplicative blinding OPRF. The blinded
/// element is sent from the client (who holds the input) to the server (who
/// holds the OPRF key).
pub(crate) fn blind<R: RngCore + CryptoRng, CS: CipherSuite>(
    input: &[u8],
    blinding_factor_rng: &mut R,
) -> Result<(Token<CS::Group>, CS::Group), ProtocolError> {
    let blind = CS::Group::random_nonzero_scalar(blinding_factor_rng)?;
    let dst = hash_to_group_dst::<CS>()?;
    let blinded = CS::Group::hash_to_group(input, &dst) * &blind;

    Ok((
        Token {
            data: input.to_vec(),
            blind,
        },
        blinded,
    ))
}

/// Computes the second step of the OPRF, evaluating the server-held key on
/// the blinded element.
pub(crate) fn evaluate<G: Group>(point: G, oprf_key: &G::Scalar) -> G {
    point * oprf_key
}

/// Computes the third step of the OPRF, in which the client unblinds the
/// server's answer and hashes it down to the randomized password seed.
pub(crate) fn finalize<CS: CipherSuite>(
    input: &[u8],
    blind: &<CS::Group as Group>::Scalar,
    evaluated_element: CS::Group,
) -> Result<GenericArray<u8, <CS::Hash as Digest>::OutputSize>, ProtocolError> {
    if evaluated_element.is_identity() {
        return Err(ProtocolError::InvalidOprfOutput);
    }

    let unblinded = evaluated_element * &CS::Group::scalar_invert(blind);
    let mut hasher = CS::Hash::new();
    Digest::update(&mut hasher, &encode_vector(input)?);
    Digest::update(&mut hasher, &encode_vector(&unblinded.to_arr())?);
    Digest::update(&mut hasher, STR_FINALIZE);
    Ok(hasher.finalize())
}

/// Maps a uniformly random seed to a nonzero scalar, retrying with a counter
/// byte on the (cryptographically unreachable) zero output.
pub(crate) fn derive_scalar<CS: CipherSuite>(
    seed: &[u8],
) -> Result<<CS::Group as Group>::Scalar, InternalError> {
    for counter in 0u8..=255 {
        let scalar =
            CS::Group::hash_to_scalar(&[seed, &[counter]].concat(), STR_DERIVE_KEYPAIR);
        if !CS::Group::scalar_is_zero(&scalar) {
            return Ok(scalar);
        }
    }
    Err(InternalError::DeriveKeyPairError)
}

// Tests
// =====
