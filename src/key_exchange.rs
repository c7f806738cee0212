// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The 3DH authenticated key exchange layered over the credential flow. Both
//! sides combine three Diffie-Hellman products of long-term and ephemeral
//! keys into one input keying material and authenticate the transcript with
//! MACs keyed from it.

use crate::ciphersuite::{elem_len, CipherSuite};
use crate::errors::ProtocolError;
use crate::group::Group;
use crate::key_schedule::{derive_ake_keys, hmac, preamble, NONCE_LEN};
use crate::keypair::{KeyPair, PrivateKey, PublicKey};

use rand::{CryptoRng, RngCore};
use std::mem;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// The client's ephemeral state between KE1 and KE3
pub(crate) struct Ke1State<CS: CipherSuite> {
    pub(crate) client_e_sk: <CS::Group as Group>::Scalar,
    pub(crate) client_e_pk: PublicKey,
    pub(crate) client_nonce: Vec<u8>,
}

impl<CS: CipherSuite> Zeroize for Ke1State<CS> {
    fn zeroize(&mut self) {
        self.client_e_sk.zeroize();
        self.client_e_pk.zeroize();
        self.client_nonce.zeroize();
    }
}

impl<CS: CipherSuite> Drop for Ke1State<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The server's state between KE2 and KE3: the expected client MAC inputs
/// and the session key to release on success
pub(crate) struct Ke2State {
    pub(crate) km3: Vec<u8>,
    pub(crate) hashed_transcript: Vec<u8>,
    pub(crate) session_key: Vec<u8>,
}

impl Zeroize for Ke2State {
    fn zeroize(&mut self) {
        self.km3.zeroize();
        self.hashed_transcript.zeroize();
        self.session_key.zeroize();
    }
}

impl Drop for Ke2State {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// The authenticated part of KE2 produced by the server
pub(crate) struct Ke2Payload {
    pub(crate) server_nonce: Vec<u8>,
    pub(crate) server_e_pk: PublicKey,
    pub(crate) mac: Vec<u8>,
}

/// Samples the client's nonce and ephemeral keypair
pub(crate) fn generate_ke1<R: RngCore + CryptoRng, CS: CipherSuite>(
    rng: &mut R,
) -> Result<Ke1State<CS>, ProtocolError> {
    let mut client_nonce = vec![0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut client_nonce)
        .map_err(|_| ProtocolError::RngFailure)?;

    let client_e = KeyPair::<CS::Group>::generate_random(rng)?;
    let client_e_sk = KeyPair::<CS::Group>::scalar_from_private(client_e.private())?;

    Ok(Ke1State {
        client_e_sk,
        client_e_pk: client_e.public().clone(),
        client_nonce,
    })
}

/// The server flight: samples the ephemeral keypair and nonce, computes the
/// 3DH products, derives the session keys and authenticates the transcript
#[allow(clippy::too_many_arguments)]
pub(crate) fn generate_ke2<R: RngCore + CryptoRng, CS: CipherSuite>(
    rng: &mut R,
    serialized_ke1: &[u8],
    credential_response: &[u8],
    client_e_pk: &PublicKey,
    client_s_pk: &PublicKey,
    server_s_sk: &PrivateKey,
    id_u: &[u8],
    id_s: &[u8],
    context: &[u8],
) -> Result<(Ke2State, Ke2Payload), ProtocolError> {
    let mut server_nonce = vec![0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut server_nonce)
        .map_err(|_| ProtocolError::RngFailure)?;

    let server_e = KeyPair::<CS::Group>::generate_random(rng)?;
    let mut server_e_sk = KeyPair::<CS::Group>::scalar_from_private(server_e.private())?;
    let mut server_s_sk_scalar = KeyPair::<CS::Group>::scalar_from_private(server_s_sk)?;

    let mut ikm = Vec::with_capacity(3 * elem_len::<CS>());
    ikm.extend_from_slice(&KeyPair::<CS::Group>::diffie_hellman(
        client_e_pk,
        &server_e_sk,
    )?);
    ikm.extend_from_slice(&KeyPair::<CS::Group>::diffie_hellman(
        client_e_pk,
        &server_s_sk_scalar,
    )?);
    ikm.extend_from_slice(&KeyPair::<CS::Group>::diffie_hellman(
        client_s_pk,
        &server_e_sk,
    )?);
    server_e_sk.zeroize();
    server_s_sk_scalar.zeroize();

    let transcript = preamble(
        context,
        id_u,
        serialized_ke1,
        id_s,
        credential_response,
        &server_nonce,
        server_e.public(),
    )?;

    let mut keys = derive_ake_keys::<CS::Hash>(&ikm, &transcript, server_e.public())?;
    ikm.zeroize();

    Ok((
        Ke2State {
            km3: mem::take(&mut keys.km3),
            hashed_transcript: mem::take(&mut keys.hashed_transcript),
            session_key: mem::take(&mut keys.session_key),
        },
        Ke2Payload {
            server_nonce,
            server_e_pk: server_e.public().clone(),
            mac: mem::take(&mut keys.server_mac),
        },
    ))
}

/// The client flight: recomputes the 3DH products with the recovered
/// long-term key, verifies the server MAC in constant time, and produces the
/// client MAC together with the session key
#[allow(clippy::too_many_arguments)]
pub(crate) fn generate_ke3<CS: CipherSuite>(
    serialized_ke1: &[u8],
    credential_response: &[u8],
    server_nonce: &[u8],
    server_e_pk: &PublicKey,
    server_mac: &[u8],
    ke1_state: &Ke1State<CS>,
    server_s_pk: &PublicKey,
    client_s_sk: &<CS::Group as Group>::Scalar,
    id_u: &[u8],
    id_s: &[u8],
    context: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    let mut ikm = Vec::with_capacity(3 * elem_len::<CS>());
    ikm.extend_from_slice(&KeyPair::<CS::Group>::diffie_hellman(
        server_e_pk,
        &ke1_state.client_e_sk,
    )?);
    ikm.extend_from_slice(&KeyPair::<CS::Group>::diffie_hellman(
        server_s_pk,
        &ke1_state.client_e_sk,
    )?);
    ikm.extend_from_slice(&KeyPair::<CS::Group>::diffie_hellman(
        server_e_pk,
        client_s_sk,
    )?);

    let transcript = preamble(
        context,
        id_u,
        serialized_ke1,
        id_s,
        credential_response,
        server_nonce,
        server_e_pk,
    )?;

    let mut keys = derive_ake_keys::<CS::Hash>(&ikm, &transcript, server_e_pk)?;
    ikm.zeroize();

    if !bool::from(keys.server_mac.ct_eq(server_mac)) {
        return Err(ProtocolError::ServerAuthenticationFailed);
    }

    let client_mac = hmac::<CS::Hash>(&keys.km3, &[&keys.hashed_transcript])?;
    let session_key = mem::take(&mut keys.session_key);

    Ok((session_key, client_mac))
}

/// The server's final check of the client MAC, in constant time
pub(crate) fn finish_ke<CS: CipherSuite>(
    state: &Ke2State,
    client_mac: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    let mut expected_mac = hmac::<CS::Hash>(&state.km3, &[&state.hashed_transcript])?;
    let matches = bool::from(expected_mac.ct_eq(client_mac));
    expected_mac.zeroize();
    if !matches {
        return Err(ProtocolError::ClientAuthenticationFailed);
    }
    Ok(state.session_key.clone())
}
