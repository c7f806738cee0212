// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The password-derived credential container. The envelope holds no
//! ciphertext: the client's long-term key is re-derived from the envelope
//! nonce and the randomized password, and the authenticator is an HMAC over
//! that re-derivable cleartext.

use crate::ciphersuite::{hash_len, scalar_len, CipherSuite};
use crate::encoding::encode_vector;
use crate::errors::{InternalError, ProtocolError};
use crate::key_schedule::{expand_label, NONCE_LEN};
use crate::keypair::{KeyPair, PublicKey};
use crate::opaque::{bytestrings_from_identifiers, Identifiers};
use crate::oprf;

use digest::Digest;
use generic_array::GenericArray;
use hmac::{Hmac, Mac, NewMac};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

static STR_AUTH_KEY: &[u8] = b"AuthKey";
static STR_EXPORT_KEY: &[u8] = b"ExportKey";
static STR_PRIVATE_KEY: &[u8] = b"PrivateKey";
static STR_MASKING_KEY: &[u8] = b"MaskingKey";

/// The envelope as stored inside a registration record: a nonce and an HMAC
/// over the cleartext credentials that nonce re-derives.
pub(crate) struct Envelope<CS: CipherSuite> {
    nonce: Vec<u8>,
    auth_tag: GenericArray<u8, <CS::Hash as Digest>::OutputSize>,
}

// Cannot be derived because it would require for CS to be Clone.
impl<CS: CipherSuite> Clone for Envelope<CS> {
    fn clone(&self) -> Self {
        Self {
            nonce: self.nonce.clone(),
            auth_tag: self.auth_tag.clone(),
        }
    }
}

// This can't be derived because of the use of a phantom parameter
impl<CS: CipherSuite> Zeroize for Envelope<CS> {
    fn zeroize(&mut self) {
        self.nonce.zeroize();
        self.auth_tag.zeroize();
    }
}

impl<CS: CipherSuite> Drop for Envelope<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Everything produced when sealing a fresh envelope during registration
pub(crate) struct SealedEnvelope<CS: CipherSuite> {
    pub(crate) envelope: Envelope<CS>,
    pub(crate) client_s_pk: PublicKey,
    pub(crate) masking_key: Vec<u8>,
    pub(crate) export_key: GenericArray<u8, <CS::Hash as Digest>::OutputSize>,
}

/// The result of a successful envelope recovery. The export key is
/// technically unrelated to the envelope's authenticated contents but shares
/// its derivation tree.
pub(crate) struct OpenedEnvelope<CS: CipherSuite> {
    pub(crate) client_static_keypair: KeyPair<CS::Group>,
    pub(crate) export_key: GenericArray<u8, <CS::Hash as Digest>::OutputSize>,
    pub(crate) id_u: Vec<u8>,
    pub(crate) id_s: Vec<u8>,
}

impl<CS: CipherSuite> Envelope<CS> {
    /// Seals a new envelope under a freshly sampled nonce
    pub(crate) fn seal<R: RngCore + CryptoRng>(
        rng: &mut R,
        randomized_pwd: &[u8],
        server_s_pk: &PublicKey,
        optional_ids: &Option<Identifiers>,
    ) -> Result<SealedEnvelope<CS>, ProtocolError> {
        let mut nonce = vec![0u8; NONCE_LEN];
        rng.try_fill_bytes(&mut nonce)
            .map_err(|_| ProtocolError::RngFailure)?;
        Self::seal_with_nonce(randomized_pwd, server_s_pk, nonce, optional_ids)
    }

    /// Seals an envelope under the given nonce. A new nonce must be used for
    /// each seal.
    pub(crate) fn seal_with_nonce(
        randomized_pwd: &[u8],
        server_s_pk: &PublicKey,
        nonce: Vec<u8>,
        optional_ids: &Option<Identifiers>,
    ) -> Result<SealedEnvelope<CS>, ProtocolError> {
        let client_static_keypair = derive_keypair::<CS>(randomized_pwd, &nonce)?;

        let mut auth_key =
            expand_label::<CS::Hash>(randomized_pwd, STR_AUTH_KEY, &nonce, hash_len::<CS>())?;
        let mut export_key =
            expand_label::<CS::Hash>(randomized_pwd, STR_EXPORT_KEY, &nonce, hash_len::<CS>())?;
        let masking_key = masking_key_from::<CS>(randomized_pwd)?;

        let (id_u, id_s) = bytestrings_from_identifiers(
            optional_ids,
            client_static_keypair.public(),
            server_s_pk,
        )?;
        let aad = cleartext_credentials(server_s_pk, &id_s, &id_u)?;

        let mut hmac =
            Hmac::<CS::Hash>::new_from_slice(&auth_key).map_err(|_| InternalError::HmacError)?;
        hmac.update(&nonce);
        hmac.update(&aad);
        let auth_tag = hmac.finalize().into_bytes();
        auth_key.zeroize();

        let result = SealedEnvelope {
            envelope: Self { nonce, auth_tag },
            client_s_pk: client_static_keypair.public().clone(),
            masking_key,
            export_key: GenericArray::clone_from_slice(&export_key),
        };
        export_key.zeroize();
        Ok(result)
    }

    /// Recomputes the envelope contents from the randomized password and
    /// verifies the authentication tag in constant time. Any mismatch is the
    /// single indistinguishable recovery failure.
    pub(crate) fn open(
        &self,
        randomized_pwd: &[u8],
        server_s_pk: &PublicKey,
        optional_ids: &Option<Identifiers>,
    ) -> Result<OpenedEnvelope<CS>, ProtocolError> {
        let client_static_keypair = derive_keypair::<CS>(randomized_pwd, &self.nonce)?;

        let mut auth_key =
            expand_label::<CS::Hash>(randomized_pwd, STR_AUTH_KEY, &self.nonce, hash_len::<CS>())?;
        let mut export_key = expand_label::<CS::Hash>(
            randomized_pwd,
            STR_EXPORT_KEY,
            &self.nonce,
            hash_len::<CS>(),
        )?;

        let (id_u, id_s) = bytestrings_from_identifiers(
            optional_ids,
            client_static_keypair.public(),
            server_s_pk,
        )?;
        let aad = cleartext_credentials(server_s_pk, &id_s, &id_u)?;

        let mut hmac =
            Hmac::<CS::Hash>::new_from_slice(&auth_key).map_err(|_| InternalError::HmacError)?;
        hmac.update(&self.nonce);
        hmac.update(&aad);
        auth_key.zeroize();
        if hmac.verify(&self.auth_tag).is_err() {
            export_key.zeroize();
            return Err(ProtocolError::CredentialRecoveryFailed);
        }

        let result = OpenedEnvelope {
            client_static_keypair,
            export_key: GenericArray::clone_from_slice(&export_key),
            id_u,
            id_s,
        };
        export_key.zeroize();
        Ok(result)
    }

    /// An envelope that serializes to the all-zeros byte string, used for
    /// the fake records of unknown credentials
    pub(crate) fn dummy() -> Self {
        Self {
            nonce: vec![0u8; NONCE_LEN],
            auth_tag: GenericArray::default(),
        }
    }

    pub(crate) fn serialize(&self) -> Vec<u8> {
        [&self.nonce[..], &self.auth_tag[..]].concat()
    }

    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != NONCE_LEN + hash_len::<CS>() {
            return Err(ProtocolError::InvalidMessageLength);
        }
        Ok(Self {
            nonce: bytes[..NONCE_LEN].to_vec(),
            auth_tag: GenericArray::clone_from_slice(&bytes[NONCE_LEN..]),
        })
    }
}

/// Deterministically re-derives the client's long-term keypair from the
/// randomized password and the envelope nonce
pub(crate) fn derive_keypair<CS: CipherSuite>(
    randomized_pwd: &[u8],
    nonce: &[u8],
) -> Result<KeyPair<CS::Group>, ProtocolError> {
    let mut keypair_seed =
        expand_label::<CS::Hash>(randomized_pwd, STR_PRIVATE_KEY, nonce, scalar_len::<CS>())?;
    let mut client_s_sk = oprf::derive_scalar::<CS>(&keypair_seed)?;
    keypair_seed.zeroize();
    let keypair = KeyPair::from_private_scalar(&client_s_sk);
    client_s_sk.zeroize();
    Ok(keypair)
}

/// Derives the masking key stored in the registration record and re-derived
/// by the client during login
pub(crate) fn masking_key_from<CS: CipherSuite>(
    randomized_pwd: &[u8],
) -> Result<Vec<u8>, InternalError> {
    expand_label::<CS::Hash>(randomized_pwd, STR_MASKING_KEY, b"", hash_len::<CS>())
}

/// `EncodeVector(pks) || EncodeVector(id_s) || EncodeVector(id_u)`, where the
/// identity arguments arrive already length-prefixed
fn cleartext_credentials(
    server_s_pk: &PublicKey,
    id_s: &[u8],
    id_u: &[u8],
) -> Result<Vec<u8>, InternalError> {
    Ok([&encode_vector(server_s_pk)?[..], id_s, id_u].concat())
}
