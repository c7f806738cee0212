// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The HKDF derivation tree shared by the envelope and the key exchange

use crate::encoding::{encode_vector, i2osp};
use crate::errors::InternalError;
use crate::ciphersuite::Hash;

use digest::Digest;
use generic_array::typenum::Unsigned;
use hkdf::Hkdf;
use hmac::{Hmac, Mac, NewMac};
use zeroize::Zeroize;

/// Byte length of every nonce in the protocol (Nn)
pub(crate) const NONCE_LEN: usize = 32;

static STR_OPAQUE: &[u8] = b"OPAQUE-";
static STR_OPAQUE_VERSION: &[u8] = b"OPAQUEv1-";
static STR_SERVER_MAC: &[u8] = b"ServerMAC";
static STR_CLIENT_MAC: &[u8] = b"ClientMAC";
static STR_SESSION_KEY: &[u8] = b"SessionKey";

/// HKDF-Expand with the protocol's label framing:
/// `I2OSP(L, 2) || EncodeVector("OPAQUE-" || label) || EncodeVector(context)`
pub(crate) fn expand_label<D: Hash>(
    prk: &[u8],
    label: &[u8],
    context: &[u8],
    length: usize,
) -> Result<Vec<u8>, InternalError> {
    let info = [
        i2osp(length, 2)?,
        encode_vector(&[STR_OPAQUE, label].concat())?,
        encode_vector(context)?,
    ]
    .concat();

    let h = Hkdf::<D>::from_prk(prk).map_err(|_| InternalError::HkdfError)?;
    let mut okm = vec![0u8; length];
    h.expand(&info, &mut okm)
        .map_err(|_| InternalError::HkdfError)?;
    Ok(okm)
}

/// HMAC over the concatenation of `parts`
pub(crate) fn hmac<D: Hash>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, InternalError> {
    let mut mac = Hmac::<D>::new_from_slice(key).map_err(|_| InternalError::HmacError)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// The transcript preamble both sides authenticate:
/// `"OPAQUEv1-" || EncodeVector(context) || EncodeVector(id_u) || KE1 ||
/// EncodeVector(id_s) || credential_response || nonce_s || epk_s`
///
/// The identity arguments arrive already length-prefixed.
pub(crate) fn preamble(
    context: &[u8],
    id_u: &[u8],
    serialized_ke1: &[u8],
    id_s: &[u8],
    credential_response: &[u8],
    server_nonce: &[u8],
    server_e_pk: &[u8],
) -> Result<Vec<u8>, InternalError> {
    Ok([
        STR_OPAQUE_VERSION,
        &encode_vector(context)?,
        id_u,
        serialized_ke1,
        id_s,
        credential_response,
        server_nonce,
        server_e_pk,
    ]
    .concat())
}

/// Session keys derived from one 3DH shared secret. Both sides compute the
/// identical set. Consumers move fields out with `mem::take`; whatever is
/// left zeroizes on drop.
pub(crate) struct AkeKeys {
    pub(crate) km3: Vec<u8>,
    pub(crate) session_key: Vec<u8>,
    pub(crate) server_mac: Vec<u8>,
    pub(crate) hashed_transcript: Vec<u8>,
}

impl Zeroize for AkeKeys {
    fn zeroize(&mut self) {
        self.km3.zeroize();
        self.session_key.zeroize();
        self.server_mac.zeroize();
        self.hashed_transcript.zeroize();
    }
}

impl Drop for AkeKeys {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Runs the session key schedule: extract the 3DH input keying material with
/// a zero salt, then derive the server MAC key, the session key, the server
/// MAC itself, and the client MAC key bound to the extended transcript.
pub(crate) fn derive_ake_keys<D: Hash>(
    ikm: &[u8],
    preamble: &[u8],
    server_e_pk: &[u8],
) -> Result<AkeKeys, InternalError> {
    let nh = <D as Digest>::OutputSize::to_usize();
    let zeros = vec![0u8; nh];
    let (prk, _) = Hkdf::<D>::extract(Some(&zeros), ikm);

    let hashed_preamble = D::digest(preamble);

    let mut km2 = expand_label::<D>(&prk, STR_SERVER_MAC, &hashed_preamble, nh)?;
    let session_key = expand_label::<D>(&prk, STR_SESSION_KEY, &hashed_preamble, nh)?;
    let server_mac = hmac::<D>(&km2, &[&hashed_preamble, server_e_pk])?;
    km2.zeroize();

    let hashed_transcript = D::new()
        .chain(preamble)
        .chain(server_e_pk)
        .chain(&server_mac)
        .finalize()
        .to_vec();
    let km3 = expand_label::<D>(&prk, STR_CLIENT_MAC, &hashed_transcript, nh)?;

    Ok(AkeKeys {
        km3,
        session_key,
        server_mac,
        hashed_transcript,
    })
}
