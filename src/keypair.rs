// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the keypair types that must be supplied for the OPAQUE API

#![allow(unsafe_code)]

use crate::errors::{InternalError, ProtocolError};
use crate::group::Group;
use generic_array::{typenum::Unsigned, GenericArray};
use rand::{CryptoRng, RngCore};
use std::marker::PhantomData;
use std::ops::Deref;
use zeroize::Zeroize;

/// A minimalist key type built around a byte vector
#[derive(Debug, PartialEq, Eq, Clone, Hash, Zeroize)]
// Ensure Key material is zeroed after use.
#[zeroize(drop)]
#[repr(transparent)]
pub struct Key(Vec<u8>);

impl Deref for Key {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Key {
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        Key(bytes.to_vec())
    }
}

/// Wrapper around a Key to enforce that it's a private one.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Zeroize)]
// Ensure Key material is zeroed after use.
#[zeroize(drop)]
#[repr(transparent)]
pub struct PrivateKey(Key);

impl Deref for PrivateKey {
    type Target = Key;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PrivateKey {
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        PrivateKey(Key::from_slice(bytes))
    }
}

/// Wrapper around a Key to enforce that it's a public one.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Zeroize)]
// Ensure Key material is zeroed after use.
#[zeroize(drop)]
#[repr(transparent)]
pub struct PublicKey(Key);

impl Deref for PublicKey {
    type Target = Key;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PublicKey {
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        PublicKey(Key::from_slice(bytes))
    }
}

/// A keypair with public-private verification
pub struct KeyPair<G> {
    pk: PublicKey,
    sk: PrivateKey,
    _g: PhantomData<G>,
}

impl<G> Clone for KeyPair<G> {
    fn clone(&self) -> Self {
        Self {
            pk: self.pk.clone(),
            sk: self.sk.clone(),
            _g: PhantomData,
        }
    }
}

// This can't be derived because of the use of a phantom parameter
impl<G> Zeroize for KeyPair<G> {
    fn zeroize(&mut self) {
        self.pk.zeroize();
        self.sk.zeroize();
    }
}

impl<G> Drop for KeyPair<G> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<G: Group> KeyPair<G> {
    /// The public key component
    pub fn public(&self) -> &PublicKey {
        &self.pk
    }

    /// The private key component
    pub fn private(&self) -> &PrivateKey {
        &self.sk
    }

    /// Generating a random key pair given a cryptographic rng
    pub(crate) fn generate_random<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self, InternalError> {
        let sk = G::random_nonzero_scalar(rng)?;
        let sk_bytes = G::scalar_as_bytes(&sk);
        let pk = G::base_point() * &sk;
        Ok(Self {
            pk: PublicKey::from_slice(&pk.to_arr()),
            sk: PrivateKey::from_slice(&sk_bytes),
            _g: PhantomData,
        })
    }

    /// Builds a keypair from a private scalar
    pub(crate) fn from_private_scalar(sk: &G::Scalar) -> Self {
        let pk = G::base_point() * sk;
        Self {
            pk: PublicKey::from_slice(&pk.to_arr()),
            sk: PrivateKey::from_slice(&G::scalar_as_bytes(sk)),
            _g: PhantomData,
        }
    }

    /// Obtaining a public key from secret bytes. At all times, we should have
    /// &public_from_private(self.private()) == self.public()
    pub(crate) fn public_from_private(sk: &PrivateKey) -> Result<PublicKey, ProtocolError> {
        let scalar = Self::scalar_from_private(sk)?;
        let pk = G::base_point() * &scalar;
        Ok(PublicKey::from_slice(&pk.to_arr()))
    }

    /// Parses the private key bytes back into a scalar
    pub(crate) fn scalar_from_private(sk: &PrivateKey) -> Result<G::Scalar, ProtocolError> {
        if sk.len() != G::ScalarLen::to_usize() {
            return Err(ProtocolError::InvalidScalarEncoding);
        }
        G::from_scalar_slice(GenericArray::from_slice(sk))
    }

    /// Check whether a public key is valid. This is meant to be applied on
    /// material provided through the network which fits the key
    /// representation (i.e. can be mapped to a curve point), but presents
    /// some risk - e.g. small subgroup check
    pub(crate) fn check_public_key(key: PublicKey) -> Result<PublicKey, ProtocolError> {
        if key.len() != G::ElemLen::to_usize() {
            return Err(ProtocolError::InvalidPointEncoding);
        }
        G::from_element_slice(GenericArray::from_slice(&key)).map(|_| key)
    }

    /// Computes the diffie hellman function on a public key and private key,
    /// returning the canonical encoding of the product
    pub(crate) fn diffie_hellman(pk: &PublicKey, sk: &G::Scalar) -> Result<Vec<u8>, ProtocolError> {
        if pk.len() != G::ElemLen::to_usize() {
            return Err(ProtocolError::InvalidPointEncoding);
        }
        let point = G::from_element_slice(GenericArray::from_slice(&pk))?;
        Ok((point * sk).to_arr().to_vec())
    }

    /// Obtains a KeyPair from a slice representing the private key
    pub fn from_private_key_slice(input: &[u8]) -> Result<Self, ProtocolError> {
        let sk = PrivateKey::from_slice(input);
        let pk = Self::public_from_private(&sk)?;
        Ok(Self {
            pk,
            sk,
            _g: PhantomData,
        })
    }
}
