// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The prime-order group abstraction consumed by the OPRF and the key
//! exchange, together with its ristretto255 backend

use crate::errors::{InternalError, ProtocolError};

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use generic_array::{typenum::U32, ArrayLength, GenericArray};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use std::ops::Mul;
use zeroize::Zeroize;

/// A prime-order subgroup of a base field (EC, prime-order field ...). This
/// subgroup is noted additively in this trait.
pub trait Group:
    Copy + Sized + PartialEq + for<'a> Mul<&'a <Self as Group>::Scalar, Output = Self>
{
    /// The type of base field scalars
    type Scalar: Zeroize + Copy + PartialEq;
    /// The byte length necessary to represent scalars
    type ScalarLen: ArrayLength<u8>;
    /// The byte length necessary to represent group elements
    type ElemLen: ArrayLength<u8>;

    /// Picks a uniformly random nonzero scalar
    fn random_nonzero_scalar<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self::Scalar, InternalError>;

    /// Returns a scalar from its fixed-length bytes representation, rejecting
    /// zero and non-canonical encodings
    fn from_scalar_slice(
        scalar_bits: &GenericArray<u8, Self::ScalarLen>,
    ) -> Result<Self::Scalar, ProtocolError>;

    /// Serializes a scalar to its canonical fixed-length representation
    fn scalar_as_bytes(scalar: &Self::Scalar) -> GenericArray<u8, Self::ScalarLen>;

    /// The multiplicative inverse of this scalar
    fn scalar_invert(scalar: &Self::Scalar) -> Self::Scalar;

    /// Whether this scalar is the additive identity
    fn scalar_is_zero(scalar: &Self::Scalar) -> bool;

    /// Returns an element from its fixed-length bytes representation,
    /// rejecting the identity and invalid encodings
    fn from_element_slice(
        element_bits: &GenericArray<u8, Self::ElemLen>,
    ) -> Result<Self, ProtocolError>;

    /// Serializes the `self` group element to its canonical encoding
    fn to_arr(&self) -> GenericArray<u8, Self::ElemLen>;

    /// The fixed generator of the group
    fn base_point() -> Self;

    /// Whether this element is the identity
    fn is_identity(&self) -> bool;

    /// Hashes an input with a domain separation tag to a uniformly
    /// distributed group element
    fn hash_to_group(input: &[u8], dst: &[u8]) -> Self;

    /// Hashes an input with a domain separation tag to a uniformly
    /// distributed scalar
    fn hash_to_scalar(input: &[u8], dst: &[u8]) -> Self::Scalar;
}

/// The implementation of such a subgroup for ristretto255
impl Group for RistrettoPoint {
    type Scalar = Scalar;
    type ScalarLen = U32;
    type ElemLen = U32;

    fn random_nonzero_scalar<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self::Scalar, InternalError> {
        loop {
            let mut scalar_bytes = [0u8; 64];
            rng.try_fill_bytes(&mut scalar_bytes)
                .map_err(|_| InternalError::RngError)?;
            let scalar = Scalar::from_bytes_mod_order_wide(&scalar_bytes);
            scalar_bytes[..].zeroize();
            if scalar != Scalar::zero() {
                break Ok(scalar);
            }
        }
    }

    fn from_scalar_slice(
        scalar_bits: &GenericArray<u8, Self::ScalarLen>,
    ) -> Result<Self::Scalar, ProtocolError> {
        let mut bits = [0u8; 32];
        bits.copy_from_slice(scalar_bits);
        match Scalar::from_canonical_bytes(bits) {
            Some(scalar) if scalar != Scalar::zero() => Ok(scalar),
            _ => Err(ProtocolError::InvalidScalarEncoding),
        }
    }

    fn scalar_as_bytes(scalar: &Self::Scalar) -> GenericArray<u8, Self::ScalarLen> {
        GenericArray::clone_from_slice(scalar.as_bytes())
    }

    fn scalar_invert(scalar: &Self::Scalar) -> Self::Scalar {
        scalar.invert()
    }

    fn scalar_is_zero(scalar: &Self::Scalar) -> bool {
        scalar == &Scalar::zero()
    }

    fn from_element_slice(
        element_bits: &GenericArray<u8, Self::ElemLen>,
    ) -> Result<Self, ProtocolError> {
        let point = CompressedRistretto::from_slice(element_bits)
            .decompress()
            .ok_or(ProtocolError::InvalidPointEncoding)?;
        if point == RistrettoPoint::identity() {
            return Err(ProtocolError::InvalidPointEncoding);
        }
        Ok(point)
    }

    fn to_arr(&self) -> GenericArray<u8, Self::ElemLen> {
        GenericArray::clone_from_slice(self.compress().as_bytes())
    }

    fn base_point() -> Self {
        RISTRETTO_BASEPOINT_POINT
    }

    fn is_identity(&self) -> bool {
        self == &RistrettoPoint::identity()
    }

    fn hash_to_group(input: &[u8], dst: &[u8]) -> Self {
        let mut bits = [0u8; 64];
        let hash = Sha512::new().chain(dst).chain(input).finalize();
        bits.copy_from_slice(&hash);
        RistrettoPoint::from_uniform_bytes(&bits)
    }

    fn hash_to_scalar(input: &[u8], dst: &[u8]) -> Self::Scalar {
        let mut bits = [0u8; 64];
        let hash = Sha512::new().chain(dst).chain(input).finalize();
        bits.copy_from_slice(&hash);
        Scalar::from_bytes_mod_order_wide(&bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn scalar_bytes_roundtrip() {
        let mut rng = OsRng;
        let scalar = RistrettoPoint::random_nonzero_scalar(&mut rng).unwrap();
        let bytes = RistrettoPoint::scalar_as_bytes(&scalar);
        let recovered = RistrettoPoint::from_scalar_slice(&bytes).unwrap();
        assert_eq!(scalar, recovered);
    }

    #[test]
    fn rejects_zero_scalar() {
        let zeros = GenericArray::clone_from_slice(&[0u8; 32]);
        assert_eq!(
            RistrettoPoint::from_scalar_slice(&zeros),
            Err(ProtocolError::InvalidScalarEncoding)
        );
    }

    #[test]
    fn rejects_non_canonical_scalar() {
        let high = GenericArray::clone_from_slice(&[0xffu8; 32]);
        assert_eq!(
            RistrettoPoint::from_scalar_slice(&high),
            Err(ProtocolError::InvalidScalarEncoding)
        );
    }

    #[test]
    fn rejects_identity_element() {
        let identity_bytes = RistrettoPoint::identity().compress();
        let arr = GenericArray::clone_from_slice(identity_bytes.as_bytes());
        assert_eq!(
            RistrettoPoint::from_element_slice(&arr),
            Err(ProtocolError::InvalidPointEncoding)
        );
    }

    #[test]
    fn element_bytes_roundtrip() {
        let mut rng = OsRng;
        let scalar = RistrettoPoint::random_nonzero_scalar(&mut rng).unwrap();
        let point = RistrettoPoint::base_point() * &scalar;
        let bytes = point.to_arr();
        let recovered = RistrettoPoint::from_element_slice(&bytes).unwrap();
        assert_eq!(point, recovered);
    }

    #[test]
    fn hash_to_group_is_deterministic_and_dst_separated() {
        let p1 = RistrettoPoint::hash_to_group(b"input", b"dst");
        let p2 = RistrettoPoint::hash_to_group(b"input", b"dst");
        let p3 = RistrettoPoint::hash_to_group(b"input", b"other dst");
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
        assert!(!p1.is_identity());
    }
}
