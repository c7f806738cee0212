// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The ciphersuite registry and the serializable runtime configuration that
//! two peers exchange to agree on protocol parameters

use crate::ciphersuite::CipherSuite;
use crate::encoding::decode_vector;
use crate::errors::ProtocolError;
use std::convert::TryFrom;

/// Registered OPRF ciphersuites
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum OprfSuiteId {
    /// The ristretto255 group paired with SHA-512
    Ristretto255Sha512 = 1,
    /// The NIST P-256 group paired with SHA-256
    P256Sha256 = 3,
    /// The NIST P-384 group paired with SHA-384
    P384Sha384 = 4,
    /// The NIST P-521 group paired with SHA-512
    P521Sha512 = 5,
}

impl TryFrom<u8> for OprfSuiteId {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(OprfSuiteId::Ristretto255Sha512),
            3 => Ok(OprfSuiteId::P256Sha256),
            4 => Ok(OprfSuiteId::P384Sha384),
            5 => Ok(OprfSuiteId::P521Sha512),
            _ => Err(ProtocolError::ConfigurationInvalid),
        }
    }
}

/// Registered hash functions, usable for hashing, key derivation and message
/// authentication
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum HashId {
    /// SHA-256
    Sha256 = 5,
    /// SHA-384
    Sha384 = 6,
    /// SHA-512
    Sha512 = 7,
}

impl TryFrom<u8> for HashId {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            5 => Ok(HashId::Sha256),
            6 => Ok(HashId::Sha384),
            7 => Ok(HashId::Sha512),
            _ => Err(ProtocolError::ConfigurationInvalid),
        }
    }
}

/// Registered key stretching functions
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum KsfId {
    /// The no-op stretch
    Identity = 0,
    /// Argon2id
    Argon2id = 1,
    /// scrypt
    Scrypt = 2,
    /// PBKDF2 with HMAC-SHA-512
    Pbkdf2Sha512 = 3,
}

impl TryFrom<u8> for KsfId {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(KsfId::Identity),
            1 => Ok(KsfId::Argon2id),
            2 => Ok(KsfId::Scrypt),
            3 => Ok(KsfId::Pbkdf2Sha512),
            _ => Err(ProtocolError::ConfigurationInvalid),
        }
    }
}

/// Registered groups for the authenticated key exchange
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum AkeGroupId {
    /// ristretto255
    Ristretto255 = 1,
    /// NIST P-256
    P256 = 3,
    /// NIST P-384
    P384 = 4,
    /// NIST P-521
    P521 = 5,
}

impl TryFrom<u8> for AkeGroupId {
    type Error = ProtocolError;

    fn try_from(x: u8) -> Result<Self, Self::Error> {
        match x {
            1 => Ok(AkeGroupId::Ristretto255),
            3 => Ok(AkeGroupId::P256),
            4 => Ok(AkeGroupId::P384),
            5 => Ok(AkeGroupId::P521),
            _ => Err(ProtocolError::ConfigurationInvalid),
        }
    }
}

const CONFIG_ID_LENGTH: usize = 6;

/// An OPAQUE configuration: the identifiers of all primitives in play plus
/// the shared context bound into the key exchange transcript. Both peers must
/// run the same configuration or authentication fails.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    /// The OPRF ciphersuite
    pub oprf: OprfSuiteId,
    /// The hash backing HKDF
    pub kdf: HashId,
    /// The hash backing HMAC
    pub mac: HashId,
    /// The plain hash
    pub hash: HashId,
    /// The key stretching function
    pub ksf: KsfId,
    /// The group of the authenticated key exchange
    pub ake: AkeGroupId,
    /// Optional application-chosen context bound into the transcript
    pub context: Vec<u8>,
}

impl Configuration {
    /// Creates a configuration after validating the context length
    pub fn new(
        oprf: OprfSuiteId,
        kdf: HashId,
        mac: HashId,
        hash: HashId,
        ksf: KsfId,
        ake: AkeGroupId,
        context: &[u8],
    ) -> Result<Self, ProtocolError> {
        if context.len() > u16::MAX as usize {
            return Err(ProtocolError::ConfigurationInvalid);
        }
        Ok(Self {
            oprf,
            kdf,
            mac,
            hash,
            ksf,
            ake,
            context: context.to_vec(),
        })
    }

    /// The configuration matching a compiled ciphersuite
    pub fn of_suite<CS: CipherSuite>(context: &[u8]) -> Result<Self, ProtocolError> {
        Self::new(
            CS::OPRF_ID,
            CS::KDF_ID,
            CS::MAC_ID,
            CS::HASH_ID,
            CS::KSF_ID,
            CS::AKE_ID,
            context,
        )
    }

    /// Checks that this configuration selects exactly the compiled suite
    pub fn check<CS: CipherSuite>(&self) -> Result<(), ProtocolError> {
        if self.oprf == CS::OPRF_ID
            && self.kdf == CS::KDF_ID
            && self.mac == CS::MAC_ID
            && self.hash == CS::HASH_ID
            && self.ksf == CS::KSF_ID
            && self.ake == CS::AKE_ID
        {
            Ok(())
        } else {
            Err(ProtocolError::ConfigurationInvalid)
        }
    }

    /// Byte encoding: six identifier bytes followed by the length-prefixed
    /// context
    pub fn serialize(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(CONFIG_ID_LENGTH + 2 + self.context.len());
        output.push(self.oprf as u8);
        output.push(self.kdf as u8);
        output.push(self.mac as u8);
        output.push(self.hash as u8);
        output.push(self.ksf as u8);
        output.push(self.ake as u8);
        output.extend_from_slice(&(self.context.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.context);
        output
    }

    /// Decodes and validates a configuration. Any unregistered identifier is
    /// rejected.
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() < CONFIG_ID_LENGTH + 2 {
            return Err(ProtocolError::ConfigurationInvalid);
        }
        let (context, remainder) = decode_vector(&input[CONFIG_ID_LENGTH..])
            .map_err(|_| ProtocolError::ConfigurationInvalid)?;
        if !remainder.is_empty() {
            return Err(ProtocolError::ConfigurationInvalid);
        }

        Ok(Self {
            oprf: OprfSuiteId::try_from(input[0])?,
            kdf: HashId::try_from(input[1])?,
            mac: HashId::try_from(input[2])?,
            hash: HashId::try_from(input[3])?,
            ksf: KsfId::try_from(input[4])?,
            ake: AkeGroupId::try_from(input[5])?,
            context: context.to_vec(),
        })
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            oprf: OprfSuiteId::Ristretto255Sha512,
            kdf: HashId::Sha512,
            mac: HashId::Sha512,
            hash: HashId::Sha512,
            ksf: KsfId::Argon2id,
            ake: AkeGroupId::Ristretto255,
            context: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_roundtrip() {
        let config = Configuration::new(
            OprfSuiteId::Ristretto255Sha512,
            HashId::Sha512,
            HashId::Sha512,
            HashId::Sha512,
            KsfId::Scrypt,
            AkeGroupId::Ristretto255,
            b"application context",
        )
        .unwrap();
        let bytes = config.serialize();
        let recovered = Configuration::deserialize(&bytes).unwrap();
        assert_eq!(config, recovered);
    }

    #[test]
    fn empty_context_needs_eight_bytes() {
        let bytes = Configuration::default().serialize();
        assert_eq!(bytes.len(), 8);
        assert!(Configuration::deserialize(&bytes).is_ok());
        assert_eq!(
            Configuration::deserialize(&bytes[..7]),
            Err(ProtocolError::ConfigurationInvalid)
        );
    }

    #[test]
    fn unregistered_identifiers_are_rejected() {
        let mut bytes = Configuration::default().serialize();
        bytes[0] = 2;
        assert_eq!(
            Configuration::deserialize(&bytes),
            Err(ProtocolError::ConfigurationInvalid)
        );

        let mut bytes = Configuration::default().serialize();
        bytes[4] = 9;
        assert_eq!(
            Configuration::deserialize(&bytes),
            Err(ProtocolError::ConfigurationInvalid)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = Configuration::default().serialize();
        bytes.push(0);
        assert_eq!(
            Configuration::deserialize(&bytes),
            Err(ProtocolError::ConfigurationInvalid)
        );
    }

    #[test]
    fn all_registered_identifiers_decode() {
        for id in &[1u8, 3, 4, 5] {
            assert!(OprfSuiteId::try_from(*id).is_ok());
            assert!(AkeGroupId::try_from(*id).is_ok());
        }
        for id in &[5u8, 6, 7] {
            assert!(HashId::try_from(*id).is_ok());
        }
        for id in &[0u8, 1, 2, 3] {
            assert!(KsfId::try_from(*id).is_ok());
        }
    }
}
