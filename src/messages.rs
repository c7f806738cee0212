// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the messages used for OPAQUE. All messages are plain
//! concatenations of fixed-length fields; every deserializer checks the
//! exact total length before parsing.

use crate::ciphersuite::{elem_len, envelope_len, hash_len, masked_response_len, CipherSuite};
use crate::envelope::Envelope;
use crate::errors::ProtocolError;
use crate::group::Group;
use crate::key_schedule::NONCE_LEN;
use crate::keypair::{KeyPair, PublicKey};

use generic_array::GenericArray;
use std::convert::TryFrom;

/// The message sent by the client to the server to initiate registration:
/// `blinded_element[Np]`
pub struct RegistrationRequest<CS: CipherSuite> {
    /// blinded password information
    pub(crate) blinded_element: CS::Group,
}

impl<CS: CipherSuite> RegistrationRequest<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.blinded_element.to_arr().to_vec()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() != elem_len::<CS>() {
            return Err(ProtocolError::InvalidMessageLength);
        }
        let blinded_element = <CS::Group as Group>::from_element_slice(GenericArray::from_slice(input))?;
        Ok(Self { blinded_element })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for RegistrationRequest<CS> {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The answer sent by the server upon reception of the registration attempt:
/// `evaluated_element[Np] || pks[Np]`
pub struct RegistrationResponse<CS: CipherSuite> {
    /// The server's OPRF output
    pub(crate) evaluated_element: CS::Group,
    /// The server's static public key
    pub(crate) server_s_pk: PublicKey,
}

impl<CS: CipherSuite> RegistrationResponse<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.evaluated_element.to_arr()[..],
            &self.server_s_pk[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let np = elem_len::<CS>();
        if input.len() != 2 * np {
            return Err(ProtocolError::InvalidMessageLength);
        }
        let evaluated_element =
            <CS::Group as Group>::from_element_slice(GenericArray::from_slice(&input[..np]))?;
        let server_s_pk = KeyPair::<CS::Group>::check_public_key(PublicKey::from_slice(
            &input[np..],
        ))?;
        Ok(Self {
            evaluated_element,
            server_s_pk,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for RegistrationResponse<CS> {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The final registration message, stored server-side as the client record:
/// `pkc[Np] || masking_key[Nh] || envelope[Ne]`
pub struct RegistrationRecord<CS: CipherSuite> {
    /// The client's long-term public key
    pub(crate) client_s_pk: PublicKey,
    /// The key masking the credential response of this record
    pub(crate) masking_key: Vec<u8>,
    /// The sealed credential container
    pub(crate) envelope: Envelope<CS>,
}

impl<CS: CipherSuite> RegistrationRecord<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.client_s_pk[..],
            &self.masking_key[..],
            &self.envelope.serialize(),
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let np = elem_len::<CS>();
        let nh = hash_len::<CS>();
        if input.len() != np + nh + envelope_len::<CS>() {
            return Err(ProtocolError::InvalidMessageLength);
        }
        let client_s_pk =
            KeyPair::<CS::Group>::check_public_key(PublicKey::from_slice(&input[..np]))?;
        let masking_key = input[np..np + nh].to_vec();
        let envelope = Envelope::deserialize(&input[np + nh..])?;
        Ok(Self {
            client_s_pk,
            masking_key,
            envelope,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for RegistrationRecord<CS> {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The first login flight from the client:
/// `blinded_element[Np] || nonce_u[Nn] || epk_u[Np]`
pub struct KE1<CS: CipherSuite> {
    /// blinded password information
    pub(crate) blinded_element: CS::Group,
    /// The client's nonce for this session
    pub(crate) client_nonce: Vec<u8>,
    /// The client's ephemeral public key
    pub(crate) client_e_pk: PublicKey,
}

impl<CS: CipherSuite> KE1<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.blinded_element.to_arr()[..],
            &self.client_nonce[..],
            &self.client_e_pk[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let np = elem_len::<CS>();
        if input.len() != np + NONCE_LEN + np {
            return Err(ProtocolError::InvalidMessageLength);
        }
        let blinded_element =
            <CS::Group as Group>::from_element_slice(GenericArray::from_slice(&input[..np]))?;
        let client_nonce = input[np..np + NONCE_LEN].to_vec();
        let client_e_pk = KeyPair::<CS::Group>::check_public_key(PublicKey::from_slice(
            &input[np + NONCE_LEN..],
        ))?;
        Ok(Self {
            blinded_element,
            client_nonce,
            client_e_pk,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for KE1<CS> {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The second login flight from the server:
/// `evaluated_element[Np] || masking_nonce[Nn] || masked_response[Np+Ne] ||
/// nonce_s[Nn] || epk_s[Np] || server_mac[Nm]`
pub struct KE2<CS: CipherSuite> {
    /// The server's OPRF output
    pub(crate) evaluated_element: CS::Group,
    /// The nonce of the masking pad
    pub(crate) masking_nonce: Vec<u8>,
    /// The server public key and envelope, hidden under the masking pad
    pub(crate) masked_response: Vec<u8>,
    /// The server's nonce for this session
    pub(crate) server_nonce: Vec<u8>,
    /// The server's ephemeral public key
    pub(crate) server_e_pk: PublicKey,
    /// The server's transcript authentication tag
    pub(crate) mac: Vec<u8>,
}

impl<CS: CipherSuite> KE2<CS> {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.credential_response_bytes()[..],
            &self.server_nonce[..],
            &self.server_e_pk[..],
            &self.mac[..],
        ]
        .concat()
    }

    /// The credential response component entering the transcript preamble:
    /// `evaluated_element || masking_nonce || masked_response`
    pub(crate) fn credential_response_bytes(&self) -> Vec<u8> {
        [
            &self.evaluated_element.to_arr()[..],
            &self.masking_nonce[..],
            &self.masked_response[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let np = elem_len::<CS>();
        let nm = hash_len::<CS>();
        let masked_len = masked_response_len::<CS>();
        let total = np + NONCE_LEN + masked_len + NONCE_LEN + np + nm;
        if input.len() != total {
            return Err(ProtocolError::InvalidMessageLength);
        }

        let evaluated_element =
            <CS::Group as Group>::from_element_slice(GenericArray::from_slice(&input[..np]))?;
        let mut offset = np;
        let masking_nonce = input[offset..offset + NONCE_LEN].to_vec();
        offset += NONCE_LEN;
        let masked_response = input[offset..offset + masked_len].to_vec();
        offset += masked_len;
        let server_nonce = input[offset..offset + NONCE_LEN].to_vec();
        offset += NONCE_LEN;
        let server_e_pk = KeyPair::<CS::Group>::check_public_key(PublicKey::from_slice(
            &input[offset..offset + np],
        ))?;
        offset += np;
        let mac = input[offset..].to_vec();

        Ok(Self {
            evaluated_element,
            masking_nonce,
            masked_response,
            server_nonce,
            server_e_pk,
            mac,
        })
    }
}

impl<CS: CipherSuite> TryFrom<&[u8]> for KE2<CS> {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::deserialize(bytes)
    }
}

/// The final login flight from the client: `client_mac[Nm]`
pub struct KE3 {
    /// The client's transcript authentication tag
    pub(crate) mac: Vec<u8>,
}

impl KE3 {
    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.mac.clone()
    }

    /// Deserialization from bytes, for the compiled ciphersuite
    pub fn deserialize<CS: CipherSuite>(input: &[u8]) -> Result<Self, ProtocolError> {
        if input.len() != hash_len::<CS>() {
            return Err(ProtocolError::InvalidMessageLength);
        }
        Ok(Self {
            mac: input.to_vec(),
        })
    }
}
