// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Provides the main OPAQUE API

use crate::ciphersuite::{elem_len, hash_len, masked_response_len, scalar_len, CipherSuite};
use crate::encoding::{decode_vector, encode_vector};
use crate::envelope::{masking_key_from, Envelope};
use crate::errors::{InternalError, ProtocolError};
use crate::group::Group;
use crate::key_exchange::{finish_ke, generate_ke1, generate_ke2, generate_ke3, Ke1State, Ke2State};
use crate::key_schedule::NONCE_LEN;
use crate::keypair::{KeyPair, PublicKey};
use crate::ksf::Ksf;
use crate::messages::{
    RegistrationRecord, RegistrationRequest, RegistrationResponse, KE1, KE2, KE3,
};
use crate::oprf;

use generic_array::GenericArray;
use hkdf::Hkdf;
use rand::{CryptoRng, RngCore};
use std::marker::PhantomData;
use zeroize::Zeroize;

static STR_CREDENTIAL_RESPONSE_PAD: &[u8] = b"CredentialResponsePad";
static STR_OPRF_KEY: &[u8] = b"OprfKey";
static STR_FAKE_MASKING_KEY: &[u8] = b"FakeMaskingKey";
static STR_FAKE_PRIVATE_KEY: &[u8] = b"FakePrivateKey";

// Server Setup
// ============

/// The state elements the server holds upon setup: the seed from which all
/// per-credential OPRF keys are derived, the server's long-term keypair, and
/// the seed of the fake records answering unknown credentials.
pub struct ServerSetup<CS: CipherSuite> {
    oprf_seed: Vec<u8>,
    keypair: KeyPair<CS::Group>,
    fake_seed: Vec<u8>,
}

impl<CS: CipherSuite> Zeroize for ServerSetup<CS> {
    fn zeroize(&mut self) {
        self.oprf_seed.zeroize();
        self.keypair.zeroize();
        self.fake_seed.zeroize();
    }
}

impl<CS: CipherSuite> Drop for ServerSetup<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<CS: CipherSuite> ServerSetup<CS> {
    /// Generate a new instance of server setup
    pub fn new<R: CryptoRng + RngCore>(rng: &mut R) -> Result<Self, ProtocolError> {
        let mut oprf_seed = vec![0u8; hash_len::<CS>()];
        rng.try_fill_bytes(&mut oprf_seed)
            .map_err(|_| ProtocolError::RngFailure)?;
        let mut fake_seed = vec![0u8; hash_len::<CS>()];
        rng.try_fill_bytes(&mut fake_seed)
            .map_err(|_| ProtocolError::RngFailure)?;

        Ok(Self {
            oprf_seed,
            keypair: KeyPair::generate_random(rng)?,
            fake_seed,
        })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.oprf_seed[..],
            &self.keypair.private()[..],
            &self.fake_seed[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let nh = hash_len::<CS>();
        let ns = scalar_len::<CS>();
        if input.len() != nh + ns + nh {
            return Err(ProtocolError::InvalidMessageLength);
        }
        Ok(Self {
            oprf_seed: input[..nh].to_vec(),
            keypair: KeyPair::from_private_key_slice(&input[nh..nh + ns])?,
            fake_seed: input[nh + ns..].to_vec(),
        })
    }

    /// Returns the keypair
    pub fn keypair(&self) -> &KeyPair<CS::Group> {
        &self.keypair
    }

    /// The OPRF key of a credential, derived from the server-wide seed. The
    /// derivation makes no distinction between registered and unknown
    /// credential identifiers.
    pub(crate) fn oprf_key(
        &self,
        credential_identifier: &[u8],
    ) -> Result<<CS::Group as Group>::Scalar, ProtocolError> {
        let mut key_seed = vec![0u8; scalar_len::<CS>()];
        Hkdf::<CS::Hash>::from_prk(&self.oprf_seed)
            .map_err(|_| InternalError::HkdfError)?
            .expand(
                &[credential_identifier, STR_OPRF_KEY].concat(),
                &mut key_seed,
            )
            .map_err(|_| InternalError::HkdfError)?;
        let key = oprf::derive_scalar::<CS>(&key_seed)?;
        key_seed.zeroize();
        Ok(key)
    }

    /// A deterministic fake record for an unknown credential identifier:
    /// a derived masking key, a derived client public key and an all-zero
    /// envelope. The masked response it produces is indistinguishable from a
    /// real one.
    pub(crate) fn fake_record(
        &self,
        credential_identifier: &[u8],
    ) -> Result<RegistrationRecord<CS>, ProtocolError> {
        let hkdf =
            Hkdf::<CS::Hash>::from_prk(&self.fake_seed).map_err(|_| InternalError::HkdfError)?;

        let mut masking_key = vec![0u8; hash_len::<CS>()];
        hkdf.expand(
            &[credential_identifier, STR_FAKE_MASKING_KEY].concat(),
            &mut masking_key,
        )
        .map_err(|_| InternalError::HkdfError)?;

        let mut sk_seed = vec![0u8; scalar_len::<CS>()];
        hkdf.expand(
            &[credential_identifier, STR_FAKE_PRIVATE_KEY].concat(),
            &mut sk_seed,
        )
        .map_err(|_| InternalError::HkdfError)?;
        let mut fake_sk = oprf::derive_scalar::<CS>(&sk_seed)?;
        sk_seed.zeroize();
        let fake_keypair = KeyPair::<CS::Group>::from_private_scalar(&fake_sk);
        fake_sk.zeroize();

        Ok(RegistrationRecord {
            client_s_pk: fake_keypair.public().clone(),
            masking_key,
            envelope: Envelope::dummy(),
        })
    }
}

// Identity selection
// ==================

/// Options for specifying custom identifiers. When no identifier is
/// supplied, the matching public key is used instead; both parties must make
/// the same choice or their MACs disagree.
#[derive(Clone)]
pub enum Identifiers {
    /// Supply only a client identifier
    ClientIdentifier(Vec<u8>),
    /// Supply only a server identifier
    ServerIdentifier(Vec<u8>),
    /// Supply a client and server identifier
    ClientAndServerIdentifiers(Vec<u8>, Vec<u8>),
}

/// Resolves the identity choice to the length-prefixed `(id_u, id_s)` pair
/// entering the envelope MAC and the transcript preamble
pub(crate) fn bytestrings_from_identifiers(
    ids: &Option<Identifiers>,
    client_s_pk: &PublicKey,
    server_s_pk: &PublicKey,
) -> Result<(Vec<u8>, Vec<u8>), InternalError> {
    let (client_identity, server_identity): (&[u8], &[u8]) = match ids {
        None => (client_s_pk, server_s_pk),
        Some(Identifiers::ClientIdentifier(id_u)) => (id_u, server_s_pk),
        Some(Identifiers::ServerIdentifier(id_s)) => (client_s_pk, id_s),
        Some(Identifiers::ClientAndServerIdentifiers(id_u, id_s)) => (id_u, id_s),
    };
    Ok((
        encode_vector(client_identity)?,
        encode_vector(server_identity)?,
    ))
}

// Registration
// ============

/// The state elements the client holds to register itself
pub struct ClientRegistration<CS: CipherSuite> {
    /// token containing the client's password and the blinding factor
    pub(crate) token: oprf::Token<CS::Group>,
}

impl<CS: CipherSuite> Zeroize for ClientRegistration<CS> {
    fn zeroize(&mut self) {
        self.token.data.zeroize();
        self.token.blind.zeroize();
    }
}

impl<CS: CipherSuite> Drop for ClientRegistration<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Contains the fields that are returned by a client registration start
pub struct ClientRegistrationStartResult<CS: CipherSuite> {
    /// The registration request message to be sent to the server
    pub message: RegistrationRequest<CS>,
    /// The client state that must be persisted in order to complete
    /// registration
    pub state: ClientRegistration<CS>,
}

/// Optional parameters for client registration finish
#[derive(Clone)]
pub enum ClientRegistrationFinishParameters {
    /// Specifying the identifiers idU and idS
    WithIdentifiers(Identifiers),
    /// No custom identifiers
    Default,
}

impl Default for ClientRegistrationFinishParameters {
    fn default() -> Self {
        Self::Default
    }
}

/// Contains the fields that are returned by a client registration finish
pub struct ClientRegistrationFinishResult<CS: CipherSuite> {
    /// The registration record message to be sent to the server
    pub message: RegistrationRecord<CS>,
    /// The export key output by client registration
    pub export_key: GenericArray<u8, <CS::Hash as digest::Digest>::OutputSize>,
    /// The server's static public key
    pub server_s_pk: PublicKey,
}

impl<CS: CipherSuite> ClientRegistration<CS> {
    /// Returns an initial "blinded" request to send to the server, as well as
    /// a ClientRegistration
    pub fn start<R: RngCore + CryptoRng>(
        blinding_factor_rng: &mut R,
        password: &[u8],
    ) -> Result<ClientRegistrationStartResult<CS>, ProtocolError> {
        let (token, blinded_element) = oprf::blind::<R, CS>(password, blinding_factor_rng)?;

        Ok(ClientRegistrationStartResult {
            message: RegistrationRequest { blinded_element },
            state: Self { token },
        })
    }

    /// "Unblinds" the server's answer and seals the envelope, producing the
    /// record the server will store for this credential
    pub fn finish<R: CryptoRng + RngCore>(
        self,
        rng: &mut R,
        response: RegistrationResponse<CS>,
        params: ClientRegistrationFinishParameters,
    ) -> Result<ClientRegistrationFinishResult<CS>, ProtocolError> {
        let optional_ids = match params {
            ClientRegistrationFinishParameters::WithIdentifiers(ids) => Some(ids),
            ClientRegistrationFinishParameters::Default => None,
        };

        let mut randomized_pwd = get_randomized_password::<CS>(
            &self.token.data,
            &self.token.blind,
            response.evaluated_element,
        )?;

        let sealed = Envelope::<CS>::seal(
            rng,
            &randomized_pwd,
            &response.server_s_pk,
            &optional_ids,
        )?;
        randomized_pwd.zeroize();

        Ok(ClientRegistrationFinishResult {
            message: RegistrationRecord {
                client_s_pk: sealed.client_s_pk,
                masking_key: sealed.masking_key,
                envelope: sealed.envelope,
            },
            export_key: sealed.export_key,
            server_s_pk: response.server_s_pk,
        })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &CS::Group::scalar_as_bytes(&self.token.blind)[..],
            &self.token.data,
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let ns = scalar_len::<CS>();
        if input.len() <= ns {
            return Err(ProtocolError::InvalidMessageLength);
        }
        let blind = CS::Group::from_scalar_slice(GenericArray::from_slice(&input[..ns]))?;
        Ok(Self {
            token: oprf::Token {
                data: input[ns..].to_vec(),
                blind,
            },
        })
    }
}

/// Contains the fields that are returned by a server registration start.
/// Note that there is no state output in this step
pub struct ServerRegistrationStartResult<CS: CipherSuite> {
    /// The registration response message to send to the client
    pub message: RegistrationResponse<CS>,
}

/// The record the server persists after a completed registration
pub struct ServerRegistration<CS: CipherSuite>(pub(crate) RegistrationRecord<CS>);

impl<CS: CipherSuite> Zeroize for ServerRegistration<CS> {
    fn zeroize(&mut self) {
        self.0.masking_key.zeroize();
        self.0.envelope.zeroize();
    }
}

impl<CS: CipherSuite> Drop for ServerRegistration<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<CS: CipherSuite> ServerRegistration<CS> {
    /// From the client's "blinded" password, returns a response to be sent
    /// back to the client
    pub fn start(
        server_setup: &ServerSetup<CS>,
        message: RegistrationRequest<CS>,
        credential_identifier: &[u8],
    ) -> Result<ServerRegistrationStartResult<CS>, ProtocolError> {
        let mut oprf_key = server_setup.oprf_key(credential_identifier)?;
        let evaluated_element = oprf::evaluate(message.blinded_element, &oprf_key);
        oprf_key.zeroize();

        Ok(ServerRegistrationStartResult {
            message: RegistrationResponse {
                evaluated_element,
                server_s_pk: server_setup.keypair.public().clone(),
            },
        })
    }

    /// From the client's record message, returns the state to persist
    pub fn finish(message: RegistrationRecord<CS>) -> Self {
        Self(message)
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        self.0.serialize()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self(RegistrationRecord::deserialize(input)?))
    }
}

// Login
// =====

/// The state elements the client holds to perform a login
pub struct ClientLogin<CS: CipherSuite> {
    /// token containing the client's password and the blinding factor
    token: oprf::Token<CS::Group>,
    ke1_state: Ke1State<CS>,
    serialized_ke1: Vec<u8>,
}

impl<CS: CipherSuite> Zeroize for ClientLogin<CS> {
    fn zeroize(&mut self) {
        self.token.data.zeroize();
        self.token.blind.zeroize();
        self.ke1_state.zeroize();
        self.serialized_ke1.zeroize();
    }
}

impl<CS: CipherSuite> Drop for ClientLogin<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Contains the fields that are returned by a client login start
pub struct ClientLoginStartResult<CS: CipherSuite> {
    /// The message to send to the server to begin the login protocol
    pub message: KE1<CS>,
    /// The state that the client must keep in order to complete the protocol
    pub state: ClientLogin<CS>,
}

/// Optional parameters for client login finish
#[derive(Clone)]
pub enum ClientLoginFinishParameters {
    /// Specifying a context field that the server must agree on
    WithContext(Vec<u8>),
    /// Specifying a user identifier and server identifier that will be
    /// matched against the server
    WithIdentifiers(Identifiers),
    /// Specifying a context field that the server must agree on, along with
    /// identifiers that will be matched against the server
    WithContextAndIdentifiers(Vec<u8>, Identifiers),
    /// No custom identifiers and no context
    Default,
}

impl Default for ClientLoginFinishParameters {
    fn default() -> Self {
        Self::Default
    }
}

/// Contains the fields that are returned by a client login finish
pub struct ClientLoginFinishResult<CS: CipherSuite> {
    /// The message to send to the server to complete the protocol
    pub message: KE3,
    /// The session key
    pub session_key: Vec<u8>,
    /// The client-side export key
    pub export_key: GenericArray<u8, <CS::Hash as digest::Digest>::OutputSize>,
    /// The server's static public key
    pub server_s_pk: PublicKey,
}

impl<CS: CipherSuite> ClientLogin<CS> {
    /// Returns an initial "blinded" password request to send to the server,
    /// as well as a ClientLogin
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        password: &[u8],
    ) -> Result<ClientLoginStartResult<CS>, ProtocolError> {
        let (token, blinded_element) = oprf::blind::<R, CS>(password, rng)?;
        let ke1_state = generate_ke1::<R, CS>(rng)?;

        let message = KE1 {
            blinded_element,
            client_nonce: ke1_state.client_nonce.clone(),
            client_e_pk: ke1_state.client_e_pk.clone(),
        };
        let serialized_ke1 = message.serialize();

        Ok(ClientLoginStartResult {
            message,
            state: Self {
                token,
                ke1_state,
                serialized_ke1,
            },
        })
    }

    /// "Unblinds" the server's answer, recovers the credentials hidden in
    /// the masked response, verifies the server's authentication tag and
    /// produces the final flight together with the session and export keys.
    ///
    /// Every failure on the recovery path surfaces as
    /// [CredentialRecoveryFailed](ProtocolError::CredentialRecoveryFailed),
    /// whether the password was wrong, the credential unknown to the server,
    /// or the response tampered with.
    pub fn finish(
        self,
        ke2: KE2<CS>,
        params: ClientLoginFinishParameters,
    ) -> Result<ClientLoginFinishResult<CS>, ProtocolError> {
        let (context, optional_ids) = match params {
            ClientLoginFinishParameters::Default => (Vec::new(), None),
            ClientLoginFinishParameters::WithContext(context) => (context, None),
            ClientLoginFinishParameters::WithIdentifiers(ids) => (Vec::new(), Some(ids)),
            ClientLoginFinishParameters::WithContextAndIdentifiers(context, ids) => {
                (context, Some(ids))
            }
        };

        let mut randomized_pwd = get_randomized_password::<CS>(
            &self.token.data,
            &self.token.blind,
            ke2.evaluated_element,
        )?;

        let mut masking_key = masking_key_from::<CS>(&randomized_pwd)?;
        let unmasked = unmask_response::<CS>(&masking_key, &ke2.masking_nonce, &ke2.masked_response)
            .map_err(|_| ProtocolError::CredentialRecoveryFailed);
        masking_key.zeroize();
        let (server_s_pk, envelope) = match unmasked {
            Ok(x) => x,
            Err(e) => {
                randomized_pwd.zeroize();
                return Err(e);
            }
        };

        let opened = envelope
            .open(&randomized_pwd, &server_s_pk, &optional_ids)
            .map_err(|_| ProtocolError::CredentialRecoveryFailed);
        randomized_pwd.zeroize();
        let opened = opened?;

        let mut client_s_sk =
            KeyPair::<CS::Group>::scalar_from_private(opened.client_static_keypair.private())?;

        let credential_response = ke2.credential_response_bytes();
        let ke3_result = generate_ke3::<CS>(
            &self.serialized_ke1,
            &credential_response,
            &ke2.server_nonce,
            &ke2.server_e_pk,
            &ke2.mac,
            &self.ke1_state,
            &server_s_pk,
            &client_s_sk,
            &opened.id_u,
            &opened.id_s,
            &context,
        );
        client_s_sk.zeroize();
        let (session_key, client_mac) = ke3_result?;

        Ok(ClientLoginFinishResult {
            message: KE3 { mac: client_mac },
            session_key,
            export_key: opened.export_key.clone(),
            server_s_pk,
        })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok([
            &CS::Group::scalar_as_bytes(&self.token.blind)[..],
            &CS::Group::scalar_as_bytes(&self.ke1_state.client_e_sk)[..],
            &self.ke1_state.client_nonce,
            &encode_vector(&self.serialized_ke1)?,
            &self.token.data,
        ]
        .concat())
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let ns = scalar_len::<CS>();
        if input.len() < 2 * ns + NONCE_LEN + 2 {
            return Err(ProtocolError::InvalidMessageLength);
        }
        let blind = CS::Group::from_scalar_slice(GenericArray::from_slice(&input[..ns]))?;
        let client_e_sk =
            CS::Group::from_scalar_slice(GenericArray::from_slice(&input[ns..2 * ns]))?;
        let client_nonce = input[2 * ns..2 * ns + NONCE_LEN].to_vec();
        let (serialized_ke1, password) = decode_vector(&input[2 * ns + NONCE_LEN..])?;

        let client_e_pk = PublicKey::from_slice(
            &(CS::Group::base_point() * &client_e_sk).to_arr(),
        );

        Ok(Self {
            token: oprf::Token {
                data: password.to_vec(),
                blind,
            },
            ke1_state: Ke1State {
                client_e_sk,
                client_e_pk,
                client_nonce,
            },
            serialized_ke1: serialized_ke1.to_vec(),
        })
    }
}

/// The state elements the server holds between its two login steps
pub struct ServerLogin<CS: CipherSuite> {
    ke2_state: Ke2State,
    _cs: PhantomData<CS>,
}

impl<CS: CipherSuite> Zeroize for ServerLogin<CS> {
    fn zeroize(&mut self) {
        self.ke2_state.zeroize();
    }
}

impl<CS: CipherSuite> Drop for ServerLogin<CS> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Optional parameters for server login start
#[derive(Clone)]
pub enum ServerLoginStartParameters {
    /// Specifying a context field that the client must agree on
    WithContext(Vec<u8>),
    /// Specifying a user identifier and server identifier that will be
    /// matched against the client
    WithIdentifiers(Identifiers),
    /// Specifying a context field that the client must agree on, along with
    /// identifiers that will be matched against the client
    WithContextAndIdentifiers(Vec<u8>, Identifiers),
}

impl Default for ServerLoginStartParameters {
    fn default() -> Self {
        Self::WithContext(Vec::new())
    }
}

/// Contains the fields that are returned by a server login start
pub struct ServerLoginStartResult<CS: CipherSuite> {
    /// The message to send back to the client
    pub message: KE2<CS>,
    /// The state that the server must keep in order to finish the protocol
    pub state: ServerLogin<CS>,
}

/// Contains the fields that are returned by a server login finish
pub struct ServerLoginFinishResult {
    /// The session key between client and server
    pub session_key: Vec<u8>,
}

impl<CS: CipherSuite> ServerLogin<CS> {
    /// From the client's KE1, returns a KE2 to be sent back to the client.
    /// When no password file is supplied, the response is computed against a
    /// deterministic fake record so an observer cannot tell whether the
    /// credential exists.
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_setup: &ServerSetup<CS>,
        password_file: Option<ServerRegistration<CS>>,
        message: KE1<CS>,
        credential_identifier: &[u8],
        params: ServerLoginStartParameters,
    ) -> Result<ServerLoginStartResult<CS>, ProtocolError> {
        let record = match password_file {
            Some(x) => x,
            None => Self::fake_registration(server_setup, credential_identifier)?,
        };

        let (context, optional_ids) = match params {
            ServerLoginStartParameters::WithContext(context) => (context, None),
            ServerLoginStartParameters::WithIdentifiers(ids) => (Vec::new(), Some(ids)),
            ServerLoginStartParameters::WithContextAndIdentifiers(context, ids) => {
                (context, Some(ids))
            }
        };

        let mut oprf_key = server_setup.oprf_key(credential_identifier)?;
        let evaluated_element = oprf::evaluate(message.blinded_element, &oprf_key);
        oprf_key.zeroize();

        let mut masking_nonce = vec![0u8; NONCE_LEN];
        rng.try_fill_bytes(&mut masking_nonce)
            .map_err(|_| ProtocolError::RngFailure)?;

        let server_s_pk = server_setup.keypair.public();
        let masked_response = mask_response::<CS>(
            &record.0.masking_key,
            &masking_nonce,
            server_s_pk,
            &record.0.envelope,
        )?;

        let (id_u, id_s) =
            bytestrings_from_identifiers(&optional_ids, &record.0.client_s_pk, server_s_pk)?;

        let serialized_ke1 = message.serialize();
        let credential_response = [
            &evaluated_element.to_arr()[..],
            &masking_nonce,
            &masked_response,
        ]
        .concat();

        let (ke2_state, payload) = generate_ke2::<R, CS>(
            rng,
            &serialized_ke1,
            &credential_response,
            &message.client_e_pk,
            &record.0.client_s_pk,
            server_setup.keypair.private(),
            &id_u,
            &id_s,
            &context,
        )?;

        Ok(ServerLoginStartResult {
            message: KE2 {
                evaluated_element,
                masking_nonce,
                masked_response,
                server_nonce: payload.server_nonce,
                server_e_pk: payload.server_e_pk,
                mac: payload.mac,
            },
            state: ServerLogin {
                ke2_state,
                _cs: PhantomData,
            },
        })
    }

    /// From the client's final message, checks the client's authentication
    /// tag in constant time and releases the session key
    pub fn finish(self, message: KE3) -> Result<ServerLoginFinishResult, ProtocolError> {
        let session_key = finish_ke::<CS>(&self.ke2_state, &message.mac)?;
        Ok(ServerLoginFinishResult { session_key })
    }

    /// Serialization into bytes
    pub fn serialize(&self) -> Vec<u8> {
        [
            &self.ke2_state.km3[..],
            &self.ke2_state.hashed_transcript[..],
            &self.ke2_state.session_key[..],
        ]
        .concat()
    }

    /// Deserialization from bytes
    pub fn deserialize(input: &[u8]) -> Result<Self, ProtocolError> {
        let nh = hash_len::<CS>();
        if input.len() != 3 * nh {
            return Err(ProtocolError::InvalidMessageLength);
        }
        Ok(Self {
            ke2_state: Ke2State {
                km3: input[..nh].to_vec(),
                hashed_transcript: input[nh..2 * nh].to_vec(),
                session_key: input[2 * nh..].to_vec(),
            },
            _cs: PhantomData,
        })
    }

    fn fake_registration(
        server_setup: &ServerSetup<CS>,
        credential_identifier: &[u8],
    ) -> Result<ServerRegistration<CS>, ProtocolError> {
        Ok(ServerRegistration(
            server_setup.fake_record(credential_identifier)?,
        ))
    }
}

// Helper functions
// ================

/// Finalizes the OPRF and runs the key stretching function over its output,
/// producing the randomized password all envelope keys derive from
fn get_randomized_password<CS: CipherSuite>(
    password: &[u8],
    blind: &<CS::Group as Group>::Scalar,
    evaluated_element: CS::Group,
) -> Result<Vec<u8>, ProtocolError> {
    let mut oprf_output = oprf::finalize::<CS>(password, blind, evaluated_element)?;

    let nh = hash_len::<CS>();
    let salt = vec![0u8; nh];
    let mut randomized_pwd = vec![0u8; nh];
    let result = CS::Ksf::default().stretch(&oprf_output, &salt, &mut randomized_pwd);
    oprf_output.zeroize();
    result.map_err(ProtocolError::from)?;

    Ok(randomized_pwd)
}

/// XORs the serialized server public key and envelope with the pad expanded
/// from the record's masking key and a fresh nonce
fn mask_response<CS: CipherSuite>(
    masking_key: &[u8],
    masking_nonce: &[u8],
    server_s_pk: &PublicKey,
    envelope: &Envelope<CS>,
) -> Result<Vec<u8>, ProtocolError> {
    let xor_pad = credential_response_pad::<CS>(masking_key, masking_nonce)?;
    let plaintext = [&server_s_pk[..], &envelope.serialize()].concat();

    Ok(xor_pad
        .iter()
        .zip(plaintext.iter())
        .map(|(&x1, &x2)| x1 ^ x2)
        .collect())
}

/// Strips the masking pad off a received response and parses the recovered
/// server public key and envelope
fn unmask_response<CS: CipherSuite>(
    masking_key: &[u8],
    masking_nonce: &[u8],
    masked_response: &[u8],
) -> Result<(PublicKey, Envelope<CS>), ProtocolError> {
    let xor_pad = credential_response_pad::<CS>(masking_key, masking_nonce)?;
    let plaintext: Vec<u8> = xor_pad
        .iter()
        .zip(masked_response.iter())
        .map(|(&x1, &x2)| x1 ^ x2)
        .collect();

    let key_len = elem_len::<CS>();
    let server_s_pk =
        KeyPair::<CS::Group>::check_public_key(PublicKey::from_slice(&plaintext[..key_len]))?;
    let envelope = Envelope::deserialize(&plaintext[key_len..])?;

    Ok((server_s_pk, envelope))
}

fn credential_response_pad<CS: CipherSuite>(
    masking_key: &[u8],
    masking_nonce: &[u8],
) -> Result<Vec<u8>, InternalError> {
    let mut xor_pad = vec![0u8; masked_response_len::<CS>()];
    Hkdf::<CS::Hash>::from_prk(masking_key)
        .map_err(|_| InternalError::HkdfError)?
        .expand(
            &[masking_nonce, STR_CREDENTIAL_RESPONSE_PAD].concat(),
            &mut xor_pad,
        )
        .map_err(|_| InternalError::HkdfError)?;
    Ok(xor_pad)
}
