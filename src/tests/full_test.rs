// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::ciphersuite::{CipherSuite, Ristretto255Sha512};
use crate::configuration::{AkeGroupId, Configuration, HashId, KsfId, OprfSuiteId};
use crate::errors::ProtocolError;
use crate::messages::{
    RegistrationRecord, RegistrationRequest, RegistrationResponse, KE1, KE2, KE3,
};
use crate::opaque::{
    ClientLogin, ClientLoginFinishParameters, ClientRegistration,
    ClientRegistrationFinishParameters, Identifiers, ServerLogin, ServerLoginStartParameters,
    ServerRegistration, ServerSetup,
};
use crate::tests::CycleRng;

use curve25519_dalek::ristretto::RistrettoPoint;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

struct Default;
impl CipherSuite for Default {
    type Group = RistrettoPoint;
    type Hash = sha2::Sha512;
    type Ksf = crate::ksf::Identity;

    const OPRF_ID: OprfSuiteId = OprfSuiteId::Ristretto255Sha512;
    const KDF_ID: HashId = HashId::Sha512;
    const MAC_ID: HashId = HashId::Sha512;
    const HASH_ID: HashId = HashId::Sha512;
    const KSF_ID: KsfId = KsfId::Identity;
    const AKE_ID: AkeGroupId = AkeGroupId::Ristretto255;
}

const CREDENTIAL_ID: &[u8] = b"alice@example.com";
const PASSWORD: &[u8] = b"CorrectHorseBatteryStaple";

// Runs a complete registration, returning the serialized password file and
// the export key the client obtained
fn register<R: RngCore + CryptoRng>(
    rng: &mut R,
    server_setup: &ServerSetup<Default>,
    password: &[u8],
    params: ClientRegistrationFinishParameters,
) -> (Vec<u8>, Vec<u8>) {
    let client_start = ClientRegistration::<Default>::start(rng, password).unwrap();
    let server_start =
        ServerRegistration::<Default>::start(server_setup, client_start.message, CREDENTIAL_ID)
            .unwrap();
    let client_finish = client_start
        .state
        .finish(rng, server_start.message, params)
        .unwrap();
    let export_key = client_finish.export_key.to_vec();
    let password_file = ServerRegistration::<Default>::finish(client_finish.message);
    (password_file.serialize(), export_key)
}

fn password_file(bytes: &[u8]) -> ServerRegistration<Default> {
    ServerRegistration::<Default>::deserialize(bytes).unwrap()
}

#[test]
fn complete_registration_and_login() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, registration_export_key) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let client_finish = client_start
        .state
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .unwrap();
    let server_finish = server_start.state.finish(client_finish.message).unwrap();

    assert_eq!(client_finish.session_key, server_finish.session_key);
    assert_eq!(client_finish.export_key.to_vec(), registration_export_key);
    assert_eq!(
        client_finish.server_s_pk,
        server_setup.keypair().public().clone()
    );
}

#[test]
fn wrong_password_is_rejected() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        b"hunter2",
        ClientRegistrationFinishParameters::default(),
    );

    let client_start = ClientLogin::<Default>::start(&mut rng, b"Hunter2").unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let err = client_start
        .state
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .map(|_| ())
        .unwrap_err();
    assert_eq!(err, ProtocolError::CredentialRecoveryFailed);

    // Without a valid KE3 the server rejects whatever the client could send
    let forged = KE3::deserialize::<Default>(&[0u8; 64]).unwrap();
    let server_err = server_start.state.finish(forged).map(|_| ()).unwrap_err();
    assert_eq!(server_err, ProtocolError::ClientAuthenticationFailed);
}

#[test]
fn unknown_credential_is_indistinguishable_from_wrong_password() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    // Login against a credential the server has no record for
    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        None,
        client_start.message,
        b"ghost",
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let unknown_err = client_start
        .state
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .map(|_| ())
        .unwrap_err();

    // Login against the real record with a wrong password
    let client_start = ClientLogin::<Default>::start(&mut rng, b"wrong password").unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let wrong_err = client_start
        .state
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .map(|_| ())
        .unwrap_err();

    assert_eq!(unknown_err, ProtocolError::CredentialRecoveryFailed);
    assert_eq!(unknown_err, wrong_err);
}

#[test]
fn fake_records_are_deterministic_per_credential() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();

    let r1 = server_setup.fake_record(b"ghost").unwrap().serialize();
    let r2 = server_setup.fake_record(b"ghost").unwrap().serialize();
    let r3 = server_setup.fake_record(b"other ghost").unwrap().serialize();
    assert_eq!(r1, r2);
    assert_ne!(r1, r3);
}

#[test]
fn tampered_server_mac_is_rejected() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();

    // Flip one bit inside the server MAC, the last field of KE2
    let mut ke2_bytes = server_start.message.serialize();
    let last = ke2_bytes.len() - 1;
    ke2_bytes[last] ^= 1;
    let tampered = KE2::<Default>::deserialize(&ke2_bytes).unwrap();

    let err = client_start
        .state
        .finish(tampered, ClientLoginFinishParameters::default())
        .map(|_| ())
        .unwrap_err();
    assert_eq!(err, ProtocolError::ServerAuthenticationFailed);
}

#[test]
fn tampered_envelope_is_rejected() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    // Flip one bit inside the stored envelope's auth tag
    let mut tampered_bytes = file_bytes.clone();
    let last = tampered_bytes.len() - 1;
    tampered_bytes[last] ^= 1;

    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&tampered_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let err = client_start
        .state
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .map(|_| ())
        .unwrap_err();
    assert_eq!(err, ProtocolError::CredentialRecoveryFailed);
}

#[test]
fn context_must_match_on_both_sides() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    // Agreeing on a context succeeds
    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::WithContext(b"shared context".to_vec()),
    )
    .unwrap();
    let client_finish = client_start
        .state
        .finish(
            server_start.message,
            ClientLoginFinishParameters::WithContext(b"shared context".to_vec()),
        )
        .unwrap();
    let server_finish = server_start.state.finish(client_finish.message).unwrap();
    assert_eq!(client_finish.session_key, server_finish.session_key);

    // Disagreeing fails server authentication on the client side
    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::WithContext(b"server context".to_vec()),
    )
    .unwrap();
    let err = client_start
        .state
        .finish(
            server_start.message,
            ClientLoginFinishParameters::WithContext(b"client context".to_vec()),
        )
        .map(|_| ())
        .unwrap_err();
    assert_eq!(err, ProtocolError::ServerAuthenticationFailed);
}

#[test]
fn identities_must_match_on_both_sides() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let ids = Identifiers::ClientAndServerIdentifiers(b"alice".to_vec(), b"example.com".to_vec());
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::WithIdentifiers(ids.clone()),
    );

    // Both sides using the registered identities succeeds
    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::WithIdentifiers(ids.clone()),
    )
    .unwrap();
    let client_finish = client_start
        .state
        .finish(
            server_start.message,
            ClientLoginFinishParameters::WithIdentifiers(ids.clone()),
        )
        .unwrap();
    let server_finish = server_start.state.finish(client_finish.message).unwrap();
    assert_eq!(client_finish.session_key, server_finish.session_key);

    // The client falling back to default identities fails envelope recovery
    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::WithIdentifiers(ids),
    )
    .unwrap();
    let err = client_start
        .state
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .map(|_| ())
        .unwrap_err();
    assert_eq!(err, ProtocolError::CredentialRecoveryFailed);
}

#[test]
fn message_serialization_roundtrips_with_exact_lengths() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();

    let client_reg_start = ClientRegistration::<Default>::start(&mut rng, PASSWORD).unwrap();
    let request_bytes = client_reg_start.message.serialize();
    assert_eq!(request_bytes.len(), 32);

    let server_reg_start = ServerRegistration::<Default>::start(
        &server_setup,
        RegistrationRequest::deserialize(&request_bytes).unwrap(),
        CREDENTIAL_ID,
    )
    .unwrap();
    let response_bytes = server_reg_start.message.serialize();
    assert_eq!(response_bytes.len(), 64);

    let client_reg_finish = client_reg_start
        .state
        .finish(
            &mut rng,
            RegistrationResponse::deserialize(&response_bytes).unwrap(),
            ClientRegistrationFinishParameters::default(),
        )
        .unwrap();
    let record_bytes = client_reg_finish.message.serialize();
    assert_eq!(record_bytes.len(), 32 + 64 + 96);

    let client_login_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let ke1_bytes = client_login_start.message.serialize();
    assert_eq!(ke1_bytes.len(), 32 + 32 + 32);

    let server_login_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(ServerRegistration::<Default>::deserialize(&record_bytes).unwrap()),
        KE1::deserialize(&ke1_bytes).unwrap(),
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let ke2_bytes = server_login_start.message.serialize();
    assert_eq!(ke2_bytes.len(), 32 + 32 + (32 + 96) + 32 + 32 + 64);

    let client_login_finish = client_login_start
        .state
        .finish(
            KE2::deserialize(&ke2_bytes).unwrap(),
            ClientLoginFinishParameters::default(),
        )
        .unwrap();
    let ke3_bytes = client_login_finish.message.serialize();
    assert_eq!(ke3_bytes.len(), 64);

    // Byte-for-byte roundtrips
    assert_eq!(
        RegistrationRequest::<Default>::deserialize(&request_bytes)
            .unwrap()
            .serialize(),
        request_bytes
    );
    assert_eq!(
        RegistrationResponse::<Default>::deserialize(&response_bytes)
            .unwrap()
            .serialize(),
        response_bytes
    );
    assert_eq!(
        RegistrationRecord::<Default>::deserialize(&record_bytes)
            .unwrap()
            .serialize(),
        record_bytes
    );
    assert_eq!(
        KE1::<Default>::deserialize(&ke1_bytes).unwrap().serialize(),
        ke1_bytes
    );
    assert_eq!(
        KE2::<Default>::deserialize(&ke2_bytes).unwrap().serialize(),
        ke2_bytes
    );
    assert_eq!(
        KE3::deserialize::<Default>(&ke3_bytes).unwrap().serialize(),
        ke3_bytes
    );

    // Off-by-one lengths are rejected up front
    fn assert_length_checked<T, F: Fn(&[u8]) -> Result<T, ProtocolError>>(
        bytes: &[u8],
        deserialize: F,
    ) {
        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            deserialize(truncated).map(|_| ()),
            Err(ProtocolError::InvalidMessageLength)
        ));
        let mut extended = bytes.to_vec();
        extended.push(0);
        assert!(matches!(
            deserialize(&extended).map(|_| ()),
            Err(ProtocolError::InvalidMessageLength)
        ));
    }

    assert_length_checked(&request_bytes, RegistrationRequest::<Default>::deserialize);
    assert_length_checked(&response_bytes, RegistrationResponse::<Default>::deserialize);
    assert_length_checked(&record_bytes, RegistrationRecord::<Default>::deserialize);
    assert_length_checked(&ke1_bytes, KE1::<Default>::deserialize);
    assert_length_checked(&ke2_bytes, KE2::<Default>::deserialize);
    assert_length_checked(&ke3_bytes, KE3::deserialize::<Default>);
}

fn seeded_flow(client_seed: u8, server_seed: u8) -> (Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>) {
    let mut client_rng = CycleRng::new((0..64u8).map(|i| i ^ client_seed).collect());
    let mut server_rng = CycleRng::new((0..64u8).map(|i| i ^ server_seed).collect());

    let server_setup = ServerSetup::<Default>::new(&mut server_rng).unwrap();
    let (file_bytes, _) = register(
        &mut client_rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    let client_start = ClientLogin::<Default>::start(&mut client_rng, PASSWORD).unwrap();
    let server_start = ServerLogin::<Default>::start(
        &mut server_rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let ke2_bytes = server_start.message.serialize();
    let client_finish = client_start
        .state
        .finish(
            KE2::deserialize(&ke2_bytes).unwrap(),
            ClientLoginFinishParameters::default(),
        )
        .unwrap();
    let server_finish = server_start.state.finish(client_finish.message).unwrap();

    (
        ke2_bytes,
        client_finish.session_key,
        server_finish.session_key,
        client_finish.export_key.to_vec(),
    )
}

#[test]
fn seeded_runs_reproduce_bit_exactly() {
    let run1 = seeded_flow(0x42, 0x17);
    let run2 = seeded_flow(0x42, 0x17);
    assert_eq!(run1, run2);
    assert_eq!(run1.1, run1.2);

    // Different seeds shift every wire byte
    let run3 = seeded_flow(0x43, 0x17);
    assert_ne!(run1.0, run3.0);
}

#[test]
fn client_registration_state_roundtrip() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();

    let client_start = ClientRegistration::<Default>::start(&mut rng, PASSWORD).unwrap();
    let state_bytes = client_start.state.serialize();
    let restored = ClientRegistration::<Default>::deserialize(&state_bytes).unwrap();
    assert_eq!(restored.serialize(), state_bytes);

    let server_start =
        ServerRegistration::<Default>::start(&server_setup, client_start.message, CREDENTIAL_ID)
            .unwrap();
    assert!(restored
        .finish(
            &mut rng,
            server_start.message,
            ClientRegistrationFinishParameters::default(),
        )
        .is_ok());
}

#[test]
fn login_states_roundtrip_mid_protocol() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let (file_bytes, _) = register(
        &mut rng,
        &server_setup,
        PASSWORD,
        ClientRegistrationFinishParameters::default(),
    );

    let client_start = ClientLogin::<Default>::start(&mut rng, PASSWORD).unwrap();
    let client_state_bytes = client_start.state.serialize().unwrap();
    let restored_client = ClientLogin::<Default>::deserialize(&client_state_bytes).unwrap();
    assert_eq!(restored_client.serialize().unwrap(), client_state_bytes);

    let server_start = ServerLogin::<Default>::start(
        &mut rng,
        &server_setup,
        Some(password_file(&file_bytes)),
        client_start.message,
        CREDENTIAL_ID,
        ServerLoginStartParameters::default(),
    )
    .unwrap();
    let server_state_bytes = server_start.state.serialize();
    let restored_server = ServerLogin::<Default>::deserialize(&server_state_bytes).unwrap();

    let client_finish = restored_client
        .finish(server_start.message, ClientLoginFinishParameters::default())
        .unwrap();
    let server_finish = restored_server.finish(client_finish.message).unwrap();
    assert_eq!(client_finish.session_key, server_finish.session_key);
}

#[test]
fn server_setup_roundtrip() {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Default>::new(&mut rng).unwrap();
    let bytes = server_setup.serialize();
    assert_eq!(bytes.len(), 64 + 32 + 64);
    let restored = ServerSetup::<Default>::deserialize(&bytes).unwrap();
    assert_eq!(restored.serialize(), bytes);
    assert_eq!(restored.keypair().public(), server_setup.keypair().public());

    assert!(matches!(
        ServerSetup::<Default>::deserialize(&bytes[..bytes.len() - 1]).map(|_| ()),
        Err(ProtocolError::InvalidMessageLength)
    ));
}

#[test]
fn configuration_tracks_the_compiled_suite() {
    let config = Configuration::of_suite::<Default>(b"app context").unwrap();
    assert!(config.check::<Default>().is_ok());
    assert_eq!(
        config.check::<Ristretto255Sha512>(),
        Err(ProtocolError::ConfigurationInvalid)
    );

    let recovered = Configuration::deserialize(&config.serialize()).unwrap();
    assert_eq!(recovered, config);
    assert!(recovered.check::<Default>().is_ok());
}
