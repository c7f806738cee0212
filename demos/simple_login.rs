// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A walkthrough of registration and login over an in-memory "wire",
//! using the recommended ristretto255 / SHA-512 / Argon2id suite.
//!
//! Run with: `cargo run --example simple_login`

use std::collections::HashMap;

use opaque_auth::ciphersuite::Ristretto255Sha512;
use opaque_auth::errors::ProtocolError;
use opaque_auth::{
    ClientLogin, ClientLoginFinishParameters, ClientRegistration,
    ClientRegistrationFinishParameters, ServerLogin, ServerLoginStartParameters,
    ServerRegistration, ServerSetup, KE1, KE2, KE3, RegistrationRecord, RegistrationRequest,
    RegistrationResponse,
};
use rand::rngs::OsRng;

/// The server's record store, keyed by credential identifier
type RecordStore = HashMap<Vec<u8>, Vec<u8>>;

fn register(
    rng: &mut OsRng,
    server_setup: &ServerSetup<Ristretto255Sha512>,
    store: &mut RecordStore,
    credential_id: &[u8],
    password: &[u8],
) -> Result<(), ProtocolError> {
    let client_start = ClientRegistration::<Ristretto255Sha512>::start(rng, password)?;
    let request_bytes = client_start.message.serialize();

    // Server side
    let response_bytes = {
        let request = RegistrationRequest::deserialize(&request_bytes)?;
        ServerRegistration::start(server_setup, request, credential_id)?
            .message
            .serialize()
    };

    let client_finish = client_start.state.finish(
        rng,
        RegistrationResponse::deserialize(&response_bytes)?,
        ClientRegistrationFinishParameters::default(),
    )?;
    let record_bytes = client_finish.message.serialize();

    // Server side
    let record = RegistrationRecord::<Ristretto255Sha512>::deserialize(&record_bytes)?;
    let password_file = ServerRegistration::finish(record);
    store.insert(credential_id.to_vec(), password_file.serialize());
    Ok(())
}

fn login(
    rng: &mut OsRng,
    server_setup: &ServerSetup<Ristretto255Sha512>,
    store: &RecordStore,
    credential_id: &[u8],
    password: &[u8],
) -> Result<bool, ProtocolError> {
    let client_start = ClientLogin::<Ristretto255Sha512>::start(rng, password)?;
    let ke1_bytes = client_start.message.serialize();

    // Server side: unknown credentials still get a well-formed answer
    let (ke2_bytes, server_state_bytes) = {
        let password_file = store
            .get(credential_id)
            .map(|bytes| ServerRegistration::deserialize(bytes))
            .transpose()?;
        let server_start = ServerLogin::start(
            rng,
            server_setup,
            password_file,
            KE1::deserialize(&ke1_bytes)?,
            credential_id,
            ServerLoginStartParameters::default(),
        )?;
        (
            server_start.message.serialize(),
            server_start.state.serialize(),
        )
    };

    let client_finish = match client_start.state.finish(
        KE2::deserialize(&ke2_bytes)?,
        ClientLoginFinishParameters::default(),
    ) {
        Ok(result) => result,
        Err(ProtocolError::CredentialRecoveryFailed) => return Ok(false),
        Err(e) => return Err(e),
    };
    let ke3_bytes = client_finish.message.serialize();

    // Server side
    let session_key = {
        let server_state = ServerLogin::<Ristretto255Sha512>::deserialize(&server_state_bytes)?;
        server_state.finish(KE3::deserialize::<Ristretto255Sha512>(&ke3_bytes)?)?
    };

    assert_eq!(client_finish.session_key, session_key.session_key);
    Ok(true)
}

fn main() -> Result<(), ProtocolError> {
    let mut rng = OsRng;
    let server_setup = ServerSetup::<Ristretto255Sha512>::new(&mut rng)?;
    let mut store = RecordStore::new();

    register(
        &mut rng,
        &server_setup,
        &mut store,
        b"alice@example.com",
        b"correct horse battery staple",
    )?;
    println!("registered alice@example.com");

    for (credential_id, password) in [
        (&b"alice@example.com"[..], &b"correct horse battery staple"[..]),
        (&b"alice@example.com"[..], &b"tr0ub4dor&3"[..]),
        (&b"mallory@example.com"[..], &b"correct horse battery staple"[..]),
    ] {
        let accepted = login(&mut rng, &server_setup, &store, credential_id, password)?;
        println!(
            "login {} / {:?}: {}",
            String::from_utf8_lossy(credential_id),
            String::from_utf8_lossy(password),
            if accepted { "accepted" } else { "rejected" }
        );
    }

    Ok(())
}
