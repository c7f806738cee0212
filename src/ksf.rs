// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Trait specifying the memory-hard key stretching function applied to the
//! OPRF output

use crate::errors::InternalError;

use hmac::Hmac;
use sha2::Sha512;

/// Used for the key stretching function in OPAQUE. The protocol invokes it
/// with a zero-filled salt and an output buffer of hash length.
pub trait Ksf: Default {
    /// Stretches `input` with `salt`, filling `output` completely
    fn stretch(&self, input: &[u8], salt: &[u8], output: &mut [u8]) -> Result<(), InternalError>;
}

/// A no-op stretch which simply copies its input. Only suitable for testing
/// and for deployments which run the stretching step elsewhere.
#[derive(Default)]
pub struct Identity;

impl Ksf for Identity {
    fn stretch(&self, input: &[u8], _salt: &[u8], output: &mut [u8]) -> Result<(), InternalError> {
        if input.len() != output.len() {
            return Err(InternalError::KsfError);
        }
        output.copy_from_slice(input);
        Ok(())
    }
}

impl Ksf for argon2::Argon2<'_> {
    fn stretch(&self, input: &[u8], salt: &[u8], output: &mut [u8]) -> Result<(), InternalError> {
        self.hash_password_into(input, salt, output)
            .map_err(|_| InternalError::KsfError)
    }
}

/// The scrypt key stretching function with configurable cost parameters
pub struct Scrypt {
    log_n: u8,
    r: u32,
    p: u32,
}

impl Default for Scrypt {
    fn default() -> Self {
        // Parameters recommended for interactive logins
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

impl Ksf for Scrypt {
    fn stretch(&self, input: &[u8], salt: &[u8], output: &mut [u8]) -> Result<(), InternalError> {
        let params =
            scrypt::Params::new(self.log_n, self.r, self.p).map_err(|_| InternalError::KsfError)?;
        scrypt::scrypt(input, salt, &params, output).map_err(|_| InternalError::KsfError)
    }
}

/// PBKDF2 instantiated with HMAC-SHA-512
pub struct Pbkdf2Sha512 {
    iterations: u32,
}

impl Default for Pbkdf2Sha512 {
    fn default() -> Self {
        Self { iterations: 10_000 }
    }
}

impl Ksf for Pbkdf2Sha512 {
    fn stretch(&self, input: &[u8], salt: &[u8], output: &mut [u8]) -> Result<(), InternalError> {
        pbkdf2::pbkdf2::<Hmac<Sha512>>(input, salt, self.iterations, output);
        Ok(())
    }
}
