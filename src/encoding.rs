// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Fixed-width integers and length-prefixed byte string framing shared by all
//! message layouts and key derivation labels

use crate::errors::InternalError;

/// Big-endian encoding of `n` over exactly `w` bytes. Fails when `n` does not
/// fit in `w` bytes.
pub(crate) fn i2osp(n: usize, w: usize) -> Result<Vec<u8>, InternalError> {
    if w > 8 {
        return Err(InternalError::EncodingOverflow);
    }
    if w < 8 && n >= 1usize << (8 * w) {
        return Err(InternalError::EncodingOverflow);
    }
    Ok(n.to_be_bytes()[8 - w..].to_vec())
}

/// Prefixes `input` with its two-byte big-endian length. Inputs longer than
/// 65535 bytes are rejected.
pub(crate) fn encode_vector(input: &[u8]) -> Result<Vec<u8>, InternalError> {
    if input.len() > u16::MAX as usize {
        return Err(InternalError::EncodingOverflow);
    }
    let mut output = Vec::with_capacity(2 + input.len());
    output.extend_from_slice(&(input.len() as u16).to_be_bytes());
    output.extend_from_slice(input);
    Ok(output)
}

/// Splits a two-byte length-prefixed vector off the front of `input`,
/// returning the content and the remainder.
pub(crate) fn decode_vector(input: &[u8]) -> Result<(&[u8], &[u8]), InternalError> {
    if input.len() < 2 {
        return Err(InternalError::SizeError {
            name: "vector_length_prefix",
            len: 2,
            actual_len: input.len(),
        });
    }
    let length = u16::from_be_bytes([input[0], input[1]]) as usize;
    if input.len() < 2 + length {
        return Err(InternalError::SizeError {
            name: "vector_contents",
            len: 2 + length,
            actual_len: input.len(),
        });
    }
    Ok((&input[2..2 + length], &input[2 + length..]))
}
