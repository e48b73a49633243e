// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! VNC Authentication: a 16-byte DES challenge-response, with the
//! password used as a (bit-reversed) DES key as RFC 6143 §7.2.2 requires.

use des::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use des::Des;
use rand::RngCore;

const CHALLENGE_LEN: usize = 16;

/// Generates a fresh 16-byte random challenge to send to the client.
#[must_use]
pub fn generate_challenge() -> [u8; CHALLENGE_LEN] {
    let mut challenge = [0u8; CHALLENGE_LEN];
    rand::thread_rng().fill_bytes(&mut challenge);
    challenge
}

/// Encrypts `challenge` with `password` the way a conforming VNC client
/// does, so the server can compare the client's response byte-for-byte.
/// Each byte of the key is bit-reversed, a VNC-specific quirk of the
/// original RFB DES usage.
#[must_use]
pub fn expected_response(challenge: &[u8; CHALLENGE_LEN], password: &str) -> [u8; CHALLENGE_LEN] {
    let mut key = [0u8; 8];
    for (i, b) in password.bytes().take(8).enumerate() {
        key[i] = reverse_bits(b);
    }
    let cipher = Des::new(GenericArray::from_slice(&key));

    let mut response = [0u8; CHALLENGE_LEN];
    for (chunk_in, chunk_out) in challenge.chunks_exact(8).zip(response.chunks_exact_mut(8)) {
        let mut block = GenericArray::clone_from_slice(chunk_in);
        cipher.encrypt_block(&mut block);
        chunk_out.copy_from_slice(&block);
    }
    response
}

/// Verifies a client's 16-byte challenge response against the expected
/// value for `password`, in constant time with respect to byte position.
#[must_use]
pub fn verify_response(challenge: &[u8; CHALLENGE_LEN], response: &[u8], password: &str) -> bool {
    if response.len() != CHALLENGE_LEN {
        return false;
    }
    let expected = expected_response(challenge, password);
    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(response.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

fn reverse_bits(b: u8) -> u8 {
    let mut v = b;
    v = (v & 0xF0) >> 4 | (v & 0x0F) << 4;
    v = (v & 0xCC) >> 2 | (v & 0x33) << 2;
    v = (v & 0xAA) >> 1 | (v & 0x55) << 1;
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let challenge = generate_challenge();
        let response = expected_response(&challenge, "hunter2");
        assert!(verify_response(&challenge, &response, "hunter2"));
    }

    #[test]
    fn wrong_password_fails() {
        let challenge = generate_challenge();
        let response = expected_response(&challenge, "hunter2");
        assert!(!verify_response(&challenge, &response, "wrong"));
    }

    #[test]
    fn truncated_response_fails() {
        let challenge = generate_challenge();
        assert!(!verify_response(&challenge, &[0u8; 4], "hunter2"));
    }

    #[test]
    fn challenges_are_not_all_zero() {
        let a = generate_challenge();
        let b = generate_challenge();
        assert_ne!(a, [0u8; CHALLENGE_LEN]);
        assert_ne!(a, b);
    }
}
