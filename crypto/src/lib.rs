//! Bluetooth Mesh cryptographic toolbox (Mesh Profile, Section 3.8).
//!
//! Pure functions only: key derivation (`s1`, `k2`, `k4`), AES-CCM
//! encrypt-and-tag, and network-layer privacy obfuscation. No knowledge of
//! PDU framing lives here — see `meshlink_bridge::mesh` for that.

#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(non_ascii_idents)]
#![warn(single_use_lifetimes)]
#![warn(unused_crate_dependencies)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_lifetimes)]
#![warn(unused_qualifications)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]

use aes::Aes128;
use cipher::{BlockEncrypt, KeyInit};
use cmac::{Cmac, Mac};

mod ccm;
mod nonce;

pub use ccm::{ccm_encrypt, obfuscate, MicSize};
pub use nonce::{application_nonce, network_nonce};

/// Failures from the primitives in this crate. All are either malformed
/// inputs (wrong key/nonce length) the caller should never produce, or a
/// fixed-size buffer overflow — both programmer errors rather than runtime
/// conditions a fixture network can trigger.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CryptoError {
    #[error("plaintext of {0} bytes exceeds the CCM buffer budget")]
    PlaintextTooLarge(usize),
}

pub type Result<T> = core::result::Result<T, CryptoError>;

/// One AES-128-ECB block encryption, `AES(key, block)`.
pub(crate) fn aes_ecb_block(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    let cipher = Aes128::new_from_slice(key).expect("16-byte key");
    let mut out = (*block).into();
    cipher.encrypt_block(&mut out);
    out.into()
}

/// AES-CMAC (RFC 4493) over `key`/`msg`.
fn aes_cmac(key: &[u8; 16], msg: &[u8]) -> [u8; 16] {
    let mut mac = <Cmac<Aes128> as Mac>::new_from_slice(key).expect("16-byte key");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// `s1(M) = AES-CMAC(zero, M)` (Mesh Profile, Section 3.8.2.1).
#[must_use]
pub fn s1(m: &[u8]) -> [u8; 16] {
    aes_cmac(&[0u8; 16], m)
}

/// `k2(N, P)` network-key material derivation (Mesh Profile, Section 3.8.2.6).
///
/// Returns `(nid, encryption_key, privacy_key)`.
#[must_use]
pub fn k2(n: &[u8; 16], p: &[u8]) -> (u8, [u8; 16], [u8; 16]) {
    let salt = s1(b"smk2");
    let t = aes_cmac(&salt, n);

    let mut t1_input = Vec::with_capacity(p.len() + 1);
    t1_input.extend_from_slice(p);
    t1_input.push(0x01);
    let t1 = aes_cmac(&t, &t1_input);

    let mut t2_input = Vec::with_capacity(16 + p.len() + 1);
    t2_input.extend_from_slice(&t1);
    t2_input.extend_from_slice(p);
    t2_input.push(0x02);
    let t2 = aes_cmac(&t, &t2_input);

    let mut t3_input = Vec::with_capacity(16 + p.len() + 1);
    t3_input.extend_from_slice(&t2);
    t3_input.extend_from_slice(p);
    t3_input.push(0x03);
    let t3 = aes_cmac(&t, &t3_input);

    (t1[15] & 0x7F, t2, t3)
}

/// `k4(N)` application-key AID derivation (Mesh Profile, Section 3.8.2.8).
#[must_use]
pub fn k4(n: &[u8; 16]) -> u8 {
    let salt = s1(b"smk4");
    let t = aes_cmac(&salt, n);
    let result = aes_cmac(&t, b"id6\x01");
    result[15] & 0x3F
}

/// AES-ECB single-block encrypt, exposed for privacy obfuscation
/// (Mesh Profile, Section 3.8.7.3).
#[must_use]
pub fn e(key: &[u8; 16], block: &[u8; 16]) -> [u8; 16] {
    aes_ecb_block(key, block)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4493 test vectors, reused here because s1/k2/k4 all bottom out in
    // plain AES-CMAC under a caller-supplied key.
    const RFC4493_KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];

    #[test]
    fn cmac_empty_message() {
        let got = aes_cmac(&RFC4493_KEY, b"");
        let want: [u8; 16] = [
            0xbb, 0x1d, 0x69, 0x29, 0xe9, 0x59, 0x37, 0x28, 0x7f, 0xa3, 0x7d, 0x12, 0x9b, 0x75,
            0x67, 0x46,
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn cmac_16_byte_message() {
        let m: [u8; 16] = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];
        let got = aes_cmac(&RFC4493_KEY, &m);
        let want: [u8; 16] = [
            0x07, 0x0a, 0x16, 0xb4, 0x6b, 0x4d, 0x41, 0x44, 0xf7, 0x9b, 0xdd, 0x9d, 0xd0, 0x4a,
            0x28, 0x7c,
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn s1_is_deterministic() {
        assert_eq!(s1(b"smk2"), s1(b"smk2"));
        assert_ne!(s1(b"smk2"), s1(b"smk4"));
    }

    #[test]
    fn k2_nid_is_7_bits() {
        let network_key = [0x01; 16];
        let (nid, enc, privacy) = k2(&network_key, &[0x00]);
        assert_eq!(nid & 0x80, 0);
        assert_ne!(enc, privacy);
    }

    #[test]
    fn k4_aid_is_6_bits() {
        let app_key = [0x02; 16];
        assert_eq!(k4(&app_key) & 0xC0, 0);
    }

    #[test]
    fn k2_k4_are_pure() {
        let network_key = [0xAA; 16];
        let app_key = [0xBB; 16];
        let a = k2(&network_key, &[0x00]);
        let b = k2(&network_key, &[0x00]);
        assert_eq!(a, b);
        assert_eq!(k4(&app_key), k4(&app_key));
    }
}
