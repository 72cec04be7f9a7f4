//! Proxy PDU framing (spec.md §4.2), built on top of [`super::security`] and
//! `meshlink_crypto`.
//!
//! Grounded on `mesh_crypto.c`'s `mesh_crypto_create_standard_pdu` and
//! `mesh_crypto_create_proxy_filter_setup`.

use tracing::{debug, error};

use super::security::SecurityContext;
use crate::{Error, ErrorKind, Result};

/// Proxy PDU type byte for a network PDU (SAR=complete, Type=Network PDU).
pub const PROXY_PDU_NETWORK: u8 = 0x00;
/// Proxy PDU type byte for a proxy configuration message.
pub const PROXY_PDU_PROXY_CONFIG: u8 = 0x02;

/// Lower transport opcode for "Set Filter Type" (proxy configuration).
const SET_FILTER_TYPE: u8 = 0x00;
/// Filter type "blacklist" — accept everything not explicitly excluded.
const FILTER_TYPE_BLACKLIST: u8 = 0x01;

/// Destination used by proxy configuration messages, which address the
/// locally-attached node rather than any mesh unicast.
const PROXY_CONFIG_DST: u16 = 0x0000;

impl SecurityContext {
    /// Builds a standard (non-control) proxy PDU carrying `access_message`
    /// addressed to `dst`, consuming one sequence number.
    ///
    /// # Errors
    /// [`ErrorKind::NotInitialized`] if `set_keys` has not run yet, in which
    /// case the sequence counter is never touched. [`ErrorKind::CryptoFailure`]
    /// if a CCM primitive rejects the input — the sequence number has
    /// already been advanced by the time either CCM call runs, so this
    /// branch does *not* leave the counter unchanged. Spec §7 only requires
    /// sequence-preservation for *link-unready*, which the caller checks
    /// before ever reaching this function.
    pub fn build_standard_pdu(&mut self, dst: u16, access_message: &[u8], ttl: u8) -> Result<Vec<u8>> {
        let keys = *self.keys()?;
        let seq = self.next_sequence()?;
        let src = keys.src_address;

        debug!(dst = %format!("{dst:#06x}"), seq = %format!("{seq:#08x}"), access_len = access_message.len(), "assembling standard PDU");

        let app_nonce = meshlink_crypto::application_nonce(seq, src, dst, keys.iv_index);
        let encrypted_access = meshlink_crypto::ccm_encrypt(
            &keys.app_key,
            &app_nonce,
            access_message,
            meshlink_crypto::MicSize::Bytes4,
        )
        .map_err(|e| log_crypto_failure("access layer", e))?;

        // SEG=0, AKF=1, AID in the low 6 bits.
        let ltp_header = 0x40 | (self.aid() & 0x3F);
        let mut lower_transport = Vec::with_capacity(1 + encrypted_access.len());
        lower_transport.push(ltp_header);
        lower_transport.extend_from_slice(&encrypted_access);

        let mut dst_transport = Vec::with_capacity(2 + lower_transport.len());
        dst_transport.extend_from_slice(&dst.to_be_bytes());
        dst_transport.extend_from_slice(&lower_transport);

        let net_nonce = meshlink_crypto::network_nonce(false, ttl, seq, src, keys.iv_index);
        let encrypted_net = meshlink_crypto::ccm_encrypt(
            self.encryption_key(),
            &net_nonce,
            &dst_transport,
            meshlink_crypto::MicSize::Bytes4,
        )
        .map_err(|e| log_crypto_failure("network layer", e))?;

        let ivi = (keys.iv_index & 0x01) as u8;
        let nid_byte = (ivi << 7) | (self.nid() & 0x7F);
        let ctl_ttl = ttl & 0x7F;

        let header = [
            ctl_ttl,
            ((seq >> 16) & 0xFF) as u8,
            ((seq >> 8) & 0xFF) as u8,
            (seq & 0xFF) as u8,
            ((src >> 8) & 0xFF) as u8,
            (src & 0xFF) as u8,
        ];
        let obfuscated = meshlink_crypto::obfuscate(header, &encrypted_net, self.privacy_key(), keys.iv_index);

        let mut pdu = Vec::with_capacity(2 + obfuscated.len() + encrypted_net.len());
        pdu.push(PROXY_PDU_NETWORK);
        pdu.push(nid_byte);
        pdu.extend_from_slice(&obfuscated);
        pdu.extend_from_slice(&encrypted_net);
        Ok(pdu)
    }

    /// Builds the boot-handshake proxy filter setup PDU (blacklist = accept
    /// all), consuming one sequence number. CTL=1/TTL=0, 8-byte NetMIC.
    ///
    /// # Errors
    /// Same as [`Self::build_standard_pdu`].
    pub fn build_proxy_filter_setup(&mut self) -> Result<Vec<u8>> {
        let keys = *self.keys()?;
        let seq = self.next_sequence()?;
        let src = keys.src_address;

        let lower_transport = [SET_FILTER_TYPE, FILTER_TYPE_BLACKLIST];
        let mut dst_transport = Vec::with_capacity(2 + lower_transport.len());
        dst_transport.extend_from_slice(&PROXY_CONFIG_DST.to_be_bytes());
        dst_transport.extend_from_slice(&lower_transport);

        let net_nonce = meshlink_crypto::network_nonce(true, 0, seq, src, keys.iv_index);
        let encrypted_net = meshlink_crypto::ccm_encrypt(
            self.encryption_key(),
            &net_nonce,
            &dst_transport,
            meshlink_crypto::MicSize::Bytes8,
        )
        .map_err(|e| log_crypto_failure("proxy filter setup", e))?;

        let ivi = (keys.iv_index & 0x01) as u8;
        let nid_byte = (ivi << 7) | (self.nid() & 0x7F);
        let ctl_ttl = 0x80; // CTL=1, TTL=0

        let header = [
            ctl_ttl,
            ((seq >> 16) & 0xFF) as u8,
            ((seq >> 8) & 0xFF) as u8,
            (seq & 0xFF) as u8,
            ((src >> 8) & 0xFF) as u8,
            (src & 0xFF) as u8,
        ];
        let obfuscated = meshlink_crypto::obfuscate(header, &encrypted_net, self.privacy_key(), keys.iv_index);

        let mut pdu = Vec::with_capacity(2 + obfuscated.len() + encrypted_net.len());
        pdu.push(PROXY_PDU_PROXY_CONFIG);
        pdu.push(nid_byte);
        pdu.extend_from_slice(&obfuscated);
        pdu.extend_from_slice(&encrypted_net);
        Ok(pdu)
    }
}

fn log_crypto_failure(stage: &'static str, e: meshlink_crypto::CryptoError) -> Error {
    error!(%stage, %e, "CCM encryption failed");
    ErrorKind::CryptoFailure(e).into()
}

#[cfg(test)]
mod tests {
    use super::super::security::KeySet;
    use super::*;

    fn ctx() -> SecurityContext {
        let mut ctx = SecurityContext::new();
        ctx.init(KeySet {
            network_key: [0x01; 16],
            app_key: [0x02; 16],
            iv_index: 1,
            src_address: 0x0001,
        });
        ctx
    }

    #[test]
    fn standard_pdu_starts_with_network_type_byte() {
        let mut ctx = ctx();
        let access = [0u8; 11];
        let pdu = ctx.build_standard_pdu(0x0100, &access, 7).unwrap();
        assert_eq!(pdu[0], PROXY_PDU_NETWORK);
    }

    #[test]
    fn standard_pdu_requires_init() {
        let mut ctx = SecurityContext::new();
        let access = [0u8; 11];
        assert!(ctx.build_standard_pdu(0x0100, &access, 7).is_err());
    }

    #[test]
    fn proxy_filter_setup_starts_with_control_type_byte_and_8_byte_mic() {
        let mut ctx = ctx();
        let pdu = ctx.build_proxy_filter_setup().unwrap();
        assert_eq!(pdu[0], PROXY_PDU_PROXY_CONFIG);
        // header: type(1) + ivi/nid(1) + obfuscated(6) + (2-byte plaintext + 8-byte MIC)
        assert_eq!(pdu.len(), 1 + 1 + 6 + 2 + 8);
    }

    #[test]
    fn sequence_numbers_are_unique_across_standard_pdus() {
        let mut ctx = ctx();
        let access = [0u8; 11];
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            ctx.build_standard_pdu(0x0100, &access, 7).unwrap();
            assert!(seen.insert(ctx.sequence_number()));
        }
    }

    #[test]
    fn failed_build_does_not_advance_sequence_past_the_failing_attempt() {
        // Every successful build advances exactly once; this just pins down
        // that a not-initialized context never gets that far.
        let mut ctx = SecurityContext::new();
        let before = ctx.sequence_number();
        let _ = ctx.build_standard_pdu(0x0100, &[0u8; 11], 7);
        assert_eq!(ctx.sequence_number(), before);
    }
}
