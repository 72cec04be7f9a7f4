//! The process-wide Bluetooth Mesh security context (spec.md §3).
//!
//! One instance lives inside the [`crate::dispatch::Dispatcher`]; nothing
//! outside this crate's `mesh`/`dispatch` modules ever touches
//! `sequence_number` directly, per spec.md §9's "Global mesh context"
//! design note.

use tracing::info;
use zeroize::Zeroize;

use crate::{Error, ErrorKind, Result};

/// Network and application key material supplied by a `set_keys` command.
#[derive(Clone, Copy)]
pub struct KeySet {
    pub network_key: [u8; 16],
    pub app_key: [u8; 16],
    pub iv_index: u32,
    pub src_address: u16,
}

/// The sequence number the source starts from — high enough that a
/// restarted bridge is unlikely to repeat a value a fixture has already
/// accepted (spec.md §3; no persistence is attempted, see §9).
const INITIAL_SEQUENCE_NUMBER: u32 = 0x0001_0000;

/// Network/application key material, its `k2`/`k4` derivation, and the
/// monotonic sequence counter used to build every outgoing PDU.
///
/// Uninitialized at construction; [`SecurityContext::init`] must run
/// exactly once per controller-supplied key set before any PDU can be
/// built. Re-running it resets the derived material and the sequence
/// counter, matching `mesh_crypto_init`'s unconditional overwrite.
pub struct SecurityContext {
    keys: Option<KeySet>,
    nid: u8,
    encryption_key: [u8; 16],
    privacy_key: [u8; 16],
    aid: u8,
    sequence_number: u32,
}

impl std::fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityContext")
            .field("initialized", &self.keys.is_some())
            .field("sequence_number", &self.sequence_number)
            .finish_non_exhaustive()
    }
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SecurityContext {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.privacy_key.zeroize();
        if let Some(mut keys) = self.keys.take() {
            keys.network_key.zeroize();
            keys.app_key.zeroize();
        }
    }
}

impl SecurityContext {
    /// Creates an uninitialized context. No PDU can be built until
    /// [`Self::init`] runs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: None,
            nid: 0,
            encryption_key: [0; 16],
            privacy_key: [0; 16],
            aid: 0,
            sequence_number: INITIAL_SEQUENCE_NUMBER,
        }
    }

    /// Derives `(nid, encryption_key, privacy_key)` via `k2` and `aid` via
    /// `k4`, and resets the sequence counter. Idempotent: calling this
    /// again with a fresh key set fully replaces the derived material.
    pub fn init(&mut self, keys: KeySet) {
        let (nid, encryption_key, privacy_key) = meshlink_crypto::k2(&keys.network_key, &[0x00]);
        let aid = meshlink_crypto::k4(&keys.app_key);

        self.nid = nid;
        self.encryption_key = encryption_key;
        self.privacy_key = privacy_key;
        self.aid = aid;
        self.sequence_number = INITIAL_SEQUENCE_NUMBER;
        self.keys = Some(keys);

        info!(
            nid = %format!("{nid:#04x}"),
            aid = %format!("{aid:#04x}"),
            iv_index = %format!("{:#010x}", keys.iv_index),
            src = %format!("{:#06x}", keys.src_address),
            "mesh security context initialized"
        );
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.keys.is_some()
    }

    #[must_use]
    pub(super) fn aid(&self) -> u8 {
        self.aid
    }

    #[must_use]
    pub(super) fn nid(&self) -> u8 {
        self.nid
    }

    #[must_use]
    pub(super) fn encryption_key(&self) -> &[u8; 16] {
        &self.encryption_key
    }

    #[must_use]
    pub(super) fn privacy_key(&self) -> &[u8; 16] {
        &self.privacy_key
    }

    pub(super) fn keys(&self) -> Result<&KeySet> {
        self.keys.as_ref().ok_or(Error::from(ErrorKind::NotInitialized))
    }

    /// Returns the next sequence number, advancing the counter. Must only
    /// be called once a PDU is certain to be built and sent — callers that
    /// abort before encryption must not call this (spec.md §4.2, §7).
    pub(super) fn next_sequence(&mut self) -> Result<u32> {
        if !self.is_initialized() {
            return Err(ErrorKind::NotInitialized.into());
        }
        self.sequence_number = self.sequence_number.wrapping_add(1) & 0x00FF_FFFF;
        Ok(self.sequence_number)
    }

    /// Current sequence number without advancing it, for diagnostics/tests.
    #[must_use]
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeySet {
        KeySet {
            network_key: [0x01; 16],
            app_key: [0x02; 16],
            iv_index: 1,
            src_address: 0x0001,
        }
    }

    #[test]
    fn uninitialized_by_default() {
        let ctx = SecurityContext::new();
        assert!(!ctx.is_initialized());
    }

    #[test]
    fn init_derives_material_and_resets_sequence() {
        let mut ctx = SecurityContext::new();
        ctx.init(keys());
        assert!(ctx.is_initialized());
        assert_eq!(ctx.sequence_number(), INITIAL_SEQUENCE_NUMBER);
        assert_eq!(ctx.nid() & 0x80, 0);
        assert_eq!(ctx.aid() & 0xC0, 0);
    }

    #[test]
    fn next_sequence_requires_init() {
        let mut ctx = SecurityContext::new();
        assert!(matches!(
            ctx.next_sequence().unwrap_err().kind(),
            ErrorKind::NotInitialized
        ));
    }

    #[test]
    fn next_sequence_is_strictly_monotonic() {
        let mut ctx = SecurityContext::new();
        ctx.init(keys());
        let mut prev = ctx.sequence_number();
        for _ in 0..100 {
            let seq = ctx.next_sequence().unwrap();
            assert!(seq > prev);
            prev = seq;
        }
    }

    #[test]
    fn reinit_resets_sequence_counter() {
        let mut ctx = SecurityContext::new();
        ctx.init(keys());
        ctx.next_sequence().unwrap();
        ctx.next_sequence().unwrap();
        ctx.init(keys());
        assert_eq!(ctx.sequence_number(), INITIAL_SEQUENCE_NUMBER);
    }
}
