//! Construction-time configuration.

/// Capacity and framing constants supplied once when the core is built.
///
/// There is no persisted configuration; a fresh [`BridgeConfig`] is
/// constructed each process lifetime, matching the stateless-at-boot
/// lifecycle of the mesh security context it sits alongside.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BridgeConfig {
    /// Maximum number of fixtures that may have a running software effect
    /// at once.
    pub max_lights: usize,
    /// TTL used for standard (non-control) network PDUs.
    pub default_ttl: u8,
}

impl BridgeConfig {
    /// Effect/fixture capacity of the reference fixture network this
    /// protocol was built for.
    pub const DEFAULT_MAX_LIGHTS: usize = 9;
    /// TTL the source always uses for access-message network PDUs.
    pub const DEFAULT_TTL: u8 = 7;
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_lights: Self::DEFAULT_MAX_LIGHTS,
            default_ttl: Self::DEFAULT_TTL,
        }
    }
}
