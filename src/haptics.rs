/// Best-effort short vibration.
///
/// Implementations swallow every failure; a missing vibration motor must not
/// change what the pickers commit.
pub trait Haptics {
    fn pulse(&self, duration_ms: u32);
}

/// For hosts without a vibration capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn pulse(&self, _duration_ms: u32) {}
}
