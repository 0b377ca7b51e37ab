//! Per-socket registration state machine.
//!
//! A socket moves Unregistered → Registered exactly once during a successful
//! provision and back on teardown. Transitions use CAS on a single atomic so
//! that an overlapping teardown observes a consistent state and the second
//! caller becomes a no-op.

use core::sync::atomic::{AtomicU8, Ordering};

/// Registration states for one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RegistrationState {
    /// Interrupt interest not registered; the socket must not issue commands
    /// or accept dispatched events.
    Unregistered = 0,
    /// Interrupt interest registered with the platform service.
    Registered = 1,
}

/// Atomic registration state for one socket.
pub struct Registration(AtomicU8);

impl Registration {
    const UNREGISTERED: u8 = RegistrationState::Unregistered as u8;
    const REGISTERED: u8 = RegistrationState::Registered as u8;

    /// Creates a new registration in the Unregistered state.
    pub const fn new() -> Self {
        Self(AtomicU8::new(Self::UNREGISTERED))
    }

    /// Gets the current state.
    #[inline]
    pub fn state(&self) -> RegistrationState {
        match self.0.load(Ordering::Acquire) {
            Self::REGISTERED => RegistrationState::Registered,
            _ => RegistrationState::Unregistered,
        }
    }

    /// Checks whether the socket is currently registered.
    #[inline]
    pub fn is_registered(&self) -> bool {
        self.state() == RegistrationState::Registered
    }

    /// Transitions Unregistered → Registered.
    ///
    /// Returns `true` if the transition fired, `false` if already registered.
    pub fn mark_registered(&self) -> bool {
        self.0
            .compare_exchange(
                Self::UNREGISTERED,
                Self::REGISTERED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Transitions Registered → Unregistered.
    ///
    /// Returns `true` if the transition fired. Returns `false` if the socket
    /// was already unregistered, which makes teardown idempotent: exactly one
    /// caller performs the deregistration side effects.
    pub fn mark_unregistered(&self) -> bool {
        self.0
            .compare_exchange(
                Self::REGISTERED,
                Self::UNREGISTERED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Registration").field(&self.state()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let reg = Registration::new();
        assert_eq!(reg.state(), RegistrationState::Unregistered);
        assert!(!reg.is_registered());
    }

    #[test]
    fn test_register_transition() {
        let reg = Registration::new();
        assert!(reg.mark_registered());
        assert!(reg.is_registered());

        // Second attempt is a no-op
        assert!(!reg.mark_registered());
        assert!(reg.is_registered());
    }

    #[test]
    fn test_unregister_idempotent() {
        let reg = Registration::new();
        assert!(reg.mark_registered());

        assert!(reg.mark_unregistered());
        assert_eq!(reg.state(), RegistrationState::Unregistered);

        // Second teardown observes the transition already taken
        assert!(!reg.mark_unregistered());
        assert_eq!(reg.state(), RegistrationState::Unregistered);
    }

    #[test]
    fn test_unregister_without_register() {
        let reg = Registration::new();
        assert!(!reg.mark_unregistered());
    }
}
