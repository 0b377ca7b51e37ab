//! Platform power-management service interface and discovery.
//!
//! The platform service owns the physical eject mechanism and the shared
//! interrupt channel. It is discovered once per process and shared read-only
//! by every socket controller; no controller owns it and its lifetime
//! exceeds any single socket's.

use alloc::sync::Arc;

use axerrno::AxResult;
use spin::RwLock;

use crate::command::MiscCommand;
use crate::dispatch::ContextToken;

/// Identifier of an interrupt class registered with the platform service.
///
/// The service multiplexes several unrelated interrupt sources over the same
/// callback infrastructure; the class identifier is echoed back on every
/// delivery so a callback can reject classes it never asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterruptClass(pub u8);

/// Interrupt class carrying eject-button and eject-timeout events.
pub const EJECT_INTERRUPT_CLASS: InterruptClass = InterruptClass(0x04);

/// Default spin bound for the provisioning-time service wait.
///
/// Provisioning waits for the platform service to become discoverable; the
/// wait is bounded so a missing service degrades to a provisioning failure
/// instead of blocking start-up forever. Hosts that want the unbounded
/// behavior can call [`ServiceLocator::wait_for`] with `0` themselves.
pub const PROVISION_WAIT_SPINS: usize = 1_000_000;

/// Interface to the platform power-management service.
///
/// All three operations are in-process calls; none of them may be invoked
/// from the interrupt dispatch path except `send_command`, which must not
/// block.
pub trait PlatformService: Send + Sync {
    /// Registers interest in an interrupt class.
    ///
    /// The `token` is an opaque per-registration identity; the service hands
    /// it back verbatim with every delivery of the class so the dispatch
    /// entry point can resolve the owning controller.
    fn register_interest(&self, class: InterruptClass, token: ContextToken) -> AxResult;

    /// Withdraws a previously registered interest.
    ///
    /// No result is observed; a failed deregistration only means a few more
    /// deliveries that the demultiplexer will drop as unknown.
    fn deregister(&self, token: ContextToken, class: InterruptClass);

    /// Transmits a single command block. Fire-and-forget: the eject protocol
    /// reads no response payload back.
    fn send_command(&self, cmd: &MiscCommand) -> AxResult;
}

/// Discovery point for the process-wide platform service.
///
/// The service is installed once when the platform layer comes up; after
/// that the slot is read-only shared state, so no locking discipline beyond
/// "discover once" applies to consumers.
pub struct ServiceLocator {
    slot: RwLock<Option<Arc<dyn PlatformService>>>,
}

impl ServiceLocator {
    /// Creates an empty locator.
    pub const fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Installs the discovered service. The first installation wins.
    pub fn install(&self, service: Arc<dyn PlatformService>) {
        let mut slot = self.slot.write();
        if slot.is_some() {
            warn!("platform service already installed, ignoring reinstall");
            return;
        }
        debug!("platform service installed");
        *slot = Some(service);
    }

    /// Gets the service if it has been discovered.
    pub fn get(&self) -> Option<Arc<dyn PlatformService>> {
        self.slot.read().clone()
    }

    /// Waits for the service to become discoverable.
    ///
    /// Spins (with CPU relax hints) until the service is installed or
    /// `max_spins` iterations have elapsed; `0` means no bound. Only
    /// provisioning may call this; nothing on the dispatch path waits.
    pub fn wait_for(&self, max_spins: usize) -> Option<Arc<dyn PlatformService>> {
        let mut spins = 0;

        loop {
            if let Some(service) = self.get() {
                return Some(service);
            }

            if max_spins > 0 && spins >= max_spins {
                return None;
            }

            for _ in 0..100 {
                core::hint::spin_loop();
            }
            spins += 100;
        }
    }
}

impl Default for ServiceLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axerrno::ax_err;

    struct NullService;

    impl PlatformService for NullService {
        fn register_interest(&self, _class: InterruptClass, _token: ContextToken) -> AxResult {
            Ok(())
        }

        fn deregister(&self, _token: ContextToken, _class: InterruptClass) {}

        fn send_command(&self, _cmd: &MiscCommand) -> AxResult {
            ax_err!(Unsupported, "null service")
        }
    }

    #[test]
    fn test_locator_empty() {
        let locator = ServiceLocator::new();
        assert!(locator.get().is_none());
    }

    #[test]
    fn test_locator_install_and_get() {
        let locator = ServiceLocator::new();
        locator.install(Arc::new(NullService));
        assert!(locator.get().is_some());

        // Already installed, so the bounded wait returns immediately.
        assert!(locator.wait_for(100).is_some());
    }

    #[test]
    fn test_locator_bounded_wait_expires() {
        let locator = ServiceLocator::new();
        assert!(locator.wait_for(500).is_none());
    }

    #[test]
    fn test_locator_first_install_wins() {
        let locator = ServiceLocator::new();
        let first: Arc<dyn PlatformService> = Arc::new(NullService);
        locator.install(Arc::clone(&first));
        locator.install(Arc::new(NullService));

        let resolved = locator.get().unwrap();
        assert!(Arc::ptr_eq(&resolved, &first));
    }
}
