//! Socket-scoped interrupt demultiplexing.
//!
//! One interrupt class is registered with the platform service and every
//! event on that class is broadcast to every registered context. The
//! demultiplexer is the single entry point for those deliveries. It is a
//! stateless filter pipeline:
//!
//! ```text
//! class match → token resolve → record validate → socket match → classify
//!      │             │                │                │
//!      └─────────────┴──── drop ──────┴────────────────┘
//! ```
//!
//! Every stage may short-circuit to a drop. Drops are first-class outcomes
//! rather than errors: interrupts are unsolicited, there is no caller to
//! report a discard to, and foreign-socket traffic is expected noise on a
//! broadcast channel. No stage may panic or propagate an error past this
//! boundary, and nothing here blocks.
//!
//! Controllers are resolved through a token table instead of casting an
//! opaque pointer: the platform service echoes the [`ContextToken`] handed
//! to it at registration time, and the table lookup fails closed when the
//! token is unbound or the controller is gone.

use alloc::collections::BTreeMap;
use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicU64, Ordering};

use spin::RwLock;

use crate::controller::SocketEjectController;
use crate::event::{EjectEvent, EventKind};
use crate::platform::InterruptClass;

/// Stable identity for one controller's interrupt registration.
///
/// Allocated from a monotone counter so a token is never reused within a
/// process lifetime; a stale token therefore resolves to nothing instead of
/// to a recycled controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextToken(pub u64);

/// Why a delivery was dropped instead of dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The delivery names an interrupt class this demultiplexer never
    /// registered for.
    ClassMismatch,
    /// The context token resolves to no live controller.
    UnknownContext,
    /// Declared record length below the two-byte minimum.
    Malformed,
    /// The affected-socket byte names another socket.
    ForeignSocket,
}

/// Outcome of one delivery through [`EjectDemux::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Button press for the resolved socket; an eject command was requested.
    Ejecting,
    /// Eject timeout observed for the resolved socket. Informational only.
    TimeoutObserved,
    /// Completion or otherwise unrecognized notification; no action taken.
    Completion,
    /// Delivery filtered out with no observable effect on any socket.
    Dropped(DropReason),
}

/// Demultiplexer fanning shared-class interrupt deliveries out to socket
/// controllers.
pub struct EjectDemux {
    /// The one interrupt class this demultiplexer serves.
    class: InterruptClass,
    /// Live registrations. Weak so a controller dropped without teardown
    /// fails closed at resolve time instead of being kept alive by the table.
    contexts: RwLock<BTreeMap<ContextToken, Weak<SocketEjectController>>>,
    /// Monotone token source.
    next_token: AtomicU64,
}

impl EjectDemux {
    /// Creates a demultiplexer for one interrupt class.
    pub fn new(class: InterruptClass) -> Self {
        Self {
            class,
            contexts: RwLock::new(BTreeMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Gets the interrupt class this demultiplexer serves.
    #[inline]
    pub fn class(&self) -> InterruptClass {
        self.class
    }

    /// Allocates a fresh context token.
    pub(crate) fn allocate_token(&self) -> ContextToken {
        ContextToken(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    /// Binds a token to its controller.
    pub(crate) fn bind(&self, token: ContextToken, controller: &Arc<SocketEjectController>) {
        self.contexts
            .write()
            .insert(token, Arc::downgrade(controller));
    }

    /// Removes a token binding.
    pub(crate) fn unbind(&self, token: ContextToken) {
        self.contexts.write().remove(&token);
    }

    /// Gets the number of bound contexts.
    pub fn bound_count(&self) -> usize {
        self.contexts.read().len()
    }

    /// Entry point invoked by the platform service for each registered
    /// context on every delivery of the class.
    ///
    /// Runs synchronously on the service's delivery context. A button press
    /// for the resolved socket requests an ejection; the request's result is
    /// deliberately ignored here (logged only), since a failed command must
    /// not take the dispatcher down.
    pub fn dispatch(
        &self,
        class: InterruptClass,
        buffer: &[u8],
        token: ContextToken,
    ) -> DispatchOutcome {
        // Callback infrastructure is shared between unrelated classes.
        if class != self.class {
            return DispatchOutcome::Dropped(DropReason::ClassMismatch);
        }

        let controller = match self.contexts.read().get(&token).and_then(Weak::upgrade) {
            Some(controller) => controller,
            None => return DispatchOutcome::Dropped(DropReason::UnknownContext),
        };

        let event = match EjectEvent::parse(buffer) {
            Some(event) => event,
            None => return DispatchOutcome::Dropped(DropReason::Malformed),
        };

        // The same record is broadcast to every registered socket; only the
        // addressed one reacts. A mismatch is not worth logging.
        if u32::from(event.socket) != controller.socket_number() {
            return DispatchOutcome::Dropped(DropReason::ForeignSocket);
        }

        match event.kind {
            EventKind::ButtonRequest => {
                debug!("socket {}: eject button pressed", event.socket);
                if let Err(err) = controller.request_card_ejection() {
                    warn!("socket {}: eject request failed: {:?}", event.socket, err);
                }
                DispatchOutcome::Ejecting
            }
            EventKind::Timeout => {
                debug!("socket {}: eject operation timed out", event.socket);
                controller.stats().record_timeout();
                DispatchOutcome::TimeoutObserved
            }
            EventKind::Completion(flags) => {
                trace!(
                    "socket {}: completion notification, flags {:#04x}",
                    event.socket, flags
                );
                DispatchOutcome::Completion
            }
        }
    }
}

impl core::fmt::Debug for EjectDemux {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EjectDemux")
            .field("class", &self.class)
            .field("bound", &self.bound_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EVENT_BUTTON_REQUEST;
    use crate::platform::EJECT_INTERRUPT_CLASS;

    #[test]
    fn test_dispatch_class_mismatch() {
        let demux = EjectDemux::new(EJECT_INTERRUPT_CLASS);
        let token = demux.allocate_token();

        let outcome = demux.dispatch(InterruptClass(0x07), &[EVENT_BUTTON_REQUEST, 1], token);
        assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::ClassMismatch));
    }

    #[test]
    fn test_dispatch_unknown_token() {
        let demux = EjectDemux::new(EJECT_INTERRUPT_CLASS);
        let token = demux.allocate_token();

        // Token allocated but never bound
        let outcome = demux.dispatch(EJECT_INTERRUPT_CLASS, &[EVENT_BUTTON_REQUEST, 1], token);
        assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::UnknownContext));
    }

    #[test]
    fn test_token_allocation_monotone() {
        let demux = EjectDemux::new(EJECT_INTERRUPT_CLASS);
        let a = demux.allocate_token();
        let b = demux.allocate_token();
        assert!(b > a);
    }
}
