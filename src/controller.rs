//! Per-socket eject controller: provisioning, the command path, teardown.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use axerrno::{ax_err, AxResult};

use crate::command::{CommandChannel, EJECT_CARD_OPCODE};
use crate::config::{BusDevice, BusDeviceKind};
use crate::dispatch::{ContextToken, EjectDemux};
use crate::lifecycle::{Registration, RegistrationState};
use crate::platform::{PlatformService, ServiceLocator, PROVISION_WAIT_SPINS};

/// Base eject-control collaborator.
///
/// Owns the non-command-specific half of the eject protocol: debouncing,
/// card-presence tracking, completion bookkeeping. The controller invokes
/// `eject_completed` exactly once per successfully transmitted eject
/// command and never for a command that failed transmission, so the base
/// controller can never believe an eject is in progress that the device
/// never heard about.
pub trait EjectControlOps: Send + Sync {
    /// Post-command completion bookkeeping.
    fn eject_completed(&self) -> AxResult;
}

/// Per-socket operation counters.
#[derive(Debug, Default)]
pub struct EjectStats {
    /// Button-press events dispatched to this socket.
    pub button_events: AtomicU64,
    /// Timeout events observed for this socket.
    pub timeouts: AtomicU64,
    /// Eject commands successfully transmitted.
    pub commands_issued: AtomicU64,
    /// Eject commands that failed transmission.
    pub command_errors: AtomicU64,
}

impl EjectStats {
    /// Creates a zeroed counter set.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_button(&self) {
        self.button_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_command(&self) {
        self.commands_issued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_command_error(&self) {
        self.command_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets the number of button-press events dispatched.
    #[inline]
    pub fn button_events(&self) -> u64 {
        self.button_events.load(Ordering::Relaxed)
    }

    /// Gets the number of timeout events observed.
    #[inline]
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Gets the number of eject commands transmitted.
    #[inline]
    pub fn commands_issued(&self) -> u64 {
        self.commands_issued.load(Ordering::Relaxed)
    }

    /// Gets the number of failed command transmissions.
    #[inline]
    pub fn command_errors(&self) -> u64 {
        self.command_errors.load(Ordering::Relaxed)
    }
}

/// Controller for one physical card socket.
///
/// Owns the socket identifier and orchestrates the socket's eject lifecycle:
/// registration of interrupt interest at provisioning, the eject command
/// path, and deregistration at teardown. One instance exists per socket;
/// each is provisioned once and keeps its identifier for its lifetime.
pub struct SocketEjectController {
    /// Platform-assigned socket number. Non-zero, immutable.
    socket: u32,
    /// Registration identity handed to the platform service.
    token: ContextToken,
    /// Command transmission seam.
    channel: CommandChannel,
    /// Shared, read-only service handle for register/deregister calls.
    service: Arc<dyn PlatformService>,
    /// Base eject-control collaborator.
    base: Arc<dyn EjectControlOps>,
    /// The demultiplexer this controller is bound into.
    demux: Arc<EjectDemux>,
    /// Registration state machine.
    registration: Registration,
    /// Operation counters.
    stats: EjectStats,
}

impl SocketEjectController {
    /// Provisions a controller for the socket described by `bus`.
    ///
    /// Steps, each of which fails the provision and leaves the socket
    /// permanently inactive (the host never retries automatically):
    ///
    /// 1. Validate the bus handle kind and read the socket number, which
    ///    must be present and non-zero (`InvalidInput` otherwise).
    /// 2. Wait (bounded, [`PROVISION_WAIT_SPINS`]) for the platform service
    ///    to become discoverable (`NotFound` if it never does).
    /// 3. Bind a fresh context token in the demultiplexer and register
    ///    interrupt interest for the eject class with the service; a
    ///    rejected registration unbinds the token again.
    ///
    /// Only a fully provisioned controller is returned, so every controller
    /// a host can hold is Registered until it tears it down.
    pub fn provision(
        bus: &BusDevice,
        base: Arc<dyn EjectControlOps>,
        locator: &ServiceLocator,
        demux: &Arc<EjectDemux>,
    ) -> AxResult<Arc<Self>> {
        if bus.kind() != BusDeviceKind::CardBridge {
            return ax_err!(InvalidInput, "bus device is not a card bridge");
        }

        let socket = bus
            .socket_number()
            .ok_or_else(|| axerrno::ax_err_type!(InvalidInput, "socket number property missing"))?;
        if socket == 0 {
            return ax_err!(InvalidInput, "socket number zero is unassigned");
        }

        let service = locator
            .wait_for(PROVISION_WAIT_SPINS)
            .ok_or_else(|| axerrno::ax_err_type!(NotFound, "platform service not available"))?;

        let token = demux.allocate_token();
        let controller = Arc::new(Self {
            socket,
            token,
            channel: CommandChannel::new(Arc::clone(&service)),
            service,
            base,
            demux: Arc::clone(demux),
            registration: Registration::new(),
            stats: EjectStats::new(),
        });

        // Bind before registering: the service may deliver as soon as the
        // registration call returns.
        demux.bind(token, &controller);
        if let Err(err) = controller
            .service
            .register_interest(demux.class(), token)
        {
            demux.unbind(token);
            warn!("socket {}: interest registration rejected: {:?}", socket, err);
            return Err(err);
        }
        controller.registration.mark_registered();

        debug!("socket {}: provisioned, token {:?}", socket, token);
        Ok(controller)
    }

    /// Gets the platform-assigned socket number.
    #[inline]
    pub fn socket_number(&self) -> u32 {
        self.socket
    }

    /// Gets the current registration state.
    #[inline]
    pub fn registration_state(&self) -> RegistrationState {
        self.registration.state()
    }

    /// Gets the operation counters.
    #[inline]
    pub fn stats(&self) -> &EjectStats {
        &self.stats
    }

    /// Tears the socket down: deregisters interrupt interest, unbinds the
    /// dispatch context and cuts the command channel.
    ///
    /// Idempotent; only the call that wins the Registered → Unregistered
    /// transition performs the side effects, any later call is a no-op.
    pub fn teardown(&self) {
        if !self.registration.mark_unregistered() {
            return;
        }

        debug!("socket {}: tearing down", self.socket);
        self.service.deregister(self.token, self.demux.class());
        self.demux.unbind(self.token);
        self.channel.disconnect();
    }

    /// Interrupt-path producer of the eject command, invoked by dispatch
    /// when a button press is classified for this socket.
    ///
    /// Shares the command path with [`eject_card`]; the dispatch caller
    /// ignores the result (fire-and-forget), a failure only shows up in the
    /// log and the counters.
    ///
    /// [`eject_card`]: SocketEjectController::eject_card
    pub fn request_card_ejection(&self) -> AxResult {
        self.stats.record_button();
        self.eject_card()
    }

    /// Program-initiated eject entry point.
    ///
    /// Transmits the eject command carrying this socket's number and, only
    /// on successful transmission, delegates completion bookkeeping to the
    /// base collaborator. A transmission failure propagates immediately and
    /// the base collaborator is not invoked.
    pub fn eject_card(&self) -> AxResult {
        if !self.registration.is_registered() {
            return ax_err!(BadState, "socket not registered");
        }

        debug!("socket {}: sending eject command", self.socket);
        let payload = [self.socket as u8];
        if let Err(err) = self.channel.issue(EJECT_CARD_OPCODE, &payload) {
            self.stats.record_command_error();
            return Err(err);
        }
        self.stats.record_command();

        self.base.eject_completed()
    }
}

impl core::fmt::Debug for SocketEjectController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SocketEjectController")
            .field("socket", &self.socket)
            .field("token", &self.token)
            .field("registration", &self.registration)
            .finish()
    }
}
