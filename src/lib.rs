#![no_std]

//! # Socket Eject Mediation
//!
//! This crate mediates card-ejection requests for removable-card slots
//! ("sockets") between a generic eject-control abstraction and the platform
//! power-management service that owns the physical eject mechanism and its
//! button/timeout interrupts. It is designed for `no_std` environments and
//! uses the `alloc` crate for dynamic memory allocation.
//!
//! ## Architecture
//!
//! - [`ServiceLocator`] / [`PlatformService`]: discovery of and access to
//!   the process-wide power-management service
//! - [`CommandChannel`] / [`MiscCommand`]: fire-and-forget command
//!   transmission through the service
//! - [`EjectDemux`]: socket-scoped filtering of the shared interrupt class
//! - [`SocketEjectController`]: per-socket lifecycle (provision/teardown)
//!   and the eject command path
//! - [`BusDevice`]: opaque per-socket configuration from bus enumeration
//!
//! ## Dispatch pipeline
//!
//! All registered sockets share one interrupt class; the platform service
//! broadcasts every event of the class to every registered context. The
//! demultiplexer filters each delivery down to at most one socket action:
//!
//! ```text
//! ┌──────────────────┐  deliver(class, buffer, token)   ┌───────────────┐
//! │ platform service │ ───────────────────────────────▶ │  EjectDemux   │
//! └──────────────────┘       (one call per context)     └───────┬───────┘
//!                                                               │
//!              class match → token resolve → validate → socket match
//!                                                               │
//!                                      ┌────────────────────────┴──┐
//!                                      ▼                           ▼
//!                              button request:                 timeout /
//!                         SocketEjectController::          completion: observe
//!                           request_card_ejection               only
//! ```
//!
//! Every filter stage may short-circuit to a silent drop; drops are a
//! first-class [`DispatchOutcome`], not errors, because broadcast traffic
//! addressed to other sockets is expected noise.
//!
//! ## Example
//!
//! ```rust,ignore
//! use socket_eject::{
//!     BusDevice, BusDeviceKind, EjectDemux, ServiceLocator, SocketEjectController,
//!     EJECT_INTERRUPT_CLASS, SOCKET_NUMBER_PROPERTY,
//! };
//! use alloc::sync::Arc;
//!
//! // Platform layer comes up and installs the discovered service.
//! let locator = ServiceLocator::new();
//! locator.install(platform_service);
//!
//! // One demultiplexer per process for the eject interrupt class.
//! let demux = Arc::new(EjectDemux::new(EJECT_INTERRUPT_CLASS));
//!
//! // Provision one controller per socket found by bus enumeration.
//! let bus = BusDevice::new(BusDeviceKind::CardBridge)
//!     .with_property(SOCKET_NUMBER_PROPERTY, &1u32.to_le_bytes());
//! let socket = SocketEjectController::provision(&bus, base_controller, &locator, &demux)?;
//!
//! // The platform service delivers interrupts through the demultiplexer;
//! // a matching button press ends up issuing the eject command.
//!
//! // Host-initiated eject:
//! socket.eject_card()?;
//!
//! // Shutdown:
//! socket.teardown();
//! ```

extern crate alloc;
#[macro_use]
extern crate log;

mod command;
mod config;
mod controller;
mod dispatch;
mod event;
mod lifecycle;
mod platform;

pub use command::{CommandChannel, MiscCommand, EJECT_CARD_OPCODE, MAX_SEND_LEN};
pub use config::{BusDevice, BusDeviceKind, SOCKET_NUMBER_PROPERTY};
pub use controller::{EjectControlOps, EjectStats, SocketEjectController};
pub use dispatch::{ContextToken, DispatchOutcome, DropReason, EjectDemux};
pub use event::{
    EjectEvent, EventKind, EVENT_BUTTON_REQUEST, EVENT_KIND_MASK, EVENT_TIMEOUT,
};
pub use lifecycle::{Registration, RegistrationState};
pub use platform::{
    InterruptClass, PlatformService, ServiceLocator, EJECT_INTERRUPT_CLASS, PROVISION_WAIT_SPINS,
};
