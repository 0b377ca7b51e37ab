//! Command transmission to the platform service.
//!
//! A [`CommandChannel`] packages an opcode and a small send buffer into a
//! [`MiscCommand`] parameter block and hands it to the platform service.
//! The eject protocol is fire-and-forget: the block carries no response
//! fields because no response payload is ever read back.

use alloc::sync::Arc;

use arrayvec::ArrayVec;
use axerrno::{ax_err, AxResult};
use spin::RwLock;

use crate::platform::PlatformService;

/// Maximum send-buffer length of a command parameter block.
pub const MAX_SEND_LEN: usize = 8;

/// Opcode telling the platform service to physically eject a card.
pub const EJECT_CARD_OPCODE: u8 = 0x4C;

/// Parameter block for a single platform command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiscCommand {
    /// Command opcode.
    pub opcode: u8,
    /// Outbound payload. Fixed capacity; the command path never allocates.
    pub send: ArrayVec<u8, MAX_SEND_LEN>,
}

impl MiscCommand {
    /// Builds a parameter block from an opcode and send payload.
    ///
    /// Fails with `InvalidInput` if the payload exceeds [`MAX_SEND_LEN`].
    pub fn new(opcode: u8, send: &[u8]) -> AxResult<Self> {
        let mut buf = ArrayVec::new();
        if buf.try_extend_from_slice(send).is_err() {
            return ax_err!(InvalidInput, "command send buffer too long");
        }

        Ok(Self { opcode, send: buf })
    }
}

/// Issues platform commands on behalf of one socket controller.
///
/// The channel holds its own handle to the service so that teardown can cut
/// the socket off from the command interface: after [`disconnect`] every
/// issue fails with `NotFound` regardless of what the caller still holds.
///
/// [`disconnect`]: CommandChannel::disconnect
pub struct CommandChannel {
    service: RwLock<Option<Arc<dyn PlatformService>>>,
}

impl CommandChannel {
    /// Creates a channel bound to a discovered service.
    pub fn new(service: Arc<dyn PlatformService>) -> Self {
        Self {
            service: RwLock::new(Some(service)),
        }
    }

    /// Drops the service handle. Subsequent issues fail with `NotFound`.
    pub fn disconnect(&self) {
        *self.service.write() = None;
    }

    /// Transmits one command.
    ///
    /// Fails with `NotFound` if the service handle is absent and propagates
    /// the service's rejection otherwise. The handle is cloned out of the
    /// slot before the call, so no lock is held across the service.
    pub fn issue(&self, opcode: u8, send: &[u8]) -> AxResult {
        let service = self
            .service
            .read()
            .clone()
            .ok_or_else(|| axerrno::ax_err_type!(NotFound, "platform service not available"))?;

        let cmd = MiscCommand::new(opcode, send)?;
        trace!("issuing command {:#04x}, {} byte(s)", opcode, send.len());
        service.send_command(&cmd)
    }
}

impl core::fmt::Debug for CommandChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandChannel")
            .field("connected", &self.service.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ContextToken;
    use crate::platform::InterruptClass;
    use alloc::vec::Vec;
    use spin::Mutex;

    #[derive(Default)]
    struct RecordingService {
        sent: Mutex<Vec<MiscCommand>>,
    }

    impl PlatformService for RecordingService {
        fn register_interest(&self, _class: InterruptClass, _token: ContextToken) -> AxResult {
            Ok(())
        }

        fn deregister(&self, _token: ContextToken, _class: InterruptClass) {}

        fn send_command(&self, cmd: &MiscCommand) -> AxResult {
            self.sent.lock().push(cmd.clone());
            Ok(())
        }
    }

    #[test]
    fn test_misc_command_payload() {
        let cmd = MiscCommand::new(EJECT_CARD_OPCODE, &[3]).unwrap();
        assert_eq!(cmd.opcode, EJECT_CARD_OPCODE);
        assert_eq!(cmd.send.as_slice(), &[3]);
    }

    #[test]
    fn test_misc_command_oversized_payload() {
        let payload = [0u8; MAX_SEND_LEN + 1];
        assert!(MiscCommand::new(EJECT_CARD_OPCODE, &payload).is_err());
    }

    #[test]
    fn test_channel_issue() {
        let service = Arc::new(RecordingService::default());
        let channel = CommandChannel::new(service.clone());

        channel.issue(EJECT_CARD_OPCODE, &[2]).unwrap();

        let sent = service.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].opcode, EJECT_CARD_OPCODE);
        assert_eq!(sent[0].send.as_slice(), &[2]);
    }

    #[test]
    fn test_channel_disconnected() {
        let service = Arc::new(RecordingService::default());
        let channel = CommandChannel::new(service.clone());

        channel.disconnect();
        assert!(channel.issue(EJECT_CARD_OPCODE, &[2]).is_err());
        assert!(service.sent.lock().is_empty());
    }
}
