//! Interrupt event records and their classification.
//!
//! Each delivery from the platform service carries a small buffer:
//!
//! ```text
//! byte 0: event-class flags
//!         bit 0 = 1: eject button pressed
//!         bit 1 = 1: eject operation timed out
//!         other bits: reserved, masked off before classification
//! byte 1: affected socket number
//! ```
//!
//! A record shorter than two bytes is malformed and carries no usable
//! information; parsing rejects it up front so the dispatch pipeline can
//! discard it without side effects.

/// Flags-byte bit: the user pressed the eject button.
pub const EVENT_BUTTON_REQUEST: u8 = 0x01;
/// Flags-byte bit: an initiated eject operation timed out.
pub const EVENT_TIMEOUT: u8 = 0x02;
/// Mask selecting the recognized event-class bits.
pub const EVENT_KIND_MASK: u8 = EVENT_BUTTON_REQUEST | EVENT_TIMEOUT;

/// Classification of one interrupt event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Eject button pressed for the affected socket.
    ButtonRequest,
    /// An eject operation timed out. Informational only: no corrective
    /// action is taken on this classification.
    Timeout,
    /// Command-completion or otherwise unrecognized notification. Carries
    /// the raw flags byte for diagnostics.
    Completion(u8),
}

/// A parsed interrupt event record: classified flags plus the affected
/// socket byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EjectEvent {
    /// What the platform service is reporting.
    pub kind: EventKind,
    /// The socket this event is addressed to.
    pub socket: u8,
}

impl EjectEvent {
    /// Parses a raw delivery buffer.
    ///
    /// Returns `None` for malformed records (declared length below the
    /// two-byte minimum).
    pub fn parse(buffer: &[u8]) -> Option<Self> {
        if buffer.len() < 2 {
            return None;
        }

        let kind = match buffer[0] & EVENT_KIND_MASK {
            EVENT_BUTTON_REQUEST => EventKind::ButtonRequest,
            EVENT_TIMEOUT => EventKind::Timeout,
            _ => EventKind::Completion(buffer[0]),
        };

        Some(Self {
            kind,
            socket: buffer[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_button_request() {
        let event = EjectEvent::parse(&[EVENT_BUTTON_REQUEST, 3]).unwrap();
        assert_eq!(event.kind, EventKind::ButtonRequest);
        assert_eq!(event.socket, 3);
    }

    #[test]
    fn test_parse_timeout() {
        let event = EjectEvent::parse(&[EVENT_TIMEOUT, 1]).unwrap();
        assert_eq!(event.kind, EventKind::Timeout);
    }

    #[test]
    fn test_parse_short_record() {
        assert!(EjectEvent::parse(&[]).is_none());
        assert!(EjectEvent::parse(&[EVENT_BUTTON_REQUEST]).is_none());
    }

    #[test]
    fn test_reserved_bits_ignored() {
        // High bits outside the mask must not change the classification.
        let event = EjectEvent::parse(&[0x80 | EVENT_BUTTON_REQUEST, 2]).unwrap();
        assert_eq!(event.kind, EventKind::ButtonRequest);
    }

    #[test]
    fn test_both_bits_is_unrecognized() {
        // Button and timeout together is not a recognized classification.
        let flags = EVENT_BUTTON_REQUEST | EVENT_TIMEOUT;
        let event = EjectEvent::parse(&[flags, 2]).unwrap();
        assert_eq!(event.kind, EventKind::Completion(flags));
    }

    #[test]
    fn test_zero_flags_is_completion() {
        let event = EjectEvent::parse(&[0x00, 2]).unwrap();
        assert_eq!(event.kind, EventKind::Completion(0));
    }

    #[test]
    fn test_extra_payload_tolerated() {
        let event = EjectEvent::parse(&[EVENT_TIMEOUT, 4, 0xFF, 0xFF]).unwrap();
        assert_eq!(event.kind, EventKind::Timeout);
        assert_eq!(event.socket, 4);
    }
}
