//! WebSocket close codes
//!
//! The RFC 6455 status codes the relay sends when it closes a connection.

/// WebSocket close status codes
///
/// Sent in the close frame to tell the peer why the connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Server is going away
    GoingAway = 1001,
    /// Protocol violation or failed read
    ProtocolError = 1002,
    /// Message exceeded the size limit
    MessageTooBig = 1009,
}

impl CloseCode {
    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
