//! Connection ports used by the session manager.
//!
//! The HTTP layer adapts its WebSocket halves to these so the session
//! logic stays independent of the web framework.

use examiner_types::error::TransportError;

/// One frame read from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A text or binary payload.
    Data(Vec<u8>),
    /// The client asked to close the connection.
    Close,
}

/// Write half of a client connection.
///
/// The session serializes all calls; implementations need no locking.
pub trait FrameSink: Send + 'static {
    fn send_text(
        &mut self,
        text: String,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection. Errors are irrelevant at this point and ignored.
    fn close(&mut self) -> impl std::future::Future<Output = ()> + Send;
}
