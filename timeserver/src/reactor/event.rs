/// A readiness event reported by the poller.
///
/// Hang-ups and socket errors are reported as readable: the next read then
/// observes the end of stream or the error and the connection is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Event {
    /// Token the descriptor was registered under.
    pub(crate) token: usize,

    /// The descriptor is readable (or hung up / in error).
    pub(crate) readable: bool,

    /// The descriptor is writable.
    pub(crate) writable: bool,
}
