//! Outbound command delivery: one HTTP GET per command, classified into a `CommandOutcome`.

mod dispatcher;
mod transport;

pub use dispatcher::CommandOutcome;
pub use dispatcher::DispatchError;
pub use dispatcher::Dispatcher;
#[cfg(test)]
pub(crate) use transport::MockTransport;
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use transport::TransportError;
