//! The DUT boundary
//!
//! Command domains, the registry of known commands, and the transport
//! that carries one request to a data master and classifies the answer.

pub mod protocol;
pub mod registry;
pub mod transport;

pub use protocol::{Domain, FailureKind, Outcome, Payload, Request};
pub use registry::{Arity, CommandRegistry, CommandSpec};
pub use transport::{DataMaster, Transport};
