//! System probe implementations.
//!
//! - [`MockProbe`] - In-memory probe for tests and demos
//! - [`HostProbe`] - Native probe for the local machine (`host-probe` feature)

pub mod mock;

#[cfg(feature = "host-probe")]
pub mod host;

pub use mock::MockProbe;

#[cfg(feature = "host-probe")]
pub use host::HostProbe;
