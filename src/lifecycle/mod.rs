//! Daemon process lifecycle

mod shutdown;

pub use shutdown::ShutdownSignal;
