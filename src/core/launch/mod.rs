pub mod command;
pub mod handshake;
pub mod task;

pub use command::LaunchSpec;
pub use handshake::{HandshakeListener, ReadyHandle};
pub use task::{launch, LaunchStatus, LaunchedClient};
