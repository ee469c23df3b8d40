pub mod client;
pub mod runtime;
pub mod server;
pub mod ticker;

pub const SOCKET_PATH: &str = "/tmp/wheel.sock";
