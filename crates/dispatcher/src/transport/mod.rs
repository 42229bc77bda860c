//! Transport implementations
//!
//! Contains TcpTransport and ConsoleTransport.

mod console;
mod tcp;

pub use self::console::ConsoleTransport;
pub use self::tcp::TcpTransport;
