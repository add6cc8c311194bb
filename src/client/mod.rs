//! Client module for tcpclient.
//!
//! - `session`: one TCP connection with a bounded send/receive cycle
//! - `console`: interactive line-by-line mode on top of a session

pub mod console;
pub mod session;

pub use console::run_console;
pub use session::{Session, Target};
