// Micronix MMC controller protocol
//
// Provides:
// - The instruction set and the controller's error codes
// - A serial session that frames commands and classifies replies
// - A polling loop for watching one value over time

pub mod commands;
pub mod errors;
pub mod link;
pub mod poller;
pub mod session;

pub use commands::{Command, ToCommand, UnknownCommand};
pub use errors::{Classification, ErrorCode, classify};
pub use link::{Link, PortInfo, SerialTransport, Transport, list_ports};
pub use poller::{Poller, PollerError};
pub use session::{Session, SessionError, command_frame, query_frame};
