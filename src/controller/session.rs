// Command/response session with one Micronix controller
//
// Two read strategies share the link:
// - commands are acknowledged with a line, read up to `\n` or the timeout
// - query replies are not reliably line terminated, so they are read byte by
//   byte until the link goes quiet
// Mixing them up either truncates query replies or stalls on commands.

use std::fmt::{Display, Write as _};
use std::io;

use tracing::{debug, error, info, warn};

use super::commands::{Command, ToCommand, UnknownCommand};
use super::errors::{Classification, ErrorCode, classify};
use super::link::{Link, SerialTransport, Transport};
use crate::config::{FRAME_TERMINATOR, QUERY_SUFFIX, REPLY_MARKER, SerialSettings};
use crate::messages::Reading;

/// Errors surfaced by a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection error on {port}: {reason}")]
    Connection { port: String, reason: String },

    #[error("Serial connection to {port} is already open")]
    AlreadyOpen { port: String },

    #[error("Serial connection is not open")]
    NotConnected,

    #[error(transparent)]
    InvalidCommand(#[from] UnknownCommand),

    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Device error {}: {}", .0.code(), .0.message())]
    Device(ErrorCode),
}

impl SessionError {
    /// Whether the link itself failed, as opposed to the request or the device
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(_) | SessionError::NotConnected | SessionError::Connection { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Build a command frame: `<axis><MNE><p1,p2,...>\r`
pub fn command_frame(axis: &str, command: Command, params: &[&dyn Display]) -> String {
    let mut frame = format!("{}{}", axis, command.mnemonic());
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            frame.push(',');
        }
        // writing into a String cannot fail
        let _ = write!(frame, "{}", param);
    }
    frame.push(FRAME_TERMINATOR);
    frame
}

/// Build a read-only query frame: `<axis><MNE>?\r`
pub fn query_frame(axis: &str, command: Command) -> String {
    format!(
        "{}{}{}{}",
        axis,
        command.mnemonic(),
        QUERY_SUFFIX,
        FRAME_TERMINATOR
    )
}

/// Strip surrounding whitespace and the reply marker from a raw query reply
fn clean_query_reply(raw: &str) -> &str {
    raw.trim().trim_matches(REPLY_MARKER).trim()
}

/// Session owning at most one open link to a controller.
///
/// The link is released by [`close`](Self::close) or, failing that, when the
/// session is dropped.
///
/// ```no_run
/// use micronix_serial::{Command, SerialSettings, Session};
///
/// let mut session = Session::new(SerialSettings::new("/dev/ttyUSB0"));
/// session.open()?;
/// session.execute_command("1", &Command::Mot, &[&1])?;
/// session.execute_command("1", "MVA", &[&1000])?;
/// let position = session.poll_value("1", &Command::Pos)?;
/// println!("{position:?}");
/// session.close();
/// # Ok::<(), micronix_serial::SessionError>(())
/// ```
pub struct Session {
    settings: SerialSettings,
    transport: Box<dyn Transport>,
    link: Option<Box<dyn Link>>,
}

impl Session {
    /// Create a session on a real serial port. The port is not opened yet.
    pub fn new(settings: SerialSettings) -> Self {
        Self::with_transport(settings, SerialTransport)
    }

    /// Create a session that opens its link through `transport`
    pub fn with_transport(settings: SerialSettings, transport: impl Transport + 'static) -> Self {
        Self {
            settings,
            transport: Box::new(transport),
            link: None,
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Acquire the link
    pub fn open(&mut self) -> Result<()> {
        if self.link.is_some() {
            return Err(SessionError::AlreadyOpen {
                port: self.settings.port.clone(),
            });
        }

        match self.transport.open(&self.settings) {
            Ok(link) => {
                info!("Connected to {}", self.settings.port);
                self.link = Some(link);
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect: {}", e);
                Err(e)
            }
        }
    }

    /// Release the link. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(link) = self.link.take() {
            link.close();
            info!("Disconnected from {}", self.settings.port);
        }
    }

    fn link(&mut self) -> Result<&mut Box<dyn Link>> {
        self.link.as_mut().ok_or(SessionError::NotConnected)
    }

    /// Validate, frame, and write a command without reading the reply
    pub fn send_command<C>(&mut self, axis: &str, command: &C, params: &[&dyn Display]) -> Result<()>
    where
        C: ToCommand + ?Sized,
    {
        let link = self.link()?;
        let command = command.to_command()?;

        let frame = command_frame(axis, command, params);
        info!(
            "Sending command: {} - {}",
            frame.trim_end(),
            command.description()
        );
        link.write_all(frame.as_bytes())?;
        Ok(())
    }

    /// Read one line-terminated reply, trimmed
    pub fn read_response(&mut self) -> Result<String> {
        let raw = self.link()?.read_line()?;
        let response = String::from_utf8_lossy(&raw).trim().to_string();
        info!("Received response: {}", response);
        Ok(response)
    }

    /// Send a command and return its reply without looking for errors
    pub fn send_and_receive<C>(
        &mut self,
        axis: &str,
        command: &C,
        params: &[&dyn Display],
    ) -> Result<String>
    where
        C: ToCommand + ?Sized,
    {
        self.send_command(axis, command, params)?;
        self.read_response()
    }

    /// Fail with [`SessionError::Device`] if `response` is an error report
    pub fn check_for_errors(&self, response: &str) -> Result<()> {
        match classify(response) {
            Classification::Error(code) => {
                error!("{}", code.message());
                Err(SessionError::Device(code))
            }
            Classification::Data(_) => {
                debug!("No error code in response");
                Ok(())
            }
        }
    }

    /// Send a command, read its acknowledgement, and surface device errors.
    ///
    /// Returns the raw (trimmed) reply on success. Device and transport errors
    /// leave the session open.
    pub fn execute_command<C>(
        &mut self,
        axis: &str,
        command: &C,
        params: &[&dyn Display],
    ) -> Result<String>
    where
        C: ToCommand + ?Sized,
    {
        let response = self.send_and_receive(axis, command, params)?;
        self.check_for_errors(&response)?;
        Ok(response)
    }

    /// Issue a read-only query and collect whatever the controller sends back.
    ///
    /// An empty reply is [`Reading::NoData`], not an error.
    pub fn poll_value<C>(&mut self, axis: &str, command: &C) -> Result<Reading>
    where
        C: ToCommand + ?Sized,
    {
        let link = self.link()?;
        let command = command.to_command()?;

        let frame = query_frame(axis, command);
        debug!("Sending query: {}", frame.trim_end());
        link.write_all(frame.as_bytes())?;

        let mut raw = Vec::new();
        while let Some(byte) = link.read_byte()? {
            raw.push(byte);
        }

        let text = String::from_utf8_lossy(&raw);
        let value = clean_query_reply(&text);
        if value.is_empty() {
            warn!("No response or invalid reply to {}", frame.trim_end());
            Ok(Reading::NoData)
        } else {
            debug!("Received reply: {}", value);
            Ok(Reading::Value(value.to_string()))
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
