// Physical link abstraction
//
// The session only needs four things from the wire: write a frame, read a
// line, read a single byte, and let go of the port. `Transport` opens links,
// `Link` is one open port.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serialport::{SerialPort, SerialPortType};
use tracing::debug;

use super::session::SessionError;
use crate::config::SerialSettings;

/// Opens links for a session
pub trait Transport: Send {
    fn open(&self, settings: &SerialSettings) -> Result<Box<dyn Link>, SessionError>;
}

/// One open physical connection
pub trait Link: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read up to and including `\n`. Returns what arrived so far (possibly
    /// nothing) once the read timeout elapses.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Read one byte; `None` when the line stayed silent for the read timeout
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Release the underlying resource
    fn close(self: Box<Self>);
}

/// Opens real serial ports through the `serialport` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    fn open(&self, settings: &SerialSettings) -> Result<Box<dyn Link>, SessionError> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .data_bits(settings.data_bits.into())
            .parity(settings.parity.into())
            .stop_bits(settings.stop_bits.into())
            .timeout(settings.timeout)
            .open()
            .map_err(|e| SessionError::Connection {
                port: settings.port.clone(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(SerialLink {
            port,
            timeout: settings.timeout,
        }))
    }
}

/// Serial port backed link
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl Link for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        read_line_from(&mut self.port, self.timeout)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        read_byte_from(&mut self.port)
    }

    fn close(self: Box<Self>) {
        debug!("Releasing serial port {:?}", self.port.name());
        drop(self);
    }
}

/// Read one byte; a timed out or empty read is `None`
fn read_byte_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match reader.read(&mut buf) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(buf[0])),
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read up to and including `\n`, giving up once `timeout` has elapsed
fn read_line_from<R: Read + ?Sized>(reader: &mut R, timeout: Duration) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();

    while Instant::now() < deadline {
        match read_byte_from(reader)? {
            Some(byte) => {
                line.push(byte);
                if byte == b'\n' {
                    break;
                }
            }
            None => break,
        }
    }

    Ok(line)
}

/// A serial port seen on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortInfo {
    /// Micronix controllers enumerate through FTDI USB bridges
    pub fn is_ftdi(&self) -> bool {
        self.manufacturer
            .as_deref()
            .is_some_and(|m| m.contains("FTDI"))
    }
}

/// List serial ports, optionally keeping only FTDI adapters
pub fn list_ports(ftdi_only: bool) -> Result<Vec<PortInfo>, serialport::Error> {
    let ports = serialport::available_ports()?
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                name: p.port_name,
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => PortInfo {
                name: p.port_name,
                manufacturer: None,
                product: None,
            },
        })
        .filter(|p| !ftdi_only || p.is_ftdi())
        .collect();
    Ok(ports)
}

/// Scripted in-memory transport for exercising the protocol without hardware
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard};

    #[derive(Debug, Default)]
    pub struct MockState {
        /// Frames written, one entry per `write_all`
        pub written: Vec<Vec<u8>>,
        /// Replies served in order, one per frame written
        pub replies: VecDeque<Vec<u8>>,
        /// Bytes of the current reply not yet read
        pub pending: VecDeque<u8>,
        pub opens: usize,
        pub closes: usize,
        pub fail_open: bool,
        pub fail_io: bool,
    }

    /// Handle shared between the test and every link the transport opens
    #[derive(Debug, Default, Clone)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap()
        }

        pub fn reply(&self, bytes: &str) -> &Self {
            self.state().replies.push_back(bytes.as_bytes().to_vec());
            self
        }

        pub fn written(&self) -> Vec<String> {
            self.state()
                .written
                .iter()
                .map(|w| String::from_utf8_lossy(w).into_owned())
                .collect()
        }
    }

    impl Transport for MockTransport {
        fn open(&self, settings: &SerialSettings) -> Result<Box<dyn Link>, SessionError> {
            let mut state = self.state();
            if state.fail_open {
                return Err(SessionError::Connection {
                    port: settings.port.clone(),
                    reason: "No such file or directory".to_string(),
                });
            }
            state.opens += 1;
            Ok(Box::new(MockLink {
                state: self.state.clone(),
            }))
        }
    }

    struct MockLink {
        state: Arc<Mutex<MockState>>,
    }

    impl MockLink {
        fn state(&self) -> io::Result<MutexGuard<'_, MockState>> {
            let state = self.state.lock().unwrap();
            if state.fail_io {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
            }
            Ok(state)
        }
    }

    impl Link for MockLink {
        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            let mut state = self.state()?;
            state.written.push(bytes.to_vec());
            if let Some(reply) = state.replies.pop_front() {
                state.pending = reply.into();
            }
            Ok(())
        }

        fn read_line(&mut self) -> io::Result<Vec<u8>> {
            let mut state = self.state()?;
            let mut line = Vec::new();
            while let Some(byte) = state.pending.pop_front() {
                line.push(byte);
                if byte == b'\n' {
                    break;
                }
            }
            Ok(line)
        }

        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            Ok(self.state()?.pending.pop_front())
        }

        fn close(self: Box<Self>) {
            self.state.lock().unwrap().closes += 1;
        }
    }
}
