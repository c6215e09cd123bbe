//! Process-wide single instance enforcement.
//!
//! The first process binds a loopback port. Later processes fail to bind,
//! connect instead, ask the owner to come forward and exit.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 47_391;

const SHOW_REQUEST: &str = "show";
const ACK_TOKEN: &str = "chatwrap-ack";
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("another instance is already running")]
    AlreadyRunning,
    #[error("instance port is held by another program")]
    PortInUse,
    #[error("instance lock failed: {0}")]
    Io(#[from] io::Error),
}

pub fn default_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT))
}

/// Outcome of startup arbitration between launches.
#[derive(Debug)]
pub enum Startup {
    /// This process owns the lock and runs the app.
    Primary(InstanceLock),
    /// Another instance was asked to come forward; this one should exit.
    Secondary,
}

/// Settles which process runs. Any failure other than a live sibling is an
/// error: running unlocked would let two processes share one profile.
pub fn claim(addr: SocketAddr) -> Result<Startup, InstanceError> {
    match InstanceLock::acquire(addr) {
        Ok(lock) => Ok(Startup::Primary(lock)),
        Err(InstanceError::AlreadyRunning) => Ok(Startup::Secondary),
        Err(err) => Err(err),
    }
}

/// Held for the process lifetime; the OS releases the port on exit.
#[derive(Debug)]
pub struct InstanceLock {
    listener: TcpListener,
}

impl InstanceLock {
    /// Takes the lock, or signals the running owner and reports
    /// `AlreadyRunning`.
    pub fn acquire(addr: SocketAddr) -> Result<Self, InstanceError> {
        match TcpListener::bind(addr) {
            Ok(listener) => {
                debug!("Instance lock bound on {}", addr);
                Ok(Self { listener })
            }
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                if signal_owner(addr)? {
                    Err(InstanceError::AlreadyRunning)
                } else {
                    Err(InstanceError::PortInUse)
                }
            }
            Err(err) => Err(InstanceError::Io(err)),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Answers later launches on a background thread, calling `on_show` for
    /// each one.
    pub fn serve<F>(&self, on_show: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: Fn() + Send + 'static,
    {
        let listener = self.listener.try_clone()?;
        Ok(thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if answer(stream) {
                            info!("Second launch detected, bringing window forward");
                            on_show();
                        }
                    }
                    Err(err) => warn!("Instance listener error: {}", err),
                }
            }
        }))
    }
}

fn answer(stream: TcpStream) -> bool {
    let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));
    let mut reader = BufReader::new(&stream);
    let mut line = String::new();
    if reader.read_line(&mut line).is_err() || line.trim() != SHOW_REQUEST {
        return false;
    }
    let mut writer = &stream;
    let _ = writeln!(writer, "{ACK_TOKEN}");
    true
}

/// Returns true when the port owner acknowledged as a sibling instance.
fn signal_owner(addr: SocketAddr) -> io::Result<bool> {
    let stream = TcpStream::connect_timeout(&addr, HANDSHAKE_TIMEOUT)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
    let mut writer = &stream;
    if let Err(err) = writeln!(writer, "{SHOW_REQUEST}") {
        debug!("Port owner closed the connection: {}", err);
        return Ok(false);
    }

    let mut reply = String::new();
    match BufReader::new(&stream).read_line(&mut reply) {
        Ok(_) => Ok(reply.trim() == ACK_TOKEN),
        Err(err) => {
            debug!("No acknowledgement from port owner: {}", err);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
    }

    #[test]
    fn second_acquire_signals_owner() {
        let lock = InstanceLock::acquire(ephemeral()).unwrap();
        let addr = lock.local_addr().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        lock.serve(move || {
            let _ = tx.send(());
        })
        .unwrap();

        assert!(matches!(
            InstanceLock::acquire(addr),
            Err(InstanceError::AlreadyRunning)
        ));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn claim_distinguishes_primary_and_secondary() {
        let Startup::Primary(lock) = claim(ephemeral()).unwrap() else {
            panic!("first claim should own the lock");
        };
        let addr = lock.local_addr().unwrap();
        lock.serve(|| {}).unwrap();

        assert!(matches!(claim(addr), Ok(Startup::Secondary)));
    }

    #[test]
    fn claim_fails_when_port_is_squatted() {
        let foreign = TcpListener::bind(ephemeral()).unwrap();
        let addr = foreign.local_addr().unwrap();
        let handle = thread::spawn(move || {
            if let Ok((stream, _)) = foreign.accept() {
                let mut request = String::new();
                let _ = BufReader::new(&stream).read_line(&mut request);
            }
        });

        assert!(matches!(claim(addr), Err(InstanceError::PortInUse)));
        handle.join().unwrap();
    }

    #[test]
    fn foreign_port_owner_is_not_an_instance() {
        let foreign = TcpListener::bind(ephemeral()).unwrap();
        let addr = foreign.local_addr().unwrap();
        let handle = thread::spawn(move || {
            if let Ok((stream, _)) = foreign.accept() {
                let mut request = String::new();
                let _ = BufReader::new(&stream).read_line(&mut request);
                let mut writer = &stream;
                let _ = writeln!(writer, "HTTP/1.1 400 Bad Request");
            }
        });

        assert!(matches!(
            InstanceLock::acquire(addr),
            Err(InstanceError::PortInUse)
        ));
        handle.join().unwrap();
    }
}
