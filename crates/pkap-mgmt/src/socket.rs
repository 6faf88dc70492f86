//! BlueZ management control socket.
//!
//! A raw `AF_BLUETOOTH` HCI socket bound to the control channel with no
//! specific device. Commands name their target controller in the frame
//! header instead.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::frame::INDEX_NONE;

/// Linux `BTPROTO_HCI`; not exported by `libc`.
const BTPROTO_HCI: i32 = 1;
const HCI_CHANNEL_CONTROL: u16 = 3;

/// `struct sockaddr_hci`; socket2 has no Bluetooth address support.
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

fn bind_hci(socket: &Socket, dev_id: u16, channel: u16) -> io::Result<()> {
    let addr = SockaddrHci {
        hci_family: libc::AF_BLUETOOTH as u16,
        hci_dev: dev_id,
        hci_channel: channel,
    };
    // SAFETY: valid fd and a correctly sized sockaddr_hci
    let ret = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            &addr as *const SockaddrHci as *const libc::sockaddr,
            std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Open management socket. Closed on drop.
#[derive(Debug)]
pub struct MgmtSocket {
    socket: Socket,
}

impl MgmtSocket {
    /// Open and bind the control channel.
    ///
    /// Needs `CAP_NET_ADMIN` on most systems.
    pub fn open() -> io::Result<Self> {
        let socket = Socket::new(
            Domain::from(libc::AF_BLUETOOTH),
            Type::RAW,
            Some(Protocol::from(BTPROTO_HCI)),
        )?;
        bind_hci(&socket, INDEX_NONE, HCI_CHANNEL_CONTROL)?;
        debug!("Opened management socket (fd {})", socket.as_raw_fd());
        Ok(Self { socket })
    }

    /// Bound blocking reads; `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    /// Handle that can shut this socket down from another thread.
    pub fn shutdown_handle(&self) -> io::Result<MgmtShutdown> {
        Ok(MgmtShutdown {
            socket: self.socket.try_clone()?,
        })
    }
}

/// Shuts down a [`MgmtSocket`], waking a read blocked on it.
#[derive(Debug)]
pub struct MgmtShutdown {
    socket: Socket,
}

impl MgmtShutdown {
    pub fn shutdown(&self) -> io::Result<()> {
        debug!("Shutting down management socket (fd {})", self.socket.as_raw_fd());
        self.socket.shutdown(Shutdown::Both)
    }
}

impl Read for MgmtSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }
}

impl Write for MgmtSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush()
    }
}
