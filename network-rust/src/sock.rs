use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

/// Opens a TCP stream to `address` with connect, read and write all bounded
/// by `timeout`. Every resolved address is tried in turn.
pub fn connect(address: &str, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_error = io::Error::new(io::ErrorKind::NotFound, format!("{} did not resolve", address));
    for addr in address.to_socket_addrs()? {
        let sock = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        if let Err(e) = sock.connect_timeout(&addr.into(), timeout) {
            last_error = e;
            continue;
        }
        sock.set_read_timeout(Some(timeout))?;
        sock.set_write_timeout(Some(timeout))?;
        sock.set_nodelay(true)?;
        return Ok(sock.into());
    }
    Err(last_error)
}
