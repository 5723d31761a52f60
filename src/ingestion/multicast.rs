//! multicast.rs
//! UDP multicast command source: one datagram = one command.
//! Undecodable datagrams are reported as `Malformed`, socket errors end the source.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket},
};

use log::{debug, info, trace};
use socket2::{Domain, Protocol, Socket, Type};

use crate::ingestion::{
    command::decode_payload,
    source::{CommandSource, SourceError, SourceEvent},
};

pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(230, 0, 0, 0);
pub const DEFAULT_PORT: u16 = 4446;
pub const DEFAULT_MAX_DATAGRAM: usize = 1024;

pub struct MulticastSource {
    socket: UdpSocket,
    buf: Vec<u8>,
    label: String,
}

impl MulticastSource {
    /// Bind `0.0.0.0:port` and join `group` on `interface`.
    pub fn join(
        group: Ipv4Addr,
        port: u16,
        interface: Ipv4Addr,
        max_datagram: usize,
    ) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        socket.bind(&bind_addr.into())?;
        socket.join_multicast_v4(&group, &interface)?;

        info!("[Multicast] Joined {}:{} on interface {}", group, port, interface);

        let mut source = Self::from_socket(socket.into(), max_datagram);
        source.label = format!("multicast {}:{}", group, port);
        Ok(source)
    }

    /// Wrap an already bound socket (unicast works too).
    pub fn from_socket(socket: UdpSocket, max_datagram: usize) -> Self {
        let label = socket
            .local_addr()
            .map(|a| format!("udp {}", a))
            .unwrap_or_else(|_| "udp".to_string());
        Self {
            socket,
            buf: vec![0u8; max_datagram.max(1)],
            label,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl CommandSource for MulticastSource {
    fn name(&self) -> &str {
        &self.label
    }

    fn next_event(&mut self) -> Result<SourceEvent, SourceError> {
        let (len, from) = self.socket.recv_from(&mut self.buf)?;
        trace!("[Multicast] {} bytes from {}", len, from);

        if len == self.buf.len() {
            debug!("[Multicast] Datagram from {} filled the {} byte buffer", from, len);
        }

        Ok(match decode_payload(&self.buf[..len]) {
            Ok(command) => SourceEvent::Command(command),
            Err(e) => SourceEvent::Malformed(format!("datagram from {}: {}", from, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::command::Command;

    fn loopback_pair() -> (MulticastSource, UdpSocket) {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
        tx.connect(rx.local_addr().unwrap()).unwrap();
        (MulticastSource::from_socket(rx, DEFAULT_MAX_DATAGRAM), tx)
    }

    #[test]
    fn datagram_becomes_one_command() {
        let (mut source, tx) = loopback_pair();
        tx.send(br#"{"speed": 100, "angle": 180}"#).unwrap();
        assert_eq!(
            source.next_event().unwrap(),
            SourceEvent::Command(Command::new(100, 180))
        );
    }

    #[test]
    fn garbage_datagram_is_malformed_not_fatal() {
        let (mut source, tx) = loopback_pair();
        tx.send(b"not json").unwrap();
        tx.send(br#"{"speed": 1, "angle": 2}"#).unwrap();

        assert!(matches!(source.next_event().unwrap(), SourceEvent::Malformed(_)));
        assert_eq!(
            source.next_event().unwrap(),
            SourceEvent::Command(Command::new(1, 2))
        );
    }
}
