//! Raw ICMP echo for native ping functionality
//!
//! Requires CAP_NET_RAW (or root) on Linux. Every probe opens its own raw
//! socket; the kernel hands each raw ICMP socket a copy of every incoming ICMP
//! packet, so replies are matched on source address, identifier and sequence.

use pnet::packet::icmp::destination_unreachable::DestinationUnreachablePacket;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

/// ICMP header (8) plus a small payload
const ECHO_PACKET_LEN: usize = 16;

const ECHO_PAYLOAD: &[u8; 8] = b"netool\0\0";

/// Shortest read timeout handed to the socket; a zero `SO_RCVTIMEO` blocks forever
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// How an incoming ICMP packet relates to our echo request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoReply {
    /// Matching echo reply from the target
    Alive,
    /// A router reported the target unreachable
    Unreachable,
}

/// Build an ICMP echo request with a valid checksum
pub fn build_echo_request(identifier: u16, sequence: u16) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ECHO_PACKET_LEN];
    {
        let mut packet = MutableEchoRequestPacket::new(&mut buffer)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "echo buffer too small"))?;
        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_icmp_code(IcmpCode(0));
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence);
        packet.set_payload(ECHO_PAYLOAD);
    }

    let checksum = IcmpPacket::new(&buffer)
        .map(|icmp| pnet::packet::icmp::checksum(&icmp))
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "malformed echo request"))?;
    buffer[2..4].copy_from_slice(&checksum.to_be_bytes());

    Ok(buffer)
}

/// Classify a raw IPv4 datagram received on an ICMP socket.
///
/// Returns `None` for anything unrelated to our request.
pub fn classify_packet(
    datagram: &[u8],
    target: Ipv4Addr,
    identifier: u16,
    sequence: u16,
) -> Option<EchoReply> {
    let ip = Ipv4Packet::new(datagram)?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return None;
    }

    let header_len = usize::from(ip.get_header_length()) * 4;
    let icmp_bytes = datagram.get(header_len..)?;
    let icmp = IcmpPacket::new(icmp_bytes)?;

    match icmp.get_icmp_type() {
        IcmpTypes::EchoReply if ip.get_source() == target => {
            let reply = EchoReplyPacket::new(icmp_bytes)?;
            (reply.get_identifier() == identifier && reply.get_sequence_number() == sequence)
                .then_some(EchoReply::Alive)
        }
        IcmpTypes::DestinationUnreachable => {
            let unreachable = DestinationUnreachablePacket::new(icmp_bytes)?;
            let original = Ipv4Packet::new(unreachable.payload())?;
            (original.get_destination() == target).then_some(EchoReply::Unreachable)
        }
        _ => None,
    }
}

/// Read timeout for the next `recv` before `deadline`, or `None` once less
/// than [`MIN_READ_TIMEOUT`] is left.
pub fn next_read_timeout(deadline: Instant, now: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(now);
    (remaining >= MIN_READ_TIMEOUT).then_some(remaining)
}

/// Send one echo request and wait for the reply. Blocking.
pub fn echo(target: Ipv4Addr, identifier: u16, sequence: u16, timeout: Duration) -> io::Result<bool> {
    let mut socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
    let request = build_echo_request(identifier, sequence)?;
    let dest = SockAddr::from(SocketAddr::new(IpAddr::V4(target), 0));
    socket.send_to(&request, &dest)?;

    let deadline = Instant::now() + timeout;
    let mut buffer = [0u8; 1500];

    loop {
        let Some(remaining) = next_read_timeout(deadline, Instant::now()) else {
            return Ok(false);
        };
        socket.set_read_timeout(Some(remaining))?;

        let received = match socket.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return Ok(false)
            }
            Err(e) => return Err(e),
        };

        match classify_packet(&buffer[..received], target, identifier, sequence) {
            Some(EchoReply::Alive) => return Ok(true),
            Some(EchoReply::Unreachable) => return Ok(false),
            None => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::ipv4::MutableIpv4Packet;

    fn wrap_in_ipv4(source: Ipv4Addr, destination: Ipv4Addr, icmp: &[u8]) -> Vec<u8> {
        let mut buffer = vec![0u8; 20 + icmp.len()];
        let mut ip = MutableIpv4Packet::new(&mut buffer).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length((20 + icmp.len()) as u16);
        ip.set_ttl(64);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Icmp);
        ip.set_source(source);
        ip.set_destination(destination);
        ip.set_payload(icmp);
        buffer
    }

    fn echo_reply(identifier: u16, sequence: u16) -> Vec<u8> {
        let mut packet = build_echo_request(identifier, sequence).unwrap();
        packet[0] = 0; // echo reply type
        packet
    }

    #[test]
    fn test_echo_request_checksum_verifies() {
        let packet = build_echo_request(0x1234, 1).unwrap();
        assert_eq!(packet.len(), ECHO_PACKET_LEN);
        assert_eq!(packet[0], 8);

        let icmp = IcmpPacket::new(&packet).unwrap();
        assert_eq!(icmp.get_checksum(), pnet::packet::icmp::checksum(&icmp));
    }

    #[test]
    fn test_matching_reply_is_alive() {
        let target = Ipv4Addr::new(10, 0, 0, 5);
        let datagram = wrap_in_ipv4(target, Ipv4Addr::new(10, 0, 0, 1), &echo_reply(7, 1));
        assert_eq!(classify_packet(&datagram, target, 7, 1), Some(EchoReply::Alive));
    }

    #[test]
    fn test_foreign_replies_are_ignored() {
        let target = Ipv4Addr::new(10, 0, 0, 5);
        let other = Ipv4Addr::new(10, 0, 0, 6);

        let wrong_source = wrap_in_ipv4(other, Ipv4Addr::new(10, 0, 0, 1), &echo_reply(7, 1));
        assert_eq!(classify_packet(&wrong_source, target, 7, 1), None);

        let wrong_id = wrap_in_ipv4(target, Ipv4Addr::new(10, 0, 0, 1), &echo_reply(8, 1));
        assert_eq!(classify_packet(&wrong_id, target, 7, 1), None);

        let request = wrap_in_ipv4(target, Ipv4Addr::new(10, 0, 0, 1), &build_echo_request(7, 1).unwrap());
        assert_eq!(classify_packet(&request, target, 7, 1), None);
    }

    #[test]
    fn test_destination_unreachable_for_target() {
        let target = Ipv4Addr::new(10, 0, 0, 5);
        let local = Ipv4Addr::new(10, 0, 0, 1);
        let router = Ipv4Addr::new(10, 0, 0, 254);

        let original = wrap_in_ipv4(local, target, &build_echo_request(7, 1).unwrap());
        let mut icmp = vec![3u8, 1, 0, 0, 0, 0, 0, 0];
        icmp.extend_from_slice(&original[..28]);

        let datagram = wrap_in_ipv4(router, local, &icmp);
        assert_eq!(classify_packet(&datagram, target, 7, 1), Some(EchoReply::Unreachable));
        assert_eq!(classify_packet(&datagram, Ipv4Addr::new(10, 0, 0, 9), 7, 1), None);
    }

    #[test]
    fn test_read_timeout_near_deadline() {
        let now = Instant::now();

        assert_eq!(next_read_timeout(now + Duration::from_millis(250), now), Some(Duration::from_millis(250)));
        assert_eq!(next_read_timeout(now + MIN_READ_TIMEOUT, now), Some(MIN_READ_TIMEOUT));

        // sub-microsecond leftovers would truncate to a zero timeval
        assert_eq!(next_read_timeout(now + Duration::from_nanos(500), now), None);
        assert_eq!(next_read_timeout(now + Duration::from_micros(999), now), None);
        assert_eq!(next_read_timeout(now, now + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_garbage_is_ignored() {
        assert_eq!(classify_packet(&[0u8; 4], Ipv4Addr::LOCALHOST, 1, 1), None);
    }
}
