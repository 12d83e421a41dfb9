use std::net::Ipv4Addr;

use anyhow::{anyhow, Result};
use etherparse::{Ipv4HeaderSlice, UdpHeaderSlice};

use super::checksum;
use super::protocol::Protocol;
use super::rip_message::{RipMsg, RIP_PORT};

/// RIPv2 routers listen on 224.0.0.9 (RFC 2453 4.5)
pub const RIP_MULTICAST: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 9);

const IP_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const RIP_TTL: u8 = 1;
/// Internetwork control precedence
const RIP_TYPE_OF_SERVICE: u8 = 0xc0;

fn get_high_order_four_bits(byte: &u8) -> u8 {
  byte >> 4
}

fn convert_to_u16(higher_order: &u8, lower_order: &u8) -> u16 {
  (u16::from(*higher_order) << 8) + u16::from(*lower_order)
}

fn address_at(packet: &[u8], offset: usize) -> Ipv4Addr {
  Ipv4Addr::new(
    packet[offset],
    packet[offset + 1],
    packet[offset + 2],
    packet[offset + 3],
  )
}

// Header accessors below assume at least 20 bytes, which checksum::validate
// guarantees for anything that came off the wire.

pub fn version(packet: &[u8]) -> u8 {
  get_high_order_four_bits(&packet[0])
}

/// Declared length of the whole packet, header included
pub fn total_length(packet: &[u8]) -> u16 {
  convert_to_u16(&packet[2], &packet[3])
}

pub fn source_address(packet: &[u8]) -> Ipv4Addr {
  address_at(packet, 12)
}

pub fn destination_address(packet: &[u8]) -> Ipv4Addr {
  address_at(packet, 16)
}

/// A RIP datagram pulled out of an IPv4/UDP packet addressed to the router
#[derive(Debug, PartialEq, Eq)]
pub struct InboundRip<'a> {
  pub source:      Ipv4Addr,
  pub destination: Ipv4Addr,
  /// UDP payload, bounded by the UDP length field
  pub payload:     &'a [u8],
}

/// Unwraps the IP and UDP headers around a RIP message.
///
/// The declared IP total length must fit in the buffer; this is where
/// truncated packets are caught, so the codec only ever sees a correctly
/// bounded payload.
pub fn rip_payload(packet: &[u8]) -> Result<InboundRip> {
  let header =
    Ipv4HeaderSlice::from_slice(packet).map_err(|e| anyhow!("Malformed IPv4 header: {:?}", e))?;
  let header_len = usize::from(header.ihl()) * 4;
  let total_len = usize::from(header.total_len());
  if total_len > packet.len() {
    return Err(anyhow!(
      "Truncated packet, total length {total_len} but only {} bytes",
      packet.len()
    ));
  }
  if total_len < header_len + UDP_HEADER_LEN {
    return Err(anyhow!("Total length {total_len} too short for UDP"));
  }

  match Protocol::try_from(header.protocol()) {
    Ok(Protocol::Udp) => (),
    Ok(other) => return Err(anyhow!("Expected UDP, got {other}")),
    Err(e) => return Err(e),
  }

  let datagram = &packet[header_len..total_len];
  let udp =
    UdpHeaderSlice::from_slice(datagram).map_err(|e| anyhow!("Malformed UDP header: {:?}", e))?;
  if udp.destination_port() != RIP_PORT {
    return Err(anyhow!("UDP port {} is not RIP", udp.destination_port()));
  }
  let udp_len = usize::from(udp.length());
  if udp_len < UDP_HEADER_LEN || udp_len > datagram.len() {
    return Err(anyhow!(
      "UDP length {udp_len} does not fit datagram of {}",
      datagram.len()
    ));
  }

  Ok(InboundRip {
    source:      header.source_addr(),
    destination: header.destination_addr(),
    payload:     &datagram[UDP_HEADER_LEN..udp_len],
  })
}

/// Wraps a RIP message in UDP (520 -> 520, no UDP checksum) and an IPv4
/// header with TTL 1 and a valid header checksum.
pub fn build_rip_packet(source: Ipv4Addr, destination: Ipv4Addr, msg: &RipMsg) -> Vec<u8> {
  let payload = msg.pack();
  let udp_len = (UDP_HEADER_LEN + payload.len()) as u16;
  let total_len = (IP_HEADER_LEN + usize::from(udp_len)) as u16;

  let mut packet = Vec::with_capacity(usize::from(total_len));
  packet.push(0x45);
  packet.push(RIP_TYPE_OF_SERVICE);
  packet.extend_from_slice(&total_len.to_be_bytes());
  // identification, flags and fragment offset
  packet.extend_from_slice(&[0, 0, 0, 0]);
  packet.push(RIP_TTL);
  packet.push(u8::from(Protocol::Udp));
  packet.extend_from_slice(&[0, 0]);
  packet.extend_from_slice(&source.octets());
  packet.extend_from_slice(&destination.octets());

  packet.extend_from_slice(&RIP_PORT.to_be_bytes());
  packet.extend_from_slice(&RIP_PORT.to_be_bytes());
  packet.extend_from_slice(&udp_len.to_be_bytes());
  packet.extend_from_slice(&[0, 0]);
  packet.extend_from_slice(&payload);

  checksum::write(&mut packet);
  packet
}
