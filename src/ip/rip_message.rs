use std::error::Error;
use std::fmt;
use std::net::Ipv4Addr;

use crate::edebug;

pub const RIP_PORT: u16 = 520;
pub const RIP_VERSION: u8 = 2;
pub const RIP_HEADER_LEN: usize = 4;
pub const RIP_ENTRY_LEN: usize = 20;
/// RFC 2453 limit on route entries carried by a single message
pub const RIP_MAX_ENTRIES: usize = 25;
pub const INFINITY_COST: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RipCommand {
  Request,
  Response,
}

impl RipCommand {
  /// Address family every entry must carry for this command
  fn address_family(self) -> u16 {
    match self {
      RipCommand::Request => 0,
      RipCommand::Response => 2,
    }
  }
}

impl TryFrom<u8> for RipCommand {
  type Error = DecodeError;
  fn try_from(value: u8) -> Result<RipCommand, DecodeError> {
    match value {
      1 => Ok(RipCommand::Request),
      2 => Ok(RipCommand::Response),
      other => Err(DecodeError::BadCommand(other)),
    }
  }
}

impl From<RipCommand> for u8 {
  fn from(command: RipCommand) -> u8 {
    match command {
      RipCommand::Request => 1,
      RipCommand::Response => 2,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
  /// Payload length is not a 4 byte header plus whole 20 byte entries
  Truncated(usize),
  TooManyEntries(usize),
  BadCommand(u8),
  BadVersion(u8),
  NonZeroHeader(u16),
  BadAddressFamily { entry: usize, family: u16 },
  NonZeroRouteTag { entry: usize, tag: u16 },
  BadMetric { entry: usize, metric: u32 },
  BadMask { entry: usize, mask: Ipv4Addr },
}

impl fmt::Display for DecodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DecodeError::Truncated(len) => write!(f, "RIP payload of {len} bytes is not header + entries"),
      DecodeError::TooManyEntries(n) => {
        write!(f, "RIP message carries {n} entries, max is {RIP_MAX_ENTRIES}")
      }
      DecodeError::BadCommand(cmd) => write!(f, "Invalid cmd type {cmd}"),
      DecodeError::BadVersion(version) => write!(f, "Unsupported RIP version {version}"),
      DecodeError::NonZeroHeader(zero) => write!(f, "Must-be-zero header field was {zero:#06x}"),
      DecodeError::BadAddressFamily { entry, family } => {
        write!(f, "Entry {entry}: address family {family} does not match command")
      }
      DecodeError::NonZeroRouteTag { entry, tag } => write!(f, "Entry {entry}: route tag {tag}"),
      DecodeError::BadMetric { entry, metric } => {
        write!(f, "Entry {entry}: metric {metric} outside [1, {INFINITY_COST}]")
      }
      DecodeError::BadMask { entry, mask } => {
        write!(f, "Entry {entry}: mask {mask} is not contiguous")
      }
    }
  }
}

impl Error for DecodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RipMsg {
  pub command: RipCommand,
  /// Entries in wire order
  pub entries: Vec<RipEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RipEntry {
  pub address:  Ipv4Addr,
  pub mask:     Ipv4Addr,
  pub next_hop: Ipv4Addr,
  pub metric:   u32,
}

/// Prefix length of a contiguous mask, None when the ones are not contiguous.
///
/// A mask is valid iff its host bits (`!mask`, host order) are of the form
/// `2^k - 1`, i.e. adding one to them clears every set bit.
pub fn mask_to_prefix_len(mask: Ipv4Addr) -> Option<u8> {
  let mask = u32::from(mask);
  let host_bits = !mask;
  if host_bits & host_bits.wrapping_add(1) == 0 {
    Some(mask.leading_ones() as u8)
  } else {
    None
  }
}

pub fn prefix_len_to_mask(prefix_len: u8) -> Ipv4Addr {
  debug_assert!(prefix_len <= 32);
  match prefix_len {
    0 => Ipv4Addr::UNSPECIFIED,
    len => Ipv4Addr::from(u32::MAX << (32 - u32::from(len.min(32)))),
  }
}

fn be_u16(bytes: &[u8], offset: usize) -> u16 {
  u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
  u32::from_be_bytes([
    bytes[offset],
    bytes[offset + 1],
    bytes[offset + 2],
    bytes[offset + 3],
  ])
}

/// Fixed layout view over one 20 byte route entry
struct EntryView<'a>(&'a [u8]);

impl<'a> EntryView<'a> {
  fn address_family(&self) -> u16 {
    be_u16(self.0, 0)
  }

  fn route_tag(&self) -> u16 {
    be_u16(self.0, 2)
  }

  fn address(&self) -> Ipv4Addr {
    Ipv4Addr::from(be_u32(self.0, 4))
  }

  fn mask(&self) -> Ipv4Addr {
    Ipv4Addr::from(be_u32(self.0, 8))
  }

  fn next_hop(&self) -> Ipv4Addr {
    Ipv4Addr::from(be_u32(self.0, 12))
  }

  fn metric(&self) -> u32 {
    be_u32(self.0, 16)
  }
}

impl RipMsg {
  pub fn new(command: RipCommand) -> RipMsg {
    RipMsg {
      command,
      entries: Vec::new(),
    }
  }

  /// RFC 2453 3.9.1 request for the sender's whole table
  pub fn whole_table_request() -> RipMsg {
    RipMsg {
      command: RipCommand::Request,
      entries: vec![RipEntry {
        address:  Ipv4Addr::UNSPECIFIED,
        mask:     Ipv4Addr::UNSPECIFIED,
        next_hop: Ipv4Addr::UNSPECIFIED,
        metric:   INFINITY_COST,
      }],
    }
  }

  pub fn is_whole_table_request(&self) -> bool {
    self.command == RipCommand::Request
      && self.entries.len() == 1
      && self.entries[0].metric == INFINITY_COST
  }

  /// Decodes a RIP message from a UDP payload. The slice must be bounded by
  /// the datagram's own length; the entry count is derived from it.
  pub fn unpack(bytes: &[u8]) -> Result<RipMsg, DecodeError> {
    if bytes.len() < RIP_HEADER_LEN || (bytes.len() - RIP_HEADER_LEN) % RIP_ENTRY_LEN != 0 {
      return Err(DecodeError::Truncated(bytes.len()));
    }
    let num_entries = (bytes.len() - RIP_HEADER_LEN) / RIP_ENTRY_LEN;
    if num_entries > RIP_MAX_ENTRIES {
      return Err(DecodeError::TooManyEntries(num_entries));
    }

    let command = RipCommand::try_from(bytes[0])?;
    if bytes[1] != RIP_VERSION {
      return Err(DecodeError::BadVersion(bytes[1]));
    }
    let zero = be_u16(bytes, 2);
    if zero != 0 {
      return Err(DecodeError::NonZeroHeader(zero));
    }

    let mut entries = Vec::with_capacity(num_entries);
    for (i, chunk) in bytes[RIP_HEADER_LEN..].chunks_exact(RIP_ENTRY_LEN).enumerate() {
      let view = EntryView(chunk);
      let family = view.address_family();
      if family != command.address_family() {
        return Err(DecodeError::BadAddressFamily { entry: i, family });
      }
      let tag = view.route_tag();
      if tag != 0 {
        return Err(DecodeError::NonZeroRouteTag { entry: i, tag });
      }
      let metric = view.metric();
      if !(1..=INFINITY_COST).contains(&metric) {
        return Err(DecodeError::BadMetric { entry: i, metric });
      }
      let mask = view.mask();
      if mask_to_prefix_len(mask).is_none() {
        return Err(DecodeError::BadMask { entry: i, mask });
      }
      entries.push(RipEntry {
        address: view.address(),
        mask,
        next_hop: view.next_hop(),
        metric,
      });
    }

    Ok(RipMsg { command, entries })
  }

  /// Encodes the message; the returned length (4 + 20 * entries) is what the
  /// caller puts in the UDP and IP length fields. Entries past the 25th are
  /// dropped, callers page large tables through `rip_builder`.
  pub fn pack(&self) -> Vec<u8> {
    if self.entries.len() > RIP_MAX_ENTRIES {
      edebug!(
        "warning: RIP message has {} entries, keeping first {}...",
        self.entries.len(),
        RIP_MAX_ENTRIES
      );
    }
    let entries = &self.entries[..self.entries.len().min(RIP_MAX_ENTRIES)];

    let mut buffer = Vec::with_capacity(RIP_HEADER_LEN + RIP_ENTRY_LEN * entries.len());
    buffer.push(u8::from(self.command));
    buffer.push(RIP_VERSION);
    buffer.extend_from_slice(&[0, 0]);

    let family = self.command.address_family();
    for entry in entries {
      buffer.extend_from_slice(&family.to_be_bytes());
      // route tag
      buffer.extend_from_slice(&[0, 0]);
      buffer.extend_from_slice(&entry.address.octets());
      buffer.extend_from_slice(&entry.mask.octets());
      buffer.extend_from_slice(&entry.next_hop.octets());
      buffer.extend_from_slice(&entry.metric.to_be_bytes());
    }

    buffer
  }
}
