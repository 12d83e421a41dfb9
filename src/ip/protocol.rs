use std::fmt;

use anyhow::{anyhow, Error, Result};

/// IP protocol numbers the router distinguishes
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Protocol {
  Icmp,
  Tcp,
  Udp,
}

impl fmt::Display for Protocol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

impl TryFrom<u8> for Protocol {
  type Error = Error;
  fn try_from(value: u8) -> Result<Protocol> {
    match value {
      1 => Ok(Protocol::Icmp),
      6 => Ok(Protocol::Tcp),
      17 => Ok(Protocol::Udp),
      other => Err(anyhow!("Unrecognized protocol number {other}")),
    }
  }
}

impl From<Protocol> for u8 {
  fn from(protocol: Protocol) -> u8 {
    match protocol {
      Protocol::Icmp => 1,
      Protocol::Tcp => 6,
      Protocol::Udp => 17,
    }
  }
}
