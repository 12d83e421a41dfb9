use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Result;

use crate::InterfaceId;

pub mod interface;
pub mod link_layer;

/// Address a router interface owns and the prefix length of its network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceAddr {
  pub id:         InterfaceId,
  pub address:    Ipv4Addr,
  pub prefix_len: u8,
}

/// Everything the router needs from the hardware below it. Address
/// resolution for `next_hop` is the implementation's business.
pub trait Hal {
  fn interfaces(&self) -> Vec<InterfaceAddr>;

  fn is_up(&self, id: InterfaceId) -> bool;

  /// Waits up to `timeout` for one packet; Ok(None) on timeout
  fn receive(&mut self, timeout: Duration) -> Result<Option<(InterfaceId, Vec<u8>)>>;

  fn send(&mut self, interface: InterfaceId, next_hop: Ipv4Addr, packet: &[u8]) -> Result<()>;

  /// Milliseconds since the HAL came up
  fn ticks(&self) -> u64;
}
