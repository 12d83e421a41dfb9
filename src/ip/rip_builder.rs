//! Turns routing table snapshots into outgoing RIP responses.

use std::net::Ipv4Addr;

use super::rip_message::{RipCommand, RipEntry, RipMsg, RIP_MAX_ENTRIES};
use super::routing_table::{RouteEntry, RoutingTable};
use crate::InterfaceId;

/// Next hop is advertised as 0.0.0.0, i.e. "route through the sender"
fn to_rip_entry(route: &RouteEntry) -> RipEntry {
  RipEntry {
    address:  route.prefix,
    mask:     route.mask(),
    next_hop: Ipv4Addr::UNSPECIFIED,
    metric:   route.metric,
  }
}

/// Responses advertising every route not learned on `interface`, at most 25
/// entries each, in table order. Empty when there is nothing to advertise.
pub fn response_messages(table: &RoutingTable, interface: InterfaceId) -> Vec<RipMsg> {
  table
    .snapshot_for_advertisement(interface)
    .chunks(RIP_MAX_ENTRIES)
    .map(|page| RipMsg {
      command: RipCommand::Response,
      entries: page.iter().map(to_rip_entry).collect(),
    })
    .collect()
}

/// Answer to a whole-table request received on `interface`. Always holds at
/// least one message so the requester hears back even from an empty table.
pub fn request_reply(table: &RoutingTable, interface: InterfaceId) -> Vec<RipMsg> {
  let mut messages = response_messages(table, interface);
  if messages.is_empty() {
    messages.push(RipMsg::new(RipCommand::Response));
  }
  messages
}
