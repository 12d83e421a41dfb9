use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use super::rip_message::{mask_to_prefix_len, prefix_len_to_mask, RipEntry, INFINITY_COST};
use crate::InterfaceId;

/// A learned route that has not been refreshed for this long becomes unreachable
pub const ROUTE_TIMEOUT_MS: u64 = 180_000;
/// An unreachable learned route is purged after this much longer
pub const GARBAGE_COLLECTION_MS: u64 = 120_000;

pub const DIRECT_METRIC: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
  /// Only the top `prefix_len` bits may be set once the entry is in a table
  pub prefix:     Ipv4Addr,
  pub prefix_len: u8,
  pub interface:  InterfaceId,
  /// UNSPECIFIED for directly connected networks
  pub next_hop:   Ipv4Addr,
  pub metric:     u32,
  /// Tick (ms) of the last install or refresh
  pub timestamp:  u64,
}

fn mask_address(address: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
  Ipv4Addr::from(u32::from(address) & u32::from(prefix_len_to_mask(prefix_len)))
}

impl RouteEntry {
  /// Route to the network an interface with `address` is attached to
  pub fn direct(
    address: Ipv4Addr,
    prefix_len: u8,
    interface: InterfaceId,
    now: u64,
  ) -> RouteEntry {
    RouteEntry {
      prefix: mask_address(address, prefix_len),
      prefix_len,
      interface,
      next_hop: Ipv4Addr::UNSPECIFIED,
      metric: DIRECT_METRIC,
      timestamp: now,
    }
  }

  /// Builds the merge candidate for an entry received from `advertiser` on
  /// `interface`: one hop further away, reached through the advertiser.
  ///
  /// Returns None if the mask is not contiguous, which keeps out-of-range
  /// prefix lengths from ever reaching a table, or if the advertiser is
  /// 0.0.0.0.
  pub fn from_rip(
    entry: &RipEntry,
    advertiser: Ipv4Addr,
    interface: InterfaceId,
    now: u64,
  ) -> Option<RouteEntry> {
    // an unspecified next hop would pass for a direct route
    if advertiser.is_unspecified() {
      return None;
    }
    let prefix_len = mask_to_prefix_len(entry.mask)?;
    Some(RouteEntry {
      prefix: mask_address(entry.address, prefix_len),
      prefix_len,
      interface,
      next_hop: advertiser,
      metric: entry.metric.saturating_add(1).min(INFINITY_COST),
      timestamp: now,
    })
  }

  pub fn is_direct(&self) -> bool {
    self.next_hop.is_unspecified()
  }

  pub fn is_reachable(&self) -> bool {
    self.metric < INFINITY_COST
  }

  pub fn mask(&self) -> Ipv4Addr {
    prefix_len_to_mask(self.prefix_len)
  }

  fn key(&self) -> (Ipv4Addr, u8) {
    (self.prefix, self.prefix_len)
  }

  fn normalized(mut self) -> RouteEntry {
    assert!(self.prefix_len <= 32, "prefix length {} > 32", self.prefix_len);
    self.prefix = mask_address(self.prefix, self.prefix_len);
    self
  }
}

impl fmt::Display for RouteEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let next_hop = if self.is_direct() {
      "direct".to_string()
    } else {
      self.next_hop.to_string()
    };
    write!(
      f,
      "{}/{} via {} if {} metric {}",
      self.prefix, self.prefix_len, next_hop, self.interface, self.metric
    )
  }
}

/// Routes keyed by (prefix, prefix_len), iterated in ascending key order
#[derive(Debug, Default)]
pub struct RoutingTable {
  routes: BTreeMap<(Ipv4Addr, u8), RouteEntry>,
}

impl RoutingTable {
  pub fn new() -> RoutingTable {
    RoutingTable::default()
  }

  pub fn len(&self) -> usize {
    self.routes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.routes.is_empty()
  }

  pub fn get(&self, prefix: Ipv4Addr, prefix_len: u8) -> Option<&RouteEntry> {
    self.routes.get(&(mask_address(prefix, prefix_len), prefix_len))
  }

  pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
    self.routes.values()
  }

  /// Static and direct routes: overwrites whatever is stored under the key
  pub fn install_or_replace(&mut self, entry: RouteEntry) {
    let entry = entry.normalized();
    self.routes.insert(entry.key(), entry);
  }

  pub fn remove(&mut self, prefix: Ipv4Addr, prefix_len: u8) -> Option<RouteEntry> {
    self.routes.remove(&(mask_address(prefix, prefix_len), prefix_len))
  }

  /// Distance vector acceptance rule. Returns true if the table changed.
  ///
  /// - unknown prefix: installed unless already unreachable
  /// - same next hop as the stored route: always taken, including worse
  ///   metrics and 16, since the advertiser is the authority on its own route
  /// - different next hop: taken only with a strictly lower metric
  pub fn merge_rip_update(&mut self, candidate: RouteEntry) -> bool {
    let mut candidate = candidate.normalized();
    match self.routes.get(&candidate.key()) {
      None if !candidate.is_reachable() => false,
      None => {
        self.routes.insert(candidate.key(), candidate);
        true
      }
      Some(existing) if existing.next_hop == candidate.next_hop => {
        // RFC 2453 3.9.2: a route already at 16 keeps its deletion timer,
        // so repeated withdrawals must not hold off garbage collection
        if !existing.is_reachable() && !candidate.is_reachable() {
          candidate.timestamp = existing.timestamp;
        }
        self.routes.insert(candidate.key(), candidate);
        true
      }
      Some(existing) if candidate.metric < existing.metric => {
        self.routes.insert(candidate.key(), candidate);
        true
      }
      Some(_) => false,
    }
  }

  /// Longest prefix match over every stored row
  pub fn lookup_route(&self, address: Ipv4Addr) -> Option<&RouteEntry> {
    (0..=32u8)
      .rev()
      .find_map(|len| self.routes.get(&(mask_address(address, len), len)))
  }

  /// Longest prefix match, returning (next_hop, interface). A next hop of
  /// UNSPECIFIED means the destination is on a directly attached network.
  pub fn lookup(&self, address: Ipv4Addr) -> Option<(Ipv4Addr, InterfaceId)> {
    self
      .lookup_route(address)
      .map(|route| (route.next_hop, route.interface))
  }

  /// Every route not learned on `excluding_interface` (split horizon), in
  /// table order.
  pub fn snapshot_for_advertisement(&self, excluding_interface: InterfaceId) -> Vec<RouteEntry> {
    self
      .routes
      .values()
      .filter(|route| route.interface != excluding_interface)
      .copied()
      .collect()
  }

  /// Marks every reachable route out of `interface` unreachable, direct
  /// route included. Returns how many were poisoned.
  pub fn poison_interface(&mut self, interface: InterfaceId, now: u64) -> usize {
    let mut poisoned = 0;
    for route in self.routes.values_mut() {
      if route.interface == interface && route.is_reachable() {
        route.metric = INFINITY_COST;
        route.timestamp = now;
        poisoned += 1;
      }
    }
    poisoned
  }

  /// Times out stale learned routes to metric 16 and purges those that have
  /// stayed unreachable past garbage collection. Direct routes never age.
  /// Returns how many routes changed or were removed.
  pub fn age_out(&mut self, now: u64) -> usize {
    let mut changed = 0;
    self.routes.retain(|_, route| {
      if route.is_direct() {
        return true;
      }
      let age = now.saturating_sub(route.timestamp);
      if route.is_reachable() {
        if age >= ROUTE_TIMEOUT_MS {
          route.metric = INFINITY_COST;
          route.timestamp = now;
          changed += 1;
        }
        true
      } else if age >= GARBAGE_COLLECTION_MS {
        changed += 1;
        false
      } else {
        true
      }
    });
    changed
  }
}

impl fmt::Display for RoutingTable {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    self
      .routes
      .values()
      .fold(Ok(()), |acc, route| acc.and_then(|_| writeln!(f, "{}", route)))
  }
}
