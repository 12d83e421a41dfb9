use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;

use crate::ip::packet::{self, RIP_MULTICAST};
use crate::ip::rip_message::{prefix_len_to_mask, RipCommand, RipMsg};
use crate::ip::routing_table::{RouteEntry, RoutingTable};
use crate::ip::{checksum, forwarding, rip_builder};
use crate::link::{Hal, InterfaceAddr};
use crate::{debug, edebug, info, InterfaceId};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// Why a packet went no further. None of these are errors: the packet is
/// discarded and the router carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
  BadChecksum,
  /// Not IPv4, shorter than its declared length, or addressed to us but not
  /// a well formed RIP datagram
  Malformed,
  /// No reachable route, or the route leaves through a down interface
  NoRoute,
  TtlExceeded,
  /// Our own multicast coming back to us
  FromSelf,
  /// RIP from 0.0.0.0 or from outside the receiving interface's network
  NotNeighbour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  /// Addressed to the router and handled as RIP
  Consumed,
  Forwarded(InterfaceId),
  Dropped(DropReason),
}

/// Single threaded dispatch loop around one routing table. Every received
/// packet is handled to completion before the next is looked at.
pub struct Router<H: Hal> {
  hal:                H,
  table:              RoutingTable,
  interfaces:         Vec<InterfaceAddr>,
  /// Interfaces whose routes have been poisoned for being down
  down:               HashSet<InterfaceId>,
  update_interval_ms: u64,
  /// Tick at which the next periodic advertisement is due
  next_update:        u64,
}

impl<H: Hal> Router<H> {
  /// Installs one direct route per interface. The first periodic update
  /// goes out on the first tick.
  pub fn new(hal: H, update_interval: Duration) -> Router<H> {
    let now = hal.ticks();
    let interfaces = hal.interfaces();
    let mut table = RoutingTable::new();
    for interface in &interfaces {
      table.install_or_replace(RouteEntry::direct(
        interface.address,
        interface.prefix_len,
        interface.id,
        now,
      ));
    }

    Router {
      hal,
      table,
      interfaces,
      down: HashSet::new(),
      update_interval_ms: update_interval.as_millis() as u64,
      next_update: now,
    }
  }

  pub fn table(&self) -> &RoutingTable {
    &self.table
  }

  pub fn hal(&self) -> &H {
    &self.hal
  }

  pub fn hal_mut(&mut self) -> &mut H {
    &mut self.hal
  }

  fn is_own_address(&self, address: Ipv4Addr) -> bool {
    self.interfaces.iter().any(|i| i.address == address)
  }

  fn interface_addr(&self, interface: InterfaceId) -> Option<InterfaceAddr> {
    self.interfaces.iter().find(|i| i.id == interface).copied()
  }

  /// RFC 2453 3.9.2: RIP is only taken from hosts on the network of the
  /// interface it arrived on
  fn is_neighbour(&self, interface: InterfaceId, source: Ipv4Addr) -> bool {
    let interface = match self.interface_addr(interface) {
      Some(interface) => interface,
      None => return false,
    };
    let mask = u32::from(prefix_len_to_mask(interface.prefix_len));
    !source.is_unspecified() && u32::from(source) & mask == u32::from(interface.address) & mask
  }

  /// Asks every neighbour for its whole table so we converge without
  /// waiting for their next periodic update.
  pub fn start(&mut self) -> Result<()> {
    let request = RipMsg::whole_table_request();
    for interface in &self.interfaces {
      if !self.hal.is_up(interface.id) {
        continue;
      }
      let packet = packet::build_rip_packet(interface.address, RIP_MULTICAST, &request);
      self.hal.send(interface.id, RIP_MULTICAST, &packet)?;
    }
    Ok(())
  }

  /// Runs due timers, then waits up to `timeout` for one packet and handles it
  pub fn poll(&mut self, timeout: Duration) -> Result<Option<Verdict>> {
    self.on_tick()?;
    match self.hal.receive(timeout)? {
      None => Ok(None),
      Some((interface, packet)) => self.handle_packet(interface, packet).map(Some),
    }
  }

  /// Follows interfaces going up or down: a down interface has every route
  /// through it poisoned, and coming back up restores its direct route and
  /// asks the neighbour on it for a fresh table.
  fn sync_interfaces(&mut self, now: u64) -> Result<()> {
    for interface in &self.interfaces {
      let up = self.hal.is_up(interface.id);
      if up != self.down.contains(&interface.id) {
        continue;
      }

      if up {
        self.down.remove(&interface.id);
        self.table.install_or_replace(RouteEntry::direct(
          interface.address,
          interface.prefix_len,
          interface.id,
          now,
        ));
        info!("Interface {} up, direct route restored", interface.id);
        let request = RipMsg::whole_table_request();
        let packet = packet::build_rip_packet(interface.address, RIP_MULTICAST, &request);
        self.hal.send(interface.id, RIP_MULTICAST, &packet)?;
      } else {
        self.down.insert(interface.id);
        let poisoned = self.table.poison_interface(interface.id, now);
        info!("Interface {} down, {poisoned} route(s) poisoned", interface.id);
      }
    }
    Ok(())
  }

  /// Tracks interface state, ages routes and sends the periodic
  /// advertisement when it is due
  pub fn on_tick(&mut self) -> Result<()> {
    let now = self.hal.ticks();
    self.sync_interfaces(now)?;
    let aged = self.table.age_out(now);
    if aged > 0 {
      info!("{aged} route(s) timed out or were garbage collected");
    }

    if now >= self.next_update {
      self.advertise()?;
      let jitter = rand::thread_rng().gen_range(0..=self.update_interval_ms / 6);
      self.next_update = now + self.update_interval_ms + jitter;
    }
    Ok(())
  }

  /// Multicasts the table out of every up interface, split horizon applied
  pub fn advertise(&mut self) -> Result<()> {
    for interface in &self.interfaces {
      if !self.hal.is_up(interface.id) {
        continue;
      }
      for msg in rip_builder::response_messages(&self.table, interface.id) {
        let packet = packet::build_rip_packet(interface.address, RIP_MULTICAST, &msg);
        self.hal.send(interface.id, RIP_MULTICAST, &packet)?;
      }
    }
    debug!("Sent periodic update");
    Ok(())
  }

  /// Handles one packet received on `interface`. Only HAL send failures are
  /// errors; every reason to discard the packet is reported in the verdict.
  pub fn handle_packet(&mut self, interface: InterfaceId, mut packet: Vec<u8>) -> Result<Verdict> {
    if !checksum::validate(&packet) {
      debug!("Invalid IP header on interface {interface}, dropping...");
      return Ok(Verdict::Dropped(DropReason::BadChecksum));
    }
    if packet::version(&packet) != 4 || usize::from(packet::total_length(&packet)) > packet.len() {
      debug!("Malformed packet on interface {interface}, dropping...");
      return Ok(Verdict::Dropped(DropReason::Malformed));
    }

    let destination = packet::destination_address(&packet);
    if self.is_own_address(destination) || destination == RIP_MULTICAST {
      return self.handle_local(interface, &packet);
    }

    let route = match self.table.lookup_route(destination) {
      Some(route) if route.is_reachable() && self.hal.is_up(route.interface) => *route,
      _ => {
        debug!("{:?}: No route, dropping...", destination);
        return Ok(Verdict::Dropped(DropReason::NoRoute));
      }
    };
    let next_hop = if route.is_direct() {
      destination
    } else {
      route.next_hop
    };

    if !forwarding::forward(&mut packet) {
      return Ok(Verdict::Dropped(DropReason::BadChecksum));
    }
    if forwarding::ttl(&packet) == 0 {
      debug!("packet dst {:?} expired, dropping...", destination);
      return Ok(Verdict::Dropped(DropReason::TtlExceeded));
    }

    self.hal.send(route.interface, next_hop, &packet)?;
    Ok(Verdict::Forwarded(route.interface))
  }

  fn handle_local(&mut self, interface: InterfaceId, packet: &[u8]) -> Result<Verdict> {
    let inbound = match packet::rip_payload(packet) {
      Ok(inbound) => inbound,
      Err(e) => {
        edebug!("{e}");
        return Ok(Verdict::Dropped(DropReason::Malformed));
      }
    };
    if self.is_own_address(inbound.source) {
      return Ok(Verdict::Dropped(DropReason::FromSelf));
    }
    if !self.is_neighbour(interface, inbound.source) {
      debug!("RIP from non-neighbour {} on interface {interface}, dropping...", inbound.source);
      return Ok(Verdict::Dropped(DropReason::NotNeighbour));
    }
    let msg = match RipMsg::unpack(inbound.payload) {
      Ok(msg) => msg,
      Err(e) => {
        edebug!("Malformed RIP message from {}: {e}", inbound.source);
        return Ok(Verdict::Dropped(DropReason::Malformed));
      }
    };

    match msg.command {
      RipCommand::Request => self.handle_request(interface, inbound.source, &msg)?,
      RipCommand::Response => self.handle_response(interface, inbound.source, &msg),
    }
    Ok(Verdict::Consumed)
  }

  fn handle_request(
    &mut self,
    interface: InterfaceId,
    requester: Ipv4Addr,
    msg: &RipMsg,
  ) -> Result<()> {
    if !msg.is_whole_table_request() {
      debug!("Ignoring partial table request from {}", requester);
      return Ok(());
    }
    let source = match self.interface_addr(interface) {
      Some(interface) => interface.address,
      None => return Ok(()),
    };
    for reply in rip_builder::request_reply(&self.table, interface) {
      let packet = packet::build_rip_packet(source, requester, &reply);
      self.hal.send(interface, requester, &packet)?;
    }
    Ok(())
  }

  fn handle_response(&mut self, interface: InterfaceId, advertiser: Ipv4Addr, msg: &RipMsg) {
    let now = self.hal.ticks();
    for entry in &msg.entries {
      let candidate = match RouteEntry::from_rip(entry, advertiser, interface, now) {
        Some(candidate) => candidate,
        None => continue,
      };
      if self.table.merge_rip_update(candidate) {
        debug!("Route update: {}", candidate);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::{HashSet, VecDeque};

  use ntest::timeout;

  use super::*;
  use crate::ip::rip_message::{prefix_len_to_mask, RipEntry, INFINITY_COST};
  use crate::ip::routing_table::ROUTE_TIMEOUT_MS;

  #[derive(Default)]
  struct FakeHal {
    interfaces: Vec<InterfaceAddr>,
    down:       HashSet<InterfaceId>,
    inbound:    VecDeque<(InterfaceId, Vec<u8>)>,
    sent:       Vec<(InterfaceId, Ipv4Addr, Vec<u8>)>,
    now:        u64,
  }

  impl Hal for FakeHal {
    fn interfaces(&self) -> Vec<InterfaceAddr> {
      self.interfaces.clone()
    }

    fn is_up(&self, id: InterfaceId) -> bool {
      !self.down.contains(&id)
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<(InterfaceId, Vec<u8>)>> {
      Ok(self.inbound.pop_front())
    }

    fn send(&mut self, interface: InterfaceId, next_hop: Ipv4Addr, packet: &[u8]) -> Result<()> {
      self.sent.push((interface, next_hop, packet.to_vec()));
      Ok(())
    }

    fn ticks(&self) -> u64 {
      self.now
    }
  }

  fn router() -> Router<FakeHal> {
    let hal = FakeHal {
      interfaces: (0..3)
        .map(|id| InterfaceAddr {
          id,
          address: Ipv4Addr::new(10, 0, id as u8, 1),
          prefix_len: 24,
        })
        .collect(),
      ..FakeHal::default()
    };
    Router::new(hal, DEFAULT_UPDATE_INTERVAL)
  }

  fn udp_packet(destination: Ipv4Addr, ttl: u8) -> Vec<u8> {
    let mut packet = vec![
      0x45, 0x00, 0x00, 0x20, 0x00, 0x01, 0x00, 0x00, ttl, 0x11, 0x00, 0x00, 192, 168, 7, 7,
    ];
    packet.extend_from_slice(&destination.octets());
    packet.extend_from_slice(&[0x30, 0x39, 0x00, 0x35, 0x00, 0x0c, 0x00, 0x00, b'p', b'i', b'n', b'g']);
    checksum::write(&mut packet);
    packet
  }

  fn response_from(advertiser: Ipv4Addr, entries: &[([u8; 4], u8, u32)]) -> Vec<u8> {
    let msg = RipMsg {
      command: RipCommand::Response,
      entries: entries
        .iter()
        .map(|(address, prefix_len, metric)| RipEntry {
          address:  Ipv4Addr::from(*address),
          mask:     prefix_len_to_mask(*prefix_len),
          next_hop: Ipv4Addr::UNSPECIFIED,
          metric:   *metric,
        })
        .collect(),
    };
    packet::build_rip_packet(advertiser, RIP_MULTICAST, &msg)
  }

  fn sent_msg(packet: &[u8]) -> RipMsg {
    RipMsg::unpack(packet::rip_payload(packet).unwrap().payload).unwrap()
  }

  #[test]
  fn test_direct_routes_installed() {
    let router = router();
    assert_eq!(router.table().len(), 3);
    for id in 0..3u8 {
      let route = router.table().get(Ipv4Addr::new(10, 0, id, 0), 24).unwrap();
      assert!(route.is_direct());
      assert_eq!(route.metric, 1);
      assert_eq!(route.interface, id as usize);
    }
  }

  #[test]
  fn test_forward_direct() {
    let mut router = router();
    let destination = Ipv4Addr::new(10, 0, 1, 5);
    let verdict = router.handle_packet(0, udp_packet(destination, 64)).unwrap();
    assert_eq!(verdict, Verdict::Forwarded(1));

    let (interface, next_hop, packet) = &router.hal().sent[0];
    assert_eq!(*interface, 1);
    assert_eq!(*next_hop, destination);
    assert_eq!(forwarding::ttl(packet), 63);
    assert!(checksum::validate(packet));
  }

  #[test]
  fn test_learn_then_forward_via_next_hop() {
    let mut router = router();
    let neighbour = Ipv4Addr::new(10, 0, 1, 2);
    let update = response_from(neighbour, &[([172, 16, 0, 0], 16, 1)]);
    assert_eq!(router.handle_packet(1, update).unwrap(), Verdict::Consumed);

    let route = *router.table().get(Ipv4Addr::new(172, 16, 0, 0), 16).unwrap();
    assert_eq!(route.next_hop, neighbour);
    assert_eq!(route.interface, 1);
    assert_eq!(route.metric, 2);

    let verdict = router
      .handle_packet(0, udp_packet(Ipv4Addr::new(172, 16, 3, 3), 9))
      .unwrap();
    assert_eq!(verdict, Verdict::Forwarded(1));
    assert_eq!(router.hal().sent[0].1, neighbour);
  }

  #[test]
  fn test_ttl_exhausted_not_sent() {
    let mut router = router();
    let verdict = router
      .handle_packet(0, udp_packet(Ipv4Addr::new(10, 0, 2, 9), 1))
      .unwrap();
    assert_eq!(verdict, Verdict::Dropped(DropReason::TtlExceeded));
    assert!(router.hal().sent.is_empty());
  }

  #[test]
  fn test_bad_checksum_dropped() {
    let mut router = router();
    let mut packet = udp_packet(Ipv4Addr::new(10, 0, 2, 9), 5);
    packet[10] ^= 0xff;
    assert_eq!(
      router.handle_packet(0, packet).unwrap(),
      Verdict::Dropped(DropReason::BadChecksum)
    );
    assert_eq!(
      router.handle_packet(0, vec![0x45, 0x00]).unwrap(),
      Verdict::Dropped(DropReason::BadChecksum)
    );
    assert!(router.hal().sent.is_empty());
  }

  #[test]
  fn test_no_route() {
    let mut router = router();
    assert_eq!(
      router
        .handle_packet(0, udp_packet(Ipv4Addr::new(8, 8, 8, 8), 64))
        .unwrap(),
      Verdict::Dropped(DropReason::NoRoute)
    );
  }

  #[test]
  fn test_unreachable_route_not_used() {
    let mut router = router();
    let neighbour = Ipv4Addr::new(10, 0, 1, 2);
    router
      .handle_packet(1, response_from(neighbour, &[([172, 16, 0, 0], 16, 3)]))
      .unwrap();
    router
      .handle_packet(1, response_from(neighbour, &[([172, 16, 0, 0], 16, INFINITY_COST)]))
      .unwrap();
    assert_eq!(
      router
        .handle_packet(0, udp_packet(Ipv4Addr::new(172, 16, 0, 1), 64))
        .unwrap(),
      Verdict::Dropped(DropReason::NoRoute)
    );
  }

  #[test]
  fn test_malformed_rip_dropped() {
    let mut router = router();
    let mut update = response_from(Ipv4Addr::new(10, 0, 1, 2), &[([172, 16, 0, 0], 16, 1)]);
    // RIP version byte
    update[29] = 1;
    assert_eq!(
      router.handle_packet(1, update).unwrap(),
      Verdict::Dropped(DropReason::Malformed)
    );
    assert_eq!(router.table().len(), 3);
  }

  #[test]
  fn test_own_multicast_ignored() {
    let mut router = router();
    let echo = response_from(Ipv4Addr::new(10, 0, 1, 1), &[([172, 16, 0, 0], 16, 1)]);
    assert_eq!(
      router.handle_packet(1, echo).unwrap(),
      Verdict::Dropped(DropReason::FromSelf)
    );
    assert_eq!(router.table().len(), 3);
  }

  #[test]
  fn test_whole_table_request_answered() {
    let mut router = router();
    let requester = Ipv4Addr::new(10, 0, 0, 2);
    let request = packet::build_rip_packet(
      requester,
      Ipv4Addr::new(10, 0, 0, 1),
      &RipMsg::whole_table_request(),
    );
    assert_eq!(router.handle_packet(0, request).unwrap(), Verdict::Consumed);

    assert_eq!(router.hal().sent.len(), 1);
    let (interface, next_hop, packet) = &router.hal().sent[0];
    assert_eq!((*interface, *next_hop), (0, requester));
    assert_eq!(packet::source_address(packet), Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(packet::destination_address(packet), requester);

    let reply = sent_msg(packet);
    assert_eq!(reply.command, RipCommand::Response);
    let advertised: Vec<_> = reply.entries.iter().map(|e| e.address).collect();
    assert_eq!(
      advertised,
      vec![Ipv4Addr::new(10, 0, 1, 0), Ipv4Addr::new(10, 0, 2, 0)]
    );
  }

  #[test]
  fn test_partial_request_ignored() {
    let mut router = router();
    let mut request = RipMsg::whole_table_request();
    request.entries[0].metric = 3;
    let request =
      packet::build_rip_packet(Ipv4Addr::new(10, 0, 0, 2), RIP_MULTICAST, &request);
    assert_eq!(router.handle_packet(0, request).unwrap(), Verdict::Consumed);
    assert!(router.hal().sent.is_empty());
  }

  #[test]
  fn test_periodic_advertisement() {
    let mut router = router();
    router.hal_mut().down.insert(2);

    router.on_tick().unwrap();
    assert_eq!(router.hal().sent.len(), 2);
    for (interface, next_hop, packet) in &router.hal().sent {
      assert_eq!(*next_hop, RIP_MULTICAST);
      let msg = sent_msg(packet);
      assert_eq!(msg.entries.len(), 2);
      // split horizon
      assert!(msg
        .entries
        .iter()
        .all(|e| e.address != Ipv4Addr::new(10, 0, *interface as u8, 0)));
      // the down interface's network is withdrawn, not advertised as reachable
      let withdrawn = msg
        .entries
        .iter()
        .find(|e| e.address == Ipv4Addr::new(10, 0, 2, 0))
        .unwrap();
      assert_eq!(withdrawn.metric, INFINITY_COST);
    }

    router.on_tick().unwrap();
    assert_eq!(router.hal().sent.len(), 2);

    let interval = DEFAULT_UPDATE_INTERVAL.as_millis() as u64;
    router.hal_mut().now = interval + interval / 6;
    router.on_tick().unwrap();
    assert_eq!(router.hal().sent.len(), 4);
  }

  #[test]
  fn test_down_interface_is_unreachable() {
    let mut router = router();
    let neighbour = Ipv4Addr::new(10, 0, 2, 2);
    router
      .handle_packet(2, response_from(neighbour, &[([172, 16, 0, 0], 16, 1)]))
      .unwrap();
    router.on_tick().unwrap();
    router.hal_mut().sent.clear();

    router.hal_mut().down.insert(2);
    // not yet seen by a tick, still refused
    assert_eq!(
      router
        .handle_packet(0, udp_packet(Ipv4Addr::new(10, 0, 2, 9), 64))
        .unwrap(),
      Verdict::Dropped(DropReason::NoRoute)
    );

    router.on_tick().unwrap();
    for prefix in [Ipv4Addr::new(10, 0, 2, 0), Ipv4Addr::new(172, 16, 0, 0)] {
      let len = if prefix.octets()[0] == 10 { 24 } else { 16 };
      assert_eq!(router.table().get(prefix, len).unwrap().metric, INFINITY_COST);
    }
    assert_eq!(
      router
        .handle_packet(0, udp_packet(Ipv4Addr::new(172, 16, 0, 1), 64))
        .unwrap(),
      Verdict::Dropped(DropReason::NoRoute)
    );
    assert!(router.hal().sent.is_empty());
  }

  #[test]
  fn test_interface_back_up_restores_direct_route() {
    let mut router = router();
    router.on_tick().unwrap();
    router.hal_mut().down.insert(2);
    router.on_tick().unwrap();
    router.hal_mut().sent.clear();

    router.hal_mut().down.remove(&2);
    router.on_tick().unwrap();
    let route = router.table().get(Ipv4Addr::new(10, 0, 2, 0), 24).unwrap();
    assert!(route.is_direct());
    assert_eq!(route.metric, 1);

    assert_eq!(router.hal().sent.len(), 1);
    let (interface, _, packet) = &router.hal().sent[0];
    assert_eq!(*interface, 2);
    assert!(sent_msg(packet).is_whole_table_request());

    assert_eq!(
      router
        .handle_packet(0, udp_packet(Ipv4Addr::new(10, 0, 2, 9), 64))
        .unwrap(),
      Verdict::Forwarded(2)
    );
  }

  #[test]
  fn test_response_from_unspecified_source_rejected() {
    let mut router = router();
    let before: Vec<RouteEntry> = router.table().iter().copied().collect();
    let update = response_from(
      Ipv4Addr::UNSPECIFIED,
      &[([10, 0, 0, 0], 24, 14), ([8, 8, 8, 0], 24, 1)],
    );
    assert_eq!(
      router.handle_packet(2, update).unwrap(),
      Verdict::Dropped(DropReason::NotNeighbour)
    );
    let after: Vec<RouteEntry> = router.table().iter().copied().collect();
    assert_eq!(before, after);
    assert!(router.table().get(Ipv4Addr::new(8, 8, 8, 0), 24).is_none());
  }

  #[test]
  fn test_response_from_other_network_rejected() {
    let mut router = router();
    // 10.0.1.2 is a neighbour on interface 1, not on interface 2
    let update = response_from(Ipv4Addr::new(10, 0, 1, 2), &[([172, 16, 0, 0], 16, 1)]);
    assert_eq!(
      router.handle_packet(2, update).unwrap(),
      Verdict::Dropped(DropReason::NotNeighbour)
    );
    assert!(router.table().get(Ipv4Addr::new(172, 16, 0, 0), 16).is_none());
  }

  #[test]
  fn test_truncated_transit_packet() {
    let mut router = router();
    let mut packet = udp_packet(Ipv4Addr::new(10, 0, 2, 9), 64);
    packet.truncate(28);
    assert_eq!(
      router.handle_packet(0, packet).unwrap(),
      Verdict::Dropped(DropReason::Malformed)
    );
    assert!(router.hal().sent.is_empty());
  }

  #[test]
  fn test_learned_routes_age_out() {
    let mut router = router();
    router
      .handle_packet(
        1,
        response_from(Ipv4Addr::new(10, 0, 1, 2), &[([172, 16, 0, 0], 16, 1)]),
      )
      .unwrap();

    router.hal_mut().now = ROUTE_TIMEOUT_MS;
    router.on_tick().unwrap();
    let route = router.table().get(Ipv4Addr::new(172, 16, 0, 0), 16).unwrap();
    assert_eq!(route.metric, INFINITY_COST);

    // the poisoned route is still advertised out of the other interfaces
    let poisoned = router
      .hal()
      .sent
      .iter()
      .filter(|(interface, _, _)| *interface == 0)
      .flat_map(|(_, _, packet)| sent_msg(packet).entries)
      .any(|e| e.address == Ipv4Addr::new(172, 16, 0, 0) && e.metric == INFINITY_COST);
    assert!(poisoned);
  }

  #[test]
  fn test_start_requests_tables() {
    let mut router = router();
    router.start().unwrap();
    assert_eq!(router.hal().sent.len(), 3);
    assert!(router
      .hal()
      .sent
      .iter()
      .all(|(_, _, packet)| sent_msg(packet).is_whole_table_request()));
  }

  #[test]
  #[timeout(1000)]
  fn test_poll() {
    let mut router = router();
    assert_eq!(router.poll(Duration::from_millis(10)).unwrap(), None);
    let sent_by_timer = router.hal().sent.len();

    let packet = udp_packet(Ipv4Addr::new(10, 0, 2, 2), 4);
    router.hal_mut().inbound.push_back((0, packet));
    assert_eq!(
      router.poll(Duration::from_millis(10)).unwrap(),
      Some(Verdict::Forwarded(2))
    );
    assert_eq!(router.hal().sent.len(), sent_by_timer + 1);
  }
}
