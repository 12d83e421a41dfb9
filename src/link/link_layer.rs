use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use super::interface::{Interface, State};
use super::{Hal, InterfaceAddr};
use crate::misc::lnx_config::LnxConfig;
use crate::{debug, InterfaceId};

const MAX_SIZE: usize = 65536;

/// Virtual links over a single UDP socket. Each interface talks to exactly one
/// peer socket, so a packet's arrival interface is identified by its sender
/// and there is nothing to resolve for the next hop.
#[derive(Debug)]
pub struct LinkLayer {
  local_link: UdpSocket,
  interfaces: Vec<Interface>,
  started:    Instant,
}

impl LinkLayer {
  pub fn new(config: LnxConfig) -> LinkLayer {
    LinkLayer {
      local_link: config.local_link,
      interfaces: config.interfaces,
      started:    Instant::now(),
    }
  }

  pub fn get_interfaces(&self) -> &[Interface] {
    &self.interfaces
  }

  fn get_interface_mut(&mut self, id: InterfaceId) -> Result<&mut Interface> {
    self
      .interfaces
      .get_mut(id)
      .ok_or_else(|| anyhow!("No interface with id {id}"))
  }

  /// Sets the specified interface up
  pub fn up(&mut self, id: InterfaceId) -> Result<()> {
    self.get_interface_mut(id)?.up();
    Ok(())
  }

  /// Sets the specified interface down
  pub fn down(&mut self, id: InterfaceId) -> Result<()> {
    self.get_interface_mut(id)?.down();
    Ok(())
  }

  pub fn toggle_interface(&mut self, id: InterfaceId, state: State) -> Result<()> {
    match state {
      State::UP => self.up(id),
      State::DOWN => self.down(id),
    }
  }

  fn interface_from(&self, src: SocketAddr) -> Option<&Interface> {
    self.interfaces.iter().find(|i| i.outgoing_link_addr == src)
  }
}

impl Hal for LinkLayer {
  fn interfaces(&self) -> Vec<InterfaceAddr> {
    self.interfaces.iter().map(Interface::addr).collect()
  }

  fn is_up(&self, id: InterfaceId) -> bool {
    self
      .interfaces
      .get(id)
      .map_or(false, |i| i.state() == State::UP)
  }

  fn receive(&mut self, timeout: Duration) -> Result<Option<(InterfaceId, Vec<u8>)>> {
    // a zero read timeout is rejected by the socket
    let timeout = timeout.max(Duration::from_millis(1));
    self.local_link.set_read_timeout(Some(timeout))?;

    let mut buf = vec![0u8; MAX_SIZE];
    match self.local_link.recv_from(&mut buf) {
      Ok((bytes_read, src)) => match self.interface_from(src) {
        None => {
          debug!("Warning: Unknown link {}, dropping...", src);
          Ok(None)
        }
        Some(interface) if interface.state() == State::DOWN => Ok(None),
        Some(interface) => {
          buf.truncate(bytes_read);
          Ok(Some((interface.id, buf)))
        }
      },
      Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => Ok(None),
      Err(e) => Err(anyhow!("Error in receiving from local link").context(format!("{}", e))),
    }
  }

  fn send(&mut self, interface: InterfaceId, next_hop: Ipv4Addr, packet: &[u8]) -> Result<()> {
    let interface = match self.interfaces.get(interface) {
      Some(interface) => interface,
      None => return Err(anyhow!("No interface with id {interface}")),
    };
    if interface.state() == State::DOWN {
      debug!("Interface {} down, not sending to {}", interface.id, next_hop);
      return Ok(());
    }
    self
      .local_link
      .send_to(packet, interface.outgoing_link_addr)?;
    Ok(())
  }

  fn ticks(&self) -> u64 {
    self.started.elapsed().as_millis() as u64
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use ntest::timeout;

  use super::*;

  /// Two link layers on loopback, each with one interface pointing at the other
  fn linked_pair() -> (LinkLayer, LinkLayer) {
    let a = UdpSocket::bind("127.0.0.1:0").unwrap();
    let b = UdpSocket::bind("127.0.0.1:0").unwrap();
    let a_port = a.local_addr().unwrap().port();
    let b_port = b.local_addr().unwrap().port();
    drop(a);
    drop(b);

    let config_a = format!("127.0.0.1 {a_port}\n127.0.0.1 {b_port} 10.0.0.1 24\n");
    let config_b = format!("127.0.0.1 {b_port}\n127.0.0.1 {a_port} 10.0.0.2 24\n");
    (
      LinkLayer::new(LnxConfig::parse(Cursor::new(config_a)).unwrap()),
      LinkLayer::new(LnxConfig::parse(Cursor::new(config_b)).unwrap()),
    )
  }

  #[test]
  #[timeout(2000)]
  fn test_send_and_receive() {
    let (mut a, mut b) = linked_pair();
    a.send(0, Ipv4Addr::new(10, 0, 0, 2), &[1, 2, 3]).unwrap();
    let (id, bytes) = b.receive(Duration::from_millis(500)).unwrap().unwrap();
    assert_eq!(id, 0);
    assert_eq!(bytes, vec![1, 2, 3]);
  }

  #[test]
  #[timeout(2000)]
  fn test_receive_times_out() {
    let (_a, mut b) = linked_pair();
    assert!(b.receive(Duration::from_millis(20)).unwrap().is_none());
  }

  #[test]
  #[timeout(2000)]
  fn test_down_interface_drops_traffic() {
    let (mut a, mut b) = linked_pair();
    b.down(0).unwrap();
    assert!(!b.is_up(0));
    a.send(0, Ipv4Addr::new(10, 0, 0, 2), &[1]).unwrap();
    assert!(b.receive(Duration::from_millis(200)).unwrap().is_none());

    a.down(0).unwrap();
    b.up(0).unwrap();
    a.send(0, Ipv4Addr::new(10, 0, 0, 2), &[2]).unwrap();
    assert!(b.receive(Duration::from_millis(100)).unwrap().is_none());
  }

  #[test]
  fn test_unknown_interface() {
    let (mut a, _b) = linked_pair();
    assert!(a.up(7).is_err());
    assert!(a.send(7, Ipv4Addr::LOCALHOST, &[]).is_err());
    assert!(!a.is_up(7));
    assert_eq!(a.interfaces().len(), 1);
    assert_eq!(a.interfaces()[0].address, Ipv4Addr::new(10, 0, 0, 1));
  }
}
