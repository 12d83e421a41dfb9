use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use anyhow::{anyhow, Error, Result};

use super::InterfaceAddr;
use crate::InterfaceId;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum State {
  UP,
  DOWN,
}

impl FromStr for State {
  type Err = Error;
  fn from_str(input: &str) -> Result<State> {
    match input {
      "down" => Ok(State::DOWN),
      "up" => Ok(State::UP),
      other => Err(anyhow!("Unknown state {other}")),
    }
  }
}

/// One virtual link: a UDP peer standing in for the wire, plus the address
/// and network this router has on it.
#[derive(Debug, Clone)]
pub struct Interface {
  pub id:                 InterfaceId,
  pub outgoing_link:      String,
  pub outgoing_link_addr: SocketAddr,
  pub our_ip:             Ipv4Addr,
  pub prefix_len:         u8,
  state:                  State,
}

impl Interface {
  pub fn new(
    id: InterfaceId,
    outgoing_link: String,
    our_ip: Ipv4Addr,
    prefix_len: u8,
  ) -> Result<Interface> {
    if prefix_len > 32 {
      return Err(anyhow!("Invalid prefix length {prefix_len} for {our_ip}"));
    }
    let outgoing_link_addr = match outgoing_link
      .to_socket_addrs()?
      .filter(|a| a.is_ipv4())
      .next()
    {
      Some(addr) => addr,
      None => return Err(anyhow!("Invalid socket_addr: {outgoing_link}")),
    };
    Ok(Interface {
      id,
      outgoing_link,
      outgoing_link_addr,
      our_ip,
      prefix_len,
      state: State::UP,
    })
  }

  /// Sets interface to UP state
  pub fn up(&mut self) {
    self.state = State::UP;
  }

  /// Sets interface to DOWN state
  pub fn down(&mut self) {
    self.state = State::DOWN;
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn addr(&self) -> InterfaceAddr {
    InterfaceAddr {
      id:         self.id,
      address:    self.our_ip,
      prefix_len: self.prefix_len,
    }
  }
}

impl fmt::Display for Interface {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if cfg!(debug_assertions) {
      write!(
        f,
        "{}: status {:?}, outgoing_link {}, our_ip {}/{}",
        self.id,
        self.state(),
        self.outgoing_link,
        self.our_ip,
        self.prefix_len
      )
    } else {
      write!(
        f,
        "{}: status {:?}, our_ip {}/{}",
        self.id,
        self.state(),
        self.our_ip,
        self.prefix_len
      )
    }
  }
}
