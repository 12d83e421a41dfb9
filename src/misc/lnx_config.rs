use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::UdpSocket;

use anyhow::{anyhow, Result};

use crate::link::interface::Interface;

/// Parsed link file.
///
/// ```text
/// <bind host> <bind port>
/// <peer host> <peer port> <our ip> <prefix len>
/// ...
/// ```
/// Interfaces are numbered in the order they appear. Blank lines and lines
/// starting with '#' are skipped.
#[derive(Debug)]
pub struct LnxConfig {
  /// UdpSocket to recv incoming messages on
  pub local_link: UdpSocket,

  pub interfaces: Vec<Interface>,
}

impl LnxConfig {
  pub fn new(lnx_filename: &str) -> Result<LnxConfig> {
    let f = File::open(lnx_filename)?;
    LnxConfig::parse(BufReader::new(f))
      .map_err(|e| anyhow!("File {lnx_filename} improperly formatted: {e}"))
  }

  pub fn parse<R: BufRead>(reader: R) -> Result<LnxConfig> {
    let mut lines = reader
      .lines()
      .enumerate()
      .map(|(i, line)| line.map(|l| (i + 1, l)))
      .filter(|line| match line {
        Ok((_, l)) => !l.trim().is_empty() && !l.trim_start().starts_with('#'),
        Err(_) => true,
      });

    let (line_no, local_addr) = match lines.next() {
      Some(line) => line?,
      None => return Err(anyhow!("missing local link line")),
    };
    let tokens: Vec<&str> = local_addr.split_whitespace().collect();
    if tokens.len() != 2 {
      return Err(anyhow!("expected '<host> <port>' at line {line_no}"));
    }
    let local_link = UdpSocket::bind(format!("{}:{}", tokens[0], tokens[1]))?;

    let mut interfaces = Vec::new();
    for line in lines {
      let (line_no, line) = line?;
      let tokens: Vec<&str> = line.split_whitespace().collect();
      if tokens.len() != 4 {
        return Err(anyhow!(
          "expected '<host> <port> <ip> <prefix len>' at line {line_no}"
        ));
      }
      interfaces.push(Interface::new(
        interfaces.len(),
        format!("{}:{}", tokens[0], tokens[1]),
        tokens[2].parse()?,
        tokens[3].parse()?,
      )?);
    }

    Ok(LnxConfig {
      local_link,
      interfaces,
    })
  }
}
