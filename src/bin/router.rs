use std::io::{stdin, stdout, Write};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use rip_router::link::interface::State;
use rip_router::link::link_layer::LinkLayer;
use rip_router::misc::lnx_config::LnxConfig;
use rip_router::router::{Router, Verdict};
use rip_router::{debug, info};

/// How long the router blocks on the link before checking timers and commands
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
  /// Filename of the lnx file
  #[clap(required = true)]
  lnx_filename: String,

  /// Seconds between periodic RIP updates
  #[clap(long, default_value_t = 5)]
  update_interval: u64,
}

fn check_len(tokens: &[String], expected: usize) -> Result<()> {
  if tokens.len() != expected + 1 {
    Err(anyhow!(
      "'{}' expected {expected} argument received {}",
      tokens[0],
      tokens.len() - 1
    ))
  } else {
    Ok(())
  }
}

fn parse_num<T: FromStr>(tokens: Vec<String>) -> Result<T> {
  check_len(&tokens, 1)?;
  tokens[1]
    .parse()
    .map_err(|_| anyhow!("single arg must be positive int"))
}

fn help_msg(bad_cmd: Option<&str>) {
  if let Some(bad_cmd) = bad_cmd {
    eprintln!("Unrecognized command {bad_cmd}, expected one of ");
  }
  eprintln!(
    "Commands:
li, interfaces                            - list interfaces
lr, routes                                - list reachable routing table rows

up <id>                                   - enable interface with id
down <id>                                 - disable interface with id

q, quit                                   - exit
h, help                                   - show this help"
  )
}

fn print_interfaces(router: &Router<LinkLayer>) {
  for interface in router.hal().get_interfaces() {
    println!("{}", interface);
  }
}

fn print_routes(router: &Router<LinkLayer>) {
  for route in router.table().iter().filter(|r| r.is_reachable()) {
    println!("{}", route);
  }
}

fn parse(tokens: Vec<String>, router: &mut Router<LinkLayer>) -> Result<bool> {
  let cmd = tokens[0].clone();
  match cmd.as_str() {
    "up" | "down" => {
      let state: State = cmd.parse()?;
      router.hal_mut().toggle_interface(parse_num(tokens)?, state)?
    }

    "interfaces" | "li" => print_interfaces(router),
    "routes" | "lr" => print_routes(router),

    "quit" | "q" => return Ok(true),
    "help" | "h" => help_msg(None),
    other => help_msg(Some(other)),
  }
  Ok(false)
}

/// Reads commands on its own thread so the router never blocks on stdin.
/// The channel closes on EOF.
fn spawn_command_reader() -> Receiver<Vec<String>> {
  let (command_tx, command_rx) = mpsc::channel();
  thread::spawn(move || loop {
    print!("> ");
    if stdout().flush().is_err() {
      break;
    }

    let mut buf = String::new();
    match stdin().read_line(&mut buf) {
      // this means EOF was sent
      Ok(0) | Err(_) => {
        println!();
        break;
      }
      Ok(_) => (),
    }

    let tokens = match shellwords::split(buf.trim()) {
      Ok(tokens) if tokens.is_empty() => continue,
      Ok(tokens) => tokens,
      Err(e) => {
        eprintln!("Error: {e}");
        continue;
      }
    };
    if command_tx.send(tokens).is_err() {
      break;
    }
  });
  command_rx
}

fn run(mut router: Router<LinkLayer>) -> Result<()> {
  let commands = spawn_command_reader();
  router.start()?;

  loop {
    match router.poll(POLL_INTERVAL)? {
      Some(Verdict::Dropped(reason)) => debug!("Dropped packet: {:?}", reason),
      Some(_) | None => (),
    }

    loop {
      match commands.try_recv() {
        Ok(tokens) => match parse(tokens, &mut router) {
          Ok(false) => (),
          Ok(true) => return Ok(()),
          Err(e) => eprintln!("Error: {e}"),
        },
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => return Ok(()),
      }
    }
  }
}

fn main() -> Result<()> {
  let args = Args::parse();
  let config = LnxConfig::new(&args.lnx_filename)?;
  let link_layer = LinkLayer::new(config);
  let router = Router::new(link_layer, Duration::from_secs(args.update_interval));
  info!("Router up with {} direct route(s)", router.table().len());
  run(router).map_err(|e| {
    eprintln!("Fatal error: {e}");
    eprintln!("exiting...");
    e
  })
}
