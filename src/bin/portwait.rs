use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::{anyhow, Context, Result};
use benchparse_rs::{wait_while_open, POLL_INTERVAL, PROBE_TIMEOUT};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "portwait", about = "Wait while a remote TCP port remains open")]
struct Args {
    /// Remote server IP address
    #[arg(long)]
    remote_ip: String,

    /// Remote port number
    #[arg(long)]
    remote_port: u16,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let addr: SocketAddr = (args.remote_ip.as_str(), args.remote_port)
        .to_socket_addrs()
        .with_context(|| format!("cannot resolve {}:{}", args.remote_ip, args.remote_port))?
        .next()
        .ok_or_else(|| anyhow!("no address for {}:{}", args.remote_ip, args.remote_port))?;

    println!(
        "Waiting while port {} on {} is open...",
        args.remote_port, args.remote_ip
    );
    wait_while_open(addr, PROBE_TIMEOUT, POLL_INTERVAL);
    println!(
        "Port {} on {} is now closed.",
        args.remote_port, args.remote_ip
    );

    Ok(())
}
