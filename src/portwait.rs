use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Upper bound on a single connect probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// Fixed pause between probes; no backoff.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// One connect probe. Any failure (refused, timeout, unreachable) counts as
/// closed.
pub fn is_port_open(addr: SocketAddr, timeout: Duration) -> bool {
    match TcpStream::connect_timeout(&addr, timeout) {
        Ok(_) => true,
        Err(err) => {
            debug!(%addr, %err, "connect probe failed");
            false
        }
    }
}

/// Block until the port stops accepting connections. The first failed probe
/// terminates the loop; when the very first probe fails this returns without
/// sleeping at all.
pub fn wait_while_open(addr: SocketAddr, timeout: Duration, interval: Duration) {
    while is_port_open(addr, timeout) {
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    const TEST_TIMEOUT: Duration = Duration::from_millis(500);

    #[test]
    fn open_port_probes_true() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        assert!(is_port_open(addr, TEST_TIMEOUT));
    }

    #[test]
    fn closed_port_probes_false() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        assert!(!is_port_open(addr, TEST_TIMEOUT));
    }

    #[test]
    fn already_closed_port_returns_without_sleeping() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let interval = Duration::from_secs(5);
        let start = Instant::now();
        wait_while_open(addr, TEST_TIMEOUT, interval);
        assert!(start.elapsed() < interval);
    }
}
