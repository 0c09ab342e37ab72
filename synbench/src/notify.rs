//! Fire-and-forget completion notification.
//!
//! After a successful aggregation the coordinator may send a single JSON
//! status line to a configured `host:port` listener. Delivery is best
//! effort with short timeouts; failure never affects the artifact.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::process;
use std::time::Duration;

/// Connect and write deadline for the notification socket.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

/// Send the completion status line to `target`, logging any failure.
pub fn send_completion(target: &str, artifact: &Path) {
    let status = serde_json::json!({
        "app": "synbench",
        "event": "complete",
        "pid": process::id(),
        "artifact": artifact.display().to_string(),
    });
    match try_send(target, &status) {
        Ok(()) => tracing::debug!(target, "completion notification sent"),
        Err(err) => tracing::warn!(target, %err, "completion notification failed"),
    }
}

fn try_send(target: &str, status: &serde_json::Value) -> io::Result<()> {
    let addr = target.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target resolved to no address")
    })?;
    let mut stream = TcpStream::connect_timeout(&addr, NOTIFY_TIMEOUT)?;
    stream.set_write_timeout(Some(NOTIFY_TIMEOUT))?;
    stream.write_all(status.to_string().as_bytes())?;
    stream.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn delivers_one_json_line() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut line = String::new();
            stream.read_to_string(&mut line).unwrap();
            line
        });

        send_completion(&addr.to_string(), Path::new("/tmp/out.json"));

        let line = server.join().unwrap();
        let status: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(status["event"], "complete");
        assert_eq!(status["artifact"], "/tmp/out.json");
    }

    #[test]
    fn unreachable_target_is_not_fatal() {
        // Port 9 on localhost is almost certainly closed; either way this
        // must return without panicking.
        send_completion("127.0.0.1:9", Path::new("/tmp/out.json"));
    }
}
