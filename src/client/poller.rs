use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::client::worker::ServerEvent;
use crate::client::{RemoteCommand, ServerClient};

/// Handle for the background command poll loop. Dropping it (or calling
/// [`PollerHandle::stop`]) shuts the loop down; the per-request HTTP
/// timeout bounds how long that can take.
pub struct PollerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ask the server for a pending command once per `interval`, forever.
/// Each iteration performs exactly one GET and then waits out the full
/// interval regardless of how long the request took. A failed fetch or
/// an unreadable body is logged and the loop moves on.
pub fn spawn(
    client: ServerClient,
    interval: Duration,
    events: Sender<ServerEvent>,
) -> Result<PollerHandle> {
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let thread = thread::Builder::new()
        .name("cooktui-poller".into())
        .spawn(move || loop {
            match client.poll_command() {
                Ok(Some(RemoteCommand::Timer { seconds })) => {
                    if events.send(ServerEvent::TimerStarted { seconds }).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%err, "command poll failed; will retry next interval");
                }
            }
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        })
        .context("spawning command poller thread")?;
    Ok(PollerHandle {
        stop: Some(stop_tx),
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn client_for(base: &str) -> ServerClient {
        ServerClient::new(base, Duration::from_secs(2)).expect("building client")
    }

    #[test]
    fn poller_stops_when_the_handle_is_dropped() {
        // Nothing is listening on this address, so every poll fails fast;
        // the loop must keep running until the stop signal, then exit.
        let client = client_for("http://127.0.0.1:9");
        let (events_tx, _events_rx) = unbounded();
        let handle = spawn(client, Duration::from_millis(10), events_tx).expect("spawning poller");
        drop(handle); // joins internally; a hang here fails the test via timeout
    }

    #[test]
    fn poller_forwards_a_queued_timer_command() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("binding listener");
        let addr = listener.local_addr().expect("local addr");
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accepting poll");
            let mut scratch = [0u8; 1024];
            let _ = stream.read(&mut scratch);
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 33\r\nConnection: close\r\n\r\n{\"action\":\"timer\",\"duration\":1.5}",
                )
                .expect("writing poll response");
        });

        let (events_tx, events_rx) = unbounded();
        let mut handle = spawn(
            client_for(&format!("http://{addr}")),
            Duration::from_millis(50),
            events_tx,
        )
        .expect("spawning poller");

        let event = events_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("timer event");
        assert!(matches!(event, ServerEvent::TimerStarted { seconds: 90 }));

        handle.stop();
        server.join().expect("server thread");
    }
}
