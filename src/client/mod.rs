use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub mod poller;
pub mod worker;

const USER_AGENT: &str = concat!("cooktui/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server address: {0}")]
    Address(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
}

/// Outcome of opening a page or link on the kiosk, mirroring the status
/// contract the cookbook server exposes: 2xx succeeds, 400 carries a
/// human-readable message, and anything else is ignored (a long-standing
/// server quirk, kept rather than papered over).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Opened,
    Rejected(String),
    Ignored(u16),
}

/// A command the server dequeued for this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Timer { seconds: u64 },
}

/// Browser-remote actions the kiosk exposes as plain GET endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    PageUp,
    PageDown,
    ScrollUp,
    ScrollDown,
    ZoomIn,
    ZoomOut,
}

impl RemoteAction {
    pub fn path(&self) -> &'static str {
        match self {
            RemoteAction::PageUp => "/page_up",
            RemoteAction::PageDown => "/page_down",
            RemoteAction::ScrollUp => "/scroll_up",
            RemoteAction::ScrollDown => "/scroll_down",
            RemoteAction::ZoomIn => "/zoom_in",
            RemoteAction::ZoomOut => "/zoom_out",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommandPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Blocking HTTP client for the cookbook server. Cheap to clone; the
/// worker and the command poller each hold their own copy so a slow poll
/// never delays an interactive request.
#[derive(Clone)]
pub struct ServerClient {
    http: Client,
    base: Url,
}

impl ServerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    /// POST the search form to `/find`, optionally scoped to a tag via a
    /// query parameter. The server replies with a pre-rendered listing
    /// fragment; the body is returned without a status check because that
    /// is how the page consumed it.
    pub fn find(&self, search: &str, tag: Option<&str>) -> Result<String, ClientError> {
        let mut url = self.endpoint("/find")?;
        if let Some(tag) = tag {
            url.query_pairs_mut().append_pair("tag", tag);
        }
        let response = self.http.post(url).form(&[("search", search)]).send()?;
        Ok(response.text()?)
    }

    /// GET the home page: the server-rendered recipe listing plus the tag
    /// strip, used to seed the UI at startup and after a reload.
    pub fn fetch_home(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.endpoint("/")?).send()?;
        let status = response.status();
        let body = response.text()?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::UnexpectedStatus { status, body })
        }
    }

    /// GET an arbitrary kiosk path, classifying the response per the
    /// alert-overlay contract.
    pub fn open_page(&self, path: &str) -> Result<FetchOutcome, ClientError> {
        let response = self.http.get(self.endpoint(path)?).send()?;
        classify(response)
    }

    /// Ask the kiosk to open an external link in its browser.
    pub fn open_link(&self, link: &str) -> Result<FetchOutcome, ClientError> {
        let mut url = self.endpoint("/open_link")?;
        url.query_pairs_mut().append_pair("url", link);
        let response = self.http.get(url).send()?;
        classify(response)
    }

    /// Fire-and-forget GET; status and body are discarded.
    pub fn trigger(&self, path: &str) -> Result<(), ClientError> {
        self.http.get(self.endpoint(path)?).send()?;
        Ok(())
    }

    /// One iteration of the command poll: fetch `/commands` and decode
    /// whatever the server dequeued. An empty object means no command is
    /// pending.
    pub fn poll_command(&self) -> Result<Option<RemoteCommand>, ClientError> {
        let response = self.http.get(self.endpoint("/commands")?).send()?;
        let payload: CommandPayload = response.json()?;
        Ok(decode_command(payload))
    }

    /// Queue a kitchen timer on the server, the same way the voice
    /// assistant posts one.
    pub fn queue_timer(&self, minutes: f64) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint("/commands")?)
            .json(&serde_json::json!({ "action": "timer", "duration": minutes }))
            .send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::UnexpectedStatus {
                status,
                body: response.text()?,
            })
        }
    }

    pub fn remote(&self, action: RemoteAction) -> Result<FetchOutcome, ClientError> {
        self.open_page(action.path())
    }
}

fn classify(response: Response) -> Result<FetchOutcome, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(FetchOutcome::Opened)
    } else if status == StatusCode::BAD_REQUEST {
        Ok(FetchOutcome::Rejected(response.text()?))
    } else {
        Ok(FetchOutcome::Ignored(status.as_u16()))
    }
}

fn decode_command(payload: CommandPayload) -> Option<RemoteCommand> {
    match payload.action.as_deref() {
        Some("timer") => {
            let minutes = payload.duration?;
            if !minutes.is_finite() || minutes <= 0.0 {
                tracing::warn!(minutes, "discarding timer command with bad duration");
                return None;
            }
            Some(RemoteCommand::Timer {
                seconds: (minutes * 60.0).round() as u64,
            })
        }
        Some(other) => {
            tracing::debug!(action = other, "ignoring unknown command");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn decode(raw: &str) -> Option<RemoteCommand> {
        let payload: CommandPayload = serde_json::from_str(raw).expect("valid json");
        decode_command(payload)
    }

    #[test]
    fn empty_command_body_decodes_to_none() {
        assert_eq!(decode("{}"), None);
    }

    #[test]
    fn timer_command_converts_minutes_to_seconds() {
        assert_eq!(
            decode(r#"{"action": "timer", "duration": 2.5}"#),
            Some(RemoteCommand::Timer { seconds: 150 })
        );
    }

    #[test]
    fn unknown_and_malformed_commands_are_dropped() {
        assert_eq!(decode(r#"{"action": "dance"}"#), None);
        assert_eq!(decode(r#"{"action": "timer"}"#), None);
        assert_eq!(decode(r#"{"action": "timer", "duration": -3}"#), None);
    }

    #[test]
    fn remote_actions_map_to_kiosk_paths() {
        assert_eq!(RemoteAction::PageUp.path(), "/page_up");
        assert_eq!(RemoteAction::ZoomOut.path(), "/zoom_out");
    }

    /// Minimal loopback HTTP listener: accepts one connection, reads the
    /// full request, sends a canned response, and hands the raw request
    /// back for assertions.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("binding loopback listener");
        let addr = listener.local_addr().expect("reading local addr");
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accepting connection");
            let mut raw = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).expect("reading request");
                raw.extend_from_slice(&chunk[..n]);
                if let Some(header_end) = find_blank_line(&raw) {
                    let headers = String::from_utf8_lossy(&raw[..header_end]).to_string();
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            let value = lower.strip_prefix("content-length:")?;
                            value.trim().parse::<usize>().ok()
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            stream
                .write_all(response.as_bytes())
                .expect("writing response");
            String::from_utf8_lossy(&raw).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    fn find_blank_line(raw: &[u8]) -> Option<usize> {
        raw.windows(4).position(|window| window == b"\r\n\r\n")
    }

    fn test_client(base: &str) -> ServerClient {
        ServerClient::new(base, Duration::from_secs(2)).expect("building client")
    }

    #[test]
    fn find_posts_the_form_with_the_tag_query() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<ul>soup</ul>",
        );
        let body = test_client(&base)
            .find("pasta", Some("dinner"))
            .expect("search request");
        assert_eq!(body, "<ul>soup</ul>");

        let request = server.join().expect("server thread");
        assert!(request.starts_with("POST /find?tag=dinner HTTP/1.1"));
        assert!(request.ends_with("search=pasta"));
    }

    #[test]
    fn open_page_surfaces_the_400_body_as_a_rejection() {
        let (base, server) = serve_once(
            "HTTP/1.1 400 BAD REQUEST\r\nContent-Length: 14\r\nConnection: close\r\n\r\nno such recipe",
        );
        let outcome = test_client(&base)
            .open_page("/recipes/42")
            .expect("page request");
        assert_matches!(outcome, FetchOutcome::Rejected(message) if message == "no such recipe");
        server.join().expect("server thread");
    }

    #[test]
    fn open_page_ignores_other_error_statuses() {
        let (base, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let outcome = test_client(&base)
            .open_page("/recipes/42")
            .expect("page request");
        assert_eq!(outcome, FetchOutcome::Ignored(503));
        server.join().expect("server thread");
    }

    #[test]
    fn open_link_percent_encodes_the_url_parameter() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let outcome = test_client(&base)
            .open_link("https://example.com/a recipe")
            .expect("link request");
        assert_eq!(outcome, FetchOutcome::Opened);

        let request = server.join().expect("server thread");
        assert!(request.contains("GET /open_link?url=https%3A%2F%2Fexample.com%2Fa+recipe"));
    }

    #[test]
    fn poll_command_reads_the_queued_timer() {
        let (base, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 34\r\nConnection: close\r\n\r\n{\"action\": \"timer\", \"duration\": 2}",
        );
        let command = test_client(&base).poll_command().expect("poll request");
        assert_eq!(command, Some(RemoteCommand::Timer { seconds: 120 }));
        server.join().expect("server thread");
    }
}
