//! Common test utilities and fixtures
//!
//! Shared command builder, fixture paths and a minimal HTTP stub that
//! stands in for a hosted provider.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use assert_cmd::Command;
use parking_lot::Mutex;

/// Variables that would let a developer's own setup leak into a test run
const AMBIENT_ENV: [&str; 8] = [
    "REPERSONA_API_KEY",
    "REPERSONA_CONFIG",
    "REPERSONA_PROVIDER",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "DEEPSEEK_API_KEY",
    "RUST_LOG",
];

/// Get a command for the repersona binary with HOME and the working
/// directory pointed at `home` and no API keys in the environment
pub fn repersona_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("repersona").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"));
    for var in AMBIENT_ENV {
        cmd.env_remove(var);
    }
    cmd
}

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get a path to a specific fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// Complete persona flags for create/chat
pub fn persona_flags() -> Vec<&'static str> {
    vec![
        "--tradition",
        "Islam",
        "--denomination",
        "Shia",
        "--context",
        "Iranian diaspora in Uppsala",
        "--demographics",
        "Woman, 34, dentist",
        "--knowledge",
        "medium",
        "--engagement",
        "low",
        "--attitude",
        "neutral",
    ]
}

// ─────────────────────────────────────────────────────────────────
// HTTP stub
// ─────────────────────────────────────────────────────────────────

/// One request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Answers each connection with the next canned response; the last one
/// repeats once the list runs out
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        thread::spawn(move || {
            for (index, stream) in listener.incoming().enumerate() {
                let Ok(stream) = stream else { continue };
                let (status, body) = responses
                    .get(index)
                    .or_else(|| responses.last())
                    .cloned()
                    .unwrap_or((500, String::new()));
                serve_one(stream, status, &body, &recorded);
            }
        });

        Self { addr, requests }
    }

    /// Base URL including a version segment, e.g. `http://127.0.0.1:1234/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

/// Read one request, record it, then answer. Recording happens first so a
/// test never inspects the log before the client has its reply.
fn serve_one(
    stream: TcpStream,
    status: u16,
    body: &str,
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut buf = vec![0u8; length];
    reader.read_exact(&mut buf).ok()?;

    recorded.lock().push(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&buf).into_owned(),
    });

    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let mut stream = stream;
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()
}

/// OpenAI chat-completions success body
pub fn openai_reply(text: &str) -> (u16, String) {
    let body = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    });
    (200, body.to_string())
}

/// Anthropic messages success body
pub fn anthropic_reply(text: &str) -> (u16, String) {
    let body = serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn"
    });
    (200, body.to_string())
}

/// Gemini generateContent success body
pub fn gemini_reply(text: &str) -> (u16, String) {
    let body = serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    });
    (200, body.to_string())
}

/// Config file pointing one provider section at the stub
pub fn write_stub_config(dir: &Path, section: &str, base_url: &str, max_retries: u32) -> PathBuf {
    let path = dir.join("stub.toml");
    std::fs::write(
        &path,
        format!(
            "[{section}]\nbase_url = \"{base_url}\"\ntimeout_secs = 10\nmax_retries = {max_retries}\n\n[conversation]\nexport_dir = \"{export}\"\n",
            section = section,
            base_url = base_url,
            max_retries = max_retries,
            export = dir.join("exports").display(),
        ),
    )
    .unwrap();
    path
}
