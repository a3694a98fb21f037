use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;

use crate::models::DownloadProgress;
use crate::services::process_supervisor::ProcessSignaller;
use crate::services::ui_bridge::{ProgressSink, RetryDecision, RetryPrompt, UserPrompt};

type Handler = dyn Fn(&str, usize) -> (u16, Vec<u8>) + Send + Sync;

/// Loopback HTTP server for download tests. The handler gets the request
/// path and the zero-based hit index and returns a status and body.
pub struct TestServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, usize) -> (u16, Vec<u8>) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let port = listener.local_addr().expect("local addr").port();
        let hits = Arc::new(AtomicUsize::new(0));
        let handler: Arc<Handler> = Arc::new(handler);

        let counter = hits.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    continue;
                };
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let handler = handler.clone();
                thread::spawn(move || {
                    let _ = handle_connection(stream, index, handler.as_ref());
                });
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            hits,
        }
    }

    pub fn serving(body: Vec<u8>) -> Self {
        Self::start(move |_, _| (200, body.clone()))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn handle_connection(
    mut stream: TcpStream,
    index: usize,
    handler: &Handler,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    loop {
        let mut header = String::new();
        let read = reader.read_line(&mut header)?;
        if read == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }
    let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
    let (code, body) = handler(&path, index);
    let head = format!(
        "HTTP/1.1 {code} STATUS\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes())?;
    for chunk in body.chunks(4096) {
        stream.write_all(chunk)?;
        stream.flush()?;
    }
    Ok(())
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Option<DownloadProgress>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Option<DownloadProgress>> {
        self.events.lock().expect("sink lock").clone()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events().into_iter().flatten().map(|p| p.percent).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn publish(&self, progress: Option<DownloadProgress>) {
        self.events.lock().expect("sink lock").push(progress);
    }
}

/// Answers retry prompts from a script, then cancels.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<Vec<RetryDecision>>,
    asked: AtomicUsize,
    opened: Mutex<Vec<String>>,
    accept_pages: bool,
}

impl ScriptedPrompt {
    pub fn answering(answers: Vec<RetryDecision>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().rev().collect()),
            ..Self::default()
        }
    }

    pub fn accepting_pages() -> Self {
        Self {
            accept_pages: true,
            ..Self::default()
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

#[async_trait]
impl UserPrompt for ScriptedPrompt {
    async fn retry_download(&self, _prompt: RetryPrompt<'_>) -> RetryDecision {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .expect("answers lock")
            .pop()
            .unwrap_or(RetryDecision::Cancel)
    }

    async fn offer_download_page(&self, _title: &str, _message: &str, _url: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.accept_pages
    }

    fn open_external(&self, url: &str) {
        self.opened.lock().expect("opened lock").push(url.to_string());
    }
}

/// Records signals instead of delivering them. The stray sweep is counted
/// and never touches real processes.
#[derive(Default)]
pub struct RecordingSignaller {
    terminated: Mutex<Vec<u32>>,
    killed: Mutex<Vec<u32>>,
    sweeps: AtomicUsize,
}

impl RecordingSignaller {
    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().expect("terminated lock").clone()
    }

    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().expect("killed lock").clone()
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

impl ProcessSignaller for RecordingSignaller {
    fn terminate(&self, pid: u32) -> bool {
        self.terminated.lock().expect("terminated lock").push(pid);
        true
    }

    fn kill(&self, pid: u32) -> bool {
        self.killed.lock().expect("killed lock").push(pid);
        true
    }

    fn sweep_strays(&self) -> usize {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        0
    }
}

pub fn temp_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("ghostlite-{label}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
