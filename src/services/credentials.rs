use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::errors::Result;
use crate::models::Account;
use crate::utils::file::write_atomic;

pub const CREDENTIALS_FILE: &str = "credentials.properties";
const MAX_REQUEST_HEAD: usize = 8 * 1024;

#[derive(Serialize)]
struct CredentialPayload<'a> {
    username: &'a str,
    password: &'a str,
}

/// Loopback listener on an OS-assigned port that answers exactly one request
/// with the credentials as JSON, then closes. It stays open until claimed.
pub struct CredentialServer {
    port: u16,
    handle: JoinHandle<()>,
}

impl CredentialServer {
    pub async fn start(username: String, password: String) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).await?;
        let port = listener.local_addr()?.port();

        let handle = tokio::spawn(async move {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    if let Err(err) = serve_once(stream, &username, &password).await {
                        tracing::warn!(port, %peer, error = %err, "credential handoff failed");
                    } else {
                        tracing::info!(port, "credentials handed off");
                    }
                }
                Err(err) => tracing::warn!(port, error = %err, "credential listener failed"),
            }
        });

        tracing::debug!(port, "credential server listening");
        Ok(Self { port, handle })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolves once the listener has closed.
    pub fn into_handle(self) -> JoinHandle<()> {
        self.handle
    }
}

async fn serve_once(mut stream: TcpStream, username: &str, password: &str) -> std::io::Result<()> {
    let mut head = Vec::with_capacity(512);
    let mut buf = [0u8; 512];
    while head.len() < MAX_REQUEST_HEAD && !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let read = stream.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        head.extend_from_slice(&buf[..read]);
    }

    let body = serde_json::to_vec(&CredentialPayload { username, password })
        .map_err(std::io::Error::other)?;
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    stream.shutdown().await
}

pub fn credentials_path(runelite_dir: &Path) -> PathBuf {
    runelite_dir.join(CREDENTIALS_FILE)
}

pub fn render_credentials(account: &Account) -> String {
    format!(
        "#Do not share this file\n#{}\nJX_CHARACTER_ID={}\nJX_SESSION_ID={}\nJX_DISPLAY_NAME={}\n",
        Local::now().format("%a %b %d %Y %H:%M:%S %z"),
        account.account_id,
        account.session_id,
        account.display_name
    )
}

/// Overwrites the client's `credentials.properties` with `account`'s session.
pub fn write_session_credentials(runelite_dir: &Path, account: &Account) -> Result<PathBuf> {
    fs::create_dir_all(runelite_dir)?;
    let path = credentials_path(runelite_dir);
    write_atomic(&path, render_credentials(account).as_bytes())?;
    tracing::info!(account_id = %account.account_id, "wrote session credentials");
    Ok(path)
}
