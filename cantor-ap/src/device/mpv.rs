//! mpv driver over the JSON IPC socket
//!
//! Start mpv with `--idle --input-ipc-server=<socket>` and point
//! `device.mpv_socket` at the same path. Each request carries a
//! `request_id`; replies are matched on it and asynchronous event lines
//! (`{"event": ...}`) are skipped.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use super::driver::AudioDriver;
use crate::error::{Error, Result};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    request_id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

pub struct MpvIpcDriver {
    connection: Mutex<Connection>,
    next_request_id: AtomicU64,
}

impl MpvIpcDriver {
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            Error::Device(format!(
                "cannot connect to mpv IPC socket {}: {}",
                socket_path.display(),
                e
            ))
        })?;
        info!("Connected to mpv at {}", socket_path.display());

        let (read_half, writer) = stream.into_split();
        Ok(Self {
            connection: Mutex::new(Connection {
                lines: BufReader::new(read_half).lines(),
                writer,
            }),
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Send one command and wait for its reply's `data`
    async fn request(&self, command: Vec<Value>) -> Result<Value> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let mut line = json!({ "command": command, "request_id": request_id }).to_string();
        line.push('\n');

        let mut conn = self.connection.lock().await;
        trace!("mpv <- {}", line.trim_end());
        conn.writer.write_all(line.as_bytes()).await?;

        tokio::time::timeout(REPLY_TIMEOUT, Self::read_reply(&mut conn, request_id))
            .await
            .map_err(|_| Error::Device(format!("mpv did not answer request {}", request_id)))?
    }

    async fn read_reply(conn: &mut Connection, request_id: u64) -> Result<Value> {
        loop {
            let Some(line) = conn.lines.next_line().await? else {
                return Err(Error::Device("mpv closed the IPC connection".to_string()));
            };
            trace!("mpv -> {}", line);

            let reply: Reply = serde_json::from_str(&line)?;
            if let Some(event) = reply.event {
                debug!("mpv event: {}", event);
                continue;
            }
            if reply.request_id != Some(request_id) {
                continue;
            }

            return match reply.error.as_deref() {
                Some("success") | None => Ok(reply.data.unwrap_or(Value::Null)),
                Some(err) => Err(Error::Device(format!("mpv request {} failed: {}", request_id, err))),
            };
        }
    }
}

#[async_trait]
impl AudioDriver for MpvIpcDriver {
    async fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.request(vec![json!("set_property_string"), json!(name), json!(value)])
            .await
            .map(|_| ())
    }

    async fn get_property(&self, name: &str) -> Result<String> {
        match self
            .request(vec![json!("get_property_string"), json!(name)])
            .await?
        {
            Value::String(s) => Ok(s),
            Value::Null => Err(Error::Device(format!("mpv property '{}' unavailable", name))),
            other => Ok(other.to_string()),
        }
    }

    async fn execute_command(&self, args: &[&str]) -> Result<()> {
        let command = args.iter().map(|a| json!(a)).collect();
        self.request(command).await.map(|_| ())
    }

    /// Runtime options are exposed as properties over IPC
    async fn set_option(&self, name: &str, value: &str) -> Result<()> {
        self.set_property(name, value).await
    }
}
