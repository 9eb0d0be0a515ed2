//! Playwright browser automation
//!
//! Each session is a Node process running `driver.js`. Commands are sent as
//! JSON lines on stdin; every command gets exactly one JSON line back.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AuditError, AuditResult};
use crate::model::Violation;
use crate::page::{AccessibilityScanner, Navigator, Page};

const DRIVER_SCRIPT: &str = include_str!("driver.js");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(AuditError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Timeout handed to `page.goto`
    pub navigation_timeout_ms: u64,

    /// Timeout for attribute and text lookups
    pub query_timeout_ms: u64,

    /// Directory whose `node_modules` holds playwright and @axe-core/playwright
    pub node_project_dir: PathBuf,

    /// How long to wait for the browser to launch
    pub startup_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 30_000,
            query_timeout_ms: 5_000,
            node_project_dir: PathBuf::from("."),
            startup_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct DriverOptions<'a> {
    browser: &'a str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    navigation_timeout_ms: u64,
    query_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl DriverIo {
    async fn read_reply(&mut self) -> AuditResult<DriverReply> {
        match self.stdout.next_line().await? {
            Some(line) => Ok(serde_json::from_str(&line)?),
            None => Err(AuditError::Driver("driver process exited".to_string())),
        }
    }
}

/// One browser page owned by a dedicated driver process
pub struct PlaywrightSession {
    io: Mutex<DriverIo>,
    child: Child,
    _script_dir: Option<tempfile::TempDir>,
}

impl PlaywrightSession {
    /// Spawn the driver and wait until the browser is up
    pub async fn launch(config: &PlaywrightConfig) -> AuditResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let options = serde_json::to_string(&DriverOptions {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            navigation_timeout_ms: config.navigation_timeout_ms,
            query_timeout_ms: config.query_timeout_ms,
        })?;

        debug!("Launching Playwright driver: {}", script_path.display());

        let child = TokioCommand::new("node")
            .arg(&script_path)
            .arg(options)
            .current_dir(&config.node_project_dir)
            .env("NODE_PATH", config.node_project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AuditError::Playwright(format!("failed to spawn node: {}", e)))?;

        Self::attach(child, Some(script_dir), config.startup_timeout).await
    }

    /// Take over a spawned driver and wait for its ready line
    async fn attach(
        mut child: Child,
        script_dir: Option<tempfile::TempDir>,
        startup_timeout: Duration,
    ) -> AuditResult<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AuditError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AuditError::Driver("driver stdout unavailable".to_string()))?;

        let mut io = DriverIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        };

        match tokio::time::timeout(startup_timeout, io.read_reply()).await {
            Ok(Ok(reply)) if reply.ok => {}
            Ok(Ok(reply)) => {
                return Err(AuditError::Playwright(
                    reply.error.unwrap_or_else(|| "browser failed to start".to_string()),
                ))
            }
            Ok(Err(e)) => return Err(AuditError::Playwright(format!("browser failed to start: {}", e))),
            Err(_) => {
                return Err(AuditError::Playwright(format!(
                    "browser did not start within {:?}",
                    startup_timeout
                )))
            }
        }

        Ok(Self {
            io: Mutex::new(io),
            child,
            _script_dir: script_dir,
        })
    }

    async fn request(&self, mut command: Value) -> AuditResult<Value> {
        let query = describe(&command);
        let mut io = self.io.lock().await;

        let id = io.next_id;
        io.next_id += 1;
        command["id"] = json!(id);

        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        let reply = loop {
            let reply = io.read_reply().await?;
            if reply.id == Some(id) {
                break reply;
            }
            debug!("Discarding stale driver reply {:?}", reply.id);
        };

        if reply.ok {
            Ok(reply.value)
        } else {
            Err(AuditError::Query {
                query,
                reason: reply.error.unwrap_or_else(|| "unknown driver error".to_string()),
            })
        }
    }

    /// Navigate to an absolute address
    pub async fn goto(&self, address: &str) -> AuditResult<()> {
        self.request(json!({ "op": "goto", "url": address }))
            .await
            .map(|_| ())
            .map_err(|e| AuditError::Navigation {
                address: address.to_string(),
                reason: e.to_string(),
            })
    }

    /// Close the browser and reap the driver process
    pub async fn close(mut self) -> AuditResult<()> {
        if let Err(e) = self.request(json!({ "op": "close" })).await {
            debug!("Driver close request failed: {}", e);
        }

        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                if !status.success() {
                    warn!("Playwright driver exited with {}", status);
                }
            }
            Err(_) => {
                warn!("Playwright driver did not exit, terminating");
                self.terminate();
            }
        }
        Ok(())
    }

    fn terminate(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        let _ = self.child.start_kill();
    }
}

fn describe(command: &Value) -> String {
    let op = command.get("op").and_then(Value::as_str).unwrap_or("?");
    match command.get("selector").and_then(Value::as_str) {
        Some(selector) => format!("{}:{}", op, selector),
        None => op.to_string(),
    }
}

#[async_trait]
impl Page for PlaywrightSession {
    async fn title(&self) -> AuditResult<String> {
        let value = self.request(json!({ "op": "title" })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn count(&self, selector: &str) -> AuditResult<usize> {
        let value = self.request(json!({ "op": "count", "selector": selector })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn attribute(&self, selector: &str, index: usize, name: &str) -> AuditResult<Option<String>> {
        let value = self
            .request(json!({ "op": "attribute", "selector": selector, "index": index, "name": name }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn inner_text(&self, selector: &str) -> AuditResult<String> {
        let value = self.request(json!({ "op": "innerText", "selector": selector })).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl AccessibilityScanner for PlaywrightSession {
    async fn analyze(&self, tags: &[String]) -> AuditResult<Vec<Violation>> {
        let value = self.request(json!({ "op": "axe", "tags": tags })).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Opens one Playwright session per page
pub struct PlaywrightNavigator {
    config: PlaywrightConfig,
}

impl PlaywrightNavigator {
    pub fn new(config: PlaywrightConfig) -> AuditResult<Self> {
        Self::check_playwright_installed(&config)?;
        info!(
            "Using Playwright {} (headless: {})",
            config.browser.as_str(),
            config.headless
        );
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(config: &PlaywrightConfig) -> AuditResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.node_project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(AuditError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl Navigator for PlaywrightNavigator {
    type Page = PlaywrightSession;

    async fn open(&self, address: &str) -> AuditResult<PlaywrightSession> {
        let session = PlaywrightSession::launch(&self.config).await?;
        debug!("Navigating to {}", address);

        if let Err(e) = session.goto(address).await {
            if let Err(close_err) = session.close().await {
                debug!("Driver cleanup failed: {}", close_err);
            }
            return Err(e);
        }
        Ok(session)
    }

    async fn release(&self, page: PlaywrightSession) {
        if let Err(e) = page.close().await {
            warn!("Failed to close Playwright session: {}", e);
        }
    }
}
