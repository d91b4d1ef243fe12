//! Playwright driver session
//!
//! One `node` process runs an embedded driver script that launches a single
//! browser and serves shot requests as newline-delimited JSON on stdin.
//! Replies carry the request id, so several shots can be in flight on the
//! same browser. The session is acquired once with [`PlaywrightSession::launch`]
//! and released with [`PlaywrightSession::shutdown`].
//!
//! A single writer task owns the driver's stdin and writes each request as
//! one whole line, so dropping an in-flight capture never leaves a partial
//! frame on the pipe.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command as TokioCommand};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use async_trait::async_trait;
use routeshot_common::{AuthFixture, Error, GlobalState, Result};

use super::{BrowserController, BrowserError, ShotRequest};

const DRIVER_CONFIG_ENV: &str = "ROUTESHOT_DRIVER_CONFIG";

const SHUTDOWN_FRAME: &[u8] = b"{\"type\":\"shutdown\"}\n";

const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const config = JSON.parse(process.env.ROUTESHOT_DRIVER_CONFIG);

function reply(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

async function inject(page, key, value) {
  await page.evaluate(([k, v]) => window.localStorage.setItem(k, v), [key, JSON.stringify(value)]);
}

async function shoot(browser, req) {
  const context = await browser.newContext({ viewport: { width: req.width, height: req.height } });
  try {
    const page = await context.newPage();
    try {
      await page.goto(req.url, { waitUntil: 'networkidle', timeout: config.timeoutMs });
      let injected = false;
      if (req.auth !== null) {
        await inject(page, config.authKey, req.auth);
        injected = true;
      }
      if (req.globalState !== null) {
        await inject(page, config.stateKey, req.globalState);
        injected = true;
      }
      if (injected) {
        await page.reload({ waitUntil: 'networkidle', timeout: config.timeoutMs });
      }
      await page.screenshot({ path: req.outputPath, fullPage: true });
    } finally {
      await page.close();
    }
  } finally {
    await context.close();
  }
}

(async () => {
  const browser = await playwright[config.engine].launch({ headless: config.headless });
  const rl = readline.createInterface({ input: process.stdin });

  rl.on('line', (line) => {
    let req;
    try {
      req = JSON.parse(line);
    } catch (error) {
      reply({ id: null, ok: false, error: 'invalid request: ' + error.message });
      return;
    }
    if (req.type === 'shutdown') {
      rl.close();
      return;
    }
    shoot(browser, req).then(
      () => reply({ id: req.id, ok: true }),
      (error) => reply({ id: req.id, ok: false, error: error.message, timeout: error.name === 'TimeoutError' }),
    );
  });

  rl.on('close', async () => {
    await browser.close();
    process.exit(0);
  });

  reply({ ready: true });
})().catch((error) => {
  reply({ ready: false, error: error.message });
  process.exit(1);
});
"#;

static CONNECTION_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"net::ERR_(CONNECTION_REFUSED|CONNECTION_RESET|CONNECTION_CLOSED|CONNECTION_FAILED|NAME_NOT_RESOLVED|ADDRESS_UNREACHABLE|INTERNET_DISCONNECTED)|NS_ERROR_(CONNECTION_REFUSED|UNKNOWN_HOST|NET_RESET)|Could not connect to (the )?server|ECONNREFUSED",
    )
    .expect("connection failure pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Chromium => "chromium",
            Engine::Firefox => "firefox",
            Engine::Webkit => "webkit",
        }
    }
}

/// Configuration for the driver session
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Node executable used to run the driver
    pub node_binary: PathBuf,

    /// Project root; `playwright` is resolved from its `node_modules`
    pub working_dir: PathBuf,

    pub engine: Engine,
    pub headless: bool,
    pub navigation_timeout_ms: u64,

    /// How long to wait for the browser to come up
    pub launch_timeout: Duration,

    /// localStorage key holding the auth fixture
    pub auth_storage_key: String,

    /// localStorage key holding the global state bag
    pub global_state_storage_key: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            working_dir: PathBuf::from("."),
            engine: Engine::Chromium,
            headless: true,
            navigation_timeout_ms: 30_000,
            launch_timeout: Duration::from_secs(60),
            auth_storage_key: "routeshot:auth".to_string(),
            global_state_storage_key: "routeshot:global-state".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DriverSettings<'a> {
    engine: &'a str,
    headless: bool,
    timeout_ms: u64,
    auth_key: &'a str,
    state_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DriverRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    id: u64,
    url: &'a str,
    width: u32,
    height: u32,
    auth: Option<&'a AuthFixture>,
    global_state: Option<&'a GlobalState>,
    output_path: &'a Path,
}

/// Greeting or reply line from the driver
#[derive(Debug, Deserialize)]
struct DriverReply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<DriverReply>>>>;

/// A running driver process with one launched browser
pub struct PlaywrightSession {
    config: PlaywrightConfig,
    child: Option<Child>,
    frames: mpsc::UnboundedSender<Vec<u8>>,
    pending: Pending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    _script_dir: TempDir,
}

impl PlaywrightSession {
    /// Check that Playwright is installed for the project
    pub fn check_playwright_installed(working_dir: &Path) -> Result<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(Error::Browser(
                "Playwright not found. Install with: npx playwright install".to_string(),
            )),
        }
    }

    /// Spawn the driver and wait until its browser is up.
    pub async fn launch(config: PlaywrightConfig) -> Result<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("routeshot-driver.js");
        tokio::fs::write(&script_path, DRIVER_SCRIPT).await?;

        let settings = serde_json::to_string(&DriverSettings {
            engine: config.engine.as_str(),
            headless: config.headless,
            timeout_ms: config.navigation_timeout_ms,
            auth_key: &config.auth_storage_key,
            state_key: &config.global_state_storage_key,
        })?;

        info!("Launching {} driver", config.engine.as_str());

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.working_dir)
            .env(DRIVER_CONFIG_ENV, settings)
            .env("NODE_PATH", config.working_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Browser(format!(
                    "failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Browser("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Browser("driver stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        let line = timeout(config.launch_timeout, lines.next_line())
            .await
            .map_err(|_| {
                Error::Browser(format!(
                    "driver not ready after {}s",
                    config.launch_timeout.as_secs()
                ))
            })??
            .ok_or_else(|| Error::Browser("driver exited before it was ready".to_string()))?;

        let greeting: DriverReply = serde_json::from_str(&line)
            .map_err(|e| Error::Browser(format!("unexpected driver greeting {:?}: {}", line, e)))?;
        if !greeting.ready {
            return Err(Error::Browser(
                greeting
                    .error
                    .unwrap_or_else(|| "driver failed to start".to_string()),
            ));
        }

        info!("Driver ready (pid: {:?})", child.id());

        let pending: Pending = Arc::default();
        let reader = tokio::spawn(dispatch_replies(lines, pending.clone()));
        let (frames, queue) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_frames(stdin, queue, pending.clone()));

        Ok(Self {
            config,
            child: Some(child),
            frames,
            pending,
            next_id: AtomicU64::new(1),
            reader,
            writer,
            _script_dir: script_dir,
        })
    }

    /// Close the browser and wait for the driver to exit.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down driver");

        let Self {
            child,
            frames,
            reader,
            writer,
            ..
        } = self;

        if frames.send(SHUTDOWN_FRAME.to_vec()).is_err() {
            debug!("Driver stdin already closed");
        }
        // Closing the queue lets the writer drain and close stdin
        drop(frames);
        if timeout(Duration::from_secs(5), writer).await.is_err() {
            warn!("Driver stdin writer did not finish");
        }

        if let Some(mut child) = child {
            match timeout(Duration::from_secs(5), child.wait()).await {
                Ok(status) => debug!("Driver exited with {}", status?),
                Err(_) => terminate(&mut child).await?,
            }
        }

        reader.abort();
        Ok(())
    }
}

/// SIGTERM first, then a hard kill if the driver lingers.
async fn terminate(child: &mut Child) -> Result<()> {
    warn!("Driver did not exit on shutdown, terminating");

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && timeout(Duration::from_millis(500), child.wait()).await.is_ok()
            {
                return Ok(());
            }
        }
    }

    child.kill().await?;
    Ok(())
}

/// One newline-terminated request line
fn frame<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    Ok(line)
}

async fn write_frames<W>(mut sink: W, mut queue: mpsc::UnboundedReceiver<Vec<u8>>, pending: Pending)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = queue.recv().await {
        let written = match sink.write_all(&frame).await {
            Ok(()) => sink.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Driver stdin closed: {}", e);
            // No reply can arrive for requests that never reached the driver
            pending.lock().clear();
            return;
        }
    }
}

async fn dispatch_replies(mut lines: Lines<BufReader<ChildStdout>>, pending: Pending) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let reply: DriverReply = match serde_json::from_str(&line) {
                    Ok(reply) => reply,
                    Err(_) => {
                        debug!("driver: {}", line);
                        continue;
                    }
                };
                match reply.id.and_then(|id| pending.lock().remove(&id)) {
                    Some(waiter) => {
                        let _ = waiter.send(reply);
                    }
                    None => warn!("Unmatched driver reply: {}", line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Driver output unreadable: {}", e);
                break;
            }
        }
    }

    // Dropping the senders wakes every waiter with a closed channel
    pending.lock().clear();
}

fn classify_failure(message: &str, timed_out: bool, timeout_ms: u64) -> BrowserError {
    if timed_out {
        BrowserError::Timeout(timeout_ms)
    } else if CONNECTION_FAILURE.is_match(message) {
        let first_line = message.lines().next().unwrap_or(message);
        BrowserError::Unreachable(first_line.to_string())
    } else {
        BrowserError::Failed(message.to_string())
    }
}

#[async_trait]
impl BrowserController for PlaywrightSession {
    async fn capture(&self, shot: &ShotRequest) -> std::result::Result<(), BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = DriverRequest {
            kind: "shot",
            id,
            url: &shot.url,
            width: shot.viewport.width,
            height: shot.viewport.height,
            auth: shot.auth_fixture.as_ref(),
            global_state: shot.global_state.as_ref(),
            output_path: &shot.output_path,
        };
        let line = frame(&request).map_err(|e| BrowserError::Driver(e.to_string()))?;

        let (waiter, reply) = oneshot::channel();
        self.pending.lock().insert(id, waiter);

        if self.frames.send(line).is_err() {
            self.pending.lock().remove(&id);
            return Err(BrowserError::Driver(
                "cannot send request: driver stdin closed".to_string(),
            ));
        }

        debug!(
            "Shot {} sent: {} at {}x{}",
            id, shot.url, shot.viewport.width, shot.viewport.height
        );

        let reply = reply
            .await
            .map_err(|_| BrowserError::Driver("driver exited mid-request".to_string()))?;

        if reply.ok {
            Ok(())
        } else {
            Err(classify_failure(
                reply.error.as_deref().unwrap_or("unknown driver failure"),
                reply.timeout,
                self.config.navigation_timeout_ms,
            ))
        }
    }
}
