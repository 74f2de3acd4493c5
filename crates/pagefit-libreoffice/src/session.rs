//! Session manager: connect to a listening LibreOffice, or launch one.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use libreoffice_urp::methods::x_desktop;
use libreoffice_urp::{names, Bootstrap, Connection, UnoUrl};
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, trace, warn};

use crate::document::CalcDocument;
use crate::error::{Result, SessionError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2002;

/// Flags for a headless engine that never shows UI or restores sessions.
const LAUNCH_FLAGS: &[&str] = &[
    "--headless",
    "--invisible",
    "--nocrashreport",
    "--nodefault",
    "--nologo",
    "--nofirststartwizard",
    "--norestore",
    "--nolockcheck",
];

/// How long an owned engine gets to exit after `terminate()` before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[cfg(windows)]
const EXECUTABLE_NAMES: &[&str] = &["soffice.exe"];
#[cfg(not(windows))]
const EXECUTABLE_NAMES: &[&str] = &["soffice", "libreoffice"];

#[cfg(target_os = "linux")]
const KNOWN_LOCATIONS: &[&str] = &[
    "/usr/lib/libreoffice/program/soffice",
    "/usr/lib64/libreoffice/program/soffice",
    "/usr/local/lib/libreoffice/program/soffice",
    "/opt/libreoffice/program/soffice",
    "/snap/bin/libreoffice",
];
#[cfg(target_os = "macos")]
const KNOWN_LOCATIONS: &[&str] = &["/Applications/LibreOffice.app/Contents/MacOS/soffice"];
#[cfg(windows)]
const KNOWN_LOCATIONS: &[&str] = &[
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
];
#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
const KNOWN_LOCATIONS: &[&str] = &[];

// ============================================================================
// Configuration
// ============================================================================

/// The fixed local socket the engine listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    pub fn uno_url(&self) -> UnoUrl {
        UnoUrl::socket(self.host.clone(), self.port)
    }

    /// The `--accept=` argument that makes a launched engine listen here.
    pub fn accept_arg(&self) -> String {
        format!("--accept={}", self.uno_url().acceptor())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Bounded poll-connect schedule used after launching the engine.
///
/// [`SessionManager::acquire_session`] never waits on the endpoint for longer
/// than [`budget`](Self::budget) in total, however slowly the engine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Upper bound on a single connect-and-bootstrap attempt. Attempts are
    /// further cut short by whatever is left of the budget.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Deadline for all connect attempts of one acquisition, measured from
    /// the first one.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Configuration for [`SessionManager`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Path to the `soffice` executable. If None, searches PATH and the usual
    /// install locations.
    pub soffice_path: Option<PathBuf>,
    pub endpoint: Endpoint,
    pub retry: RetryPolicy,
    /// Extra arguments to pass to soffice.
    pub extra_args: Vec<String>,
}

// ============================================================================
// Executable lookup
// ============================================================================

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn search_path(name: &OsStr) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn known_locations() -> Vec<PathBuf> {
    let mut locations: Vec<PathBuf> = KNOWN_LOCATIONS.iter().map(PathBuf::from).collect();
    #[cfg(target_os = "linux")]
    {
        // Upstream tarballs install as /opt/libreoffice<version>.
        if let Ok(entries) = std::fs::read_dir("/opt") {
            let mut versioned: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_name().to_string_lossy().starts_with("libreoffice"))
                .map(|entry| entry.path().join("program").join("soffice"))
                .collect();
            versioned.sort();
            locations.extend(versioned.into_iter().rev());
        }
    }
    locations
}

/// Finds the engine executable: `override_path`, then PATH, then known
/// install locations.
///
/// An override that does not resolve is an error; the other sources are not
/// consulted in that case.
pub fn locate_soffice(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if is_executable(path) {
            return Ok(path.to_path_buf());
        }
        let bare_name = path.components().count() == 1;
        if bare_name {
            if let Some(found) = search_path(path.as_os_str()) {
                return Ok(found);
            }
        }
        return Err(SessionError::ToolNotFound(format!(
            "{} does not exist or is not executable",
            path.display()
        )));
    }

    EXECUTABLE_NAMES
        .iter()
        .find_map(|name| search_path(OsStr::new(name)))
        .or_else(|| known_locations().into_iter().find(|p| is_executable(p)))
        .ok_or_else(|| {
            SessionError::ToolNotFound(
                "install LibreOffice or put 'soffice' on PATH".to_string(),
            )
        })
}

// ============================================================================
// Session
// ============================================================================

/// Connection lifecycle, logged on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Failed => "failed",
        })
    }
}

/// Who is responsible for the engine process.
#[derive(Debug)]
pub enum EngineProcess {
    /// An engine that was already listening; left running on release.
    Borrowed,
    /// Launched by this session; shut down on release and killed on drop.
    Owned(Child),
}

/// A live URP connection with the Desktop resolved.
pub struct AutomationSession {
    conn: Connection,
    objects: Bootstrap,
    engine: EngineProcess,
}

impl AutomationSession {
    pub fn owns_engine(&self) -> bool {
        matches!(self.engine, EngineProcess::Owned(_))
    }

    /// Loads `path` hidden. The document must be closed before the session
    /// is released.
    pub async fn load_document(&mut self, path: &Path) -> Result<CalcDocument<'_>> {
        CalcDocument::load(&mut self.conn, &self.objects.desktop, path).await
    }

    async fn release(self) {
        let AutomationSession {
            mut conn,
            objects,
            engine,
        } = self;
        match engine {
            EngineProcess::Borrowed => {
                debug!("leaving shared engine running");
            }
            EngineProcess::Owned(mut child) => {
                match timeout(SHUTDOWN_GRACE, request_terminate(&mut conn, &objects.desktop)).await {
                    Ok(Ok(())) => debug!("engine accepted terminate"),
                    Ok(Err(e)) => debug!(error = %e, "terminate request failed"),
                    Err(_) => debug!("terminate request timed out"),
                }
                drop(conn);
                let exited = timeout(SHUTDOWN_GRACE, child.wait()).await;
                match exited {
                    Ok(Ok(status)) => debug!(%status, "engine exited"),
                    _ => terminate(&mut child).await,
                }
            }
        }
    }
}

async fn request_terminate(conn: &mut Connection, desktop: &str) -> Result<()> {
    let desktop = conn.require_interface(desktop, names::X_DESKTOP).await?;
    conn.call(&desktop, &x_desktop::TERMINATE, &[]).await?;
    Ok(())
}

/// Kills `child` and reaps it. Failures are logged, never returned.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "kill failed");
    }
    let reaped = timeout(SHUTDOWN_GRACE, child.wait()).await;
    match reaped {
        Ok(Ok(status)) => debug!(%status, "engine process reaped"),
        Ok(Err(e)) => warn!(error = %e, "could not reap engine process"),
        Err(_) => warn!(pid = ?child.id(), "engine process did not exit after kill"),
    }
}

async fn connect_once(url: &UnoUrl, limit: Duration) -> Result<(Connection, Bootstrap)> {
    let attempt = async {
        let mut conn = Connection::connect(url).await?;
        let objects = conn.bootstrap(&url.object).await?;
        Ok::<_, SessionError>((conn, objects))
    };
    match timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::OperationFailed(format!(
            "no answer from {url} within {limit:?}"
        ))),
    }
}

/// Hands out one [`AutomationSession`] per conversion attempt.
pub struct SessionManager {
    config: SessionConfig,
    state: SessionState,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, endpoint = %self.config.endpoint, "session state");
            self.state = next;
        }
    }

    /// Connects to a listening engine, launching one if nothing answers.
    ///
    /// A launched engine that never becomes reachable within the retry
    /// policy is killed before [`SessionError::Connection`] is returned.
    pub async fn acquire_session(&mut self) -> Result<AutomationSession> {
        self.transition(SessionState::Connecting);
        let url = self.config.endpoint.uno_url();
        let retry = self.config.retry;
        let deadline = Instant::now() + retry.budget();
        let attempt_limit = || {
            retry
                .attempt_timeout
                .min(deadline.saturating_duration_since(Instant::now()))
        };

        match connect_once(&url, attempt_limit()).await {
            Ok((conn, objects)) => {
                info!(endpoint = %self.config.endpoint, "connected to running LibreOffice");
                self.transition(SessionState::Connected);
                return Ok(AutomationSession {
                    conn,
                    objects,
                    engine: EngineProcess::Borrowed,
                });
            }
            Err(e) => debug!(error = %e, "no engine listening"),
        }

        let mut child = match self.launch() {
            Ok(child) => child,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Err(e);
            }
        };

        let mut last_error = String::from("no connection attempt made");
        let mut attempts = 0;
        while attempts < retry.max_attempts {
            if attempts > 0 && Instant::now() >= deadline {
                break;
            }
            attempts += 1;
            match connect_once(&url, attempt_limit()).await {
                Ok((conn, objects)) => {
                    info!(endpoint = %self.config.endpoint, attempts, "connected to launched LibreOffice");
                    self.transition(SessionState::Connected);
                    return Ok(AutomationSession {
                        conn,
                        objects,
                        engine: EngineProcess::Owned(child),
                    });
                }
                Err(e) => {
                    trace!(attempt = attempts, error = %e, "engine not ready");
                    last_error = e.to_string();
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if attempts < retry.max_attempts && !remaining.is_zero() {
                sleep(retry.interval.min(remaining)).await;
            }
        }

        warn!(
            endpoint = %self.config.endpoint,
            attempts,
            budget = ?retry.budget(),
            "launched LibreOffice never answered, killing it"
        );
        terminate(&mut child).await;
        self.transition(SessionState::Failed);
        Err(SessionError::Connection {
            endpoint: self.config.endpoint.to_string(),
            attempts,
            last_error,
        })
    }

    /// Ends `session`, shutting down the engine if the session launched it.
    pub async fn release_session(&mut self, session: AutomationSession) {
        session.release().await;
        self.transition(SessionState::Disconnected);
    }

    fn launch(&self) -> Result<Child> {
        let program = locate_soffice(self.config.soffice_path.as_deref())?;

        let mut cmd = Command::new(&program);
        cmd.args(LAUNCH_FLAGS)
            .arg(self.config.endpoint.accept_arg())
            .args(&self.config.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        info!(program = %program.display(), endpoint = %self.config.endpoint, "starting LibreOffice");
        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SessionError::ToolNotFound(program.display().to_string())
            } else {
                SessionError::Spawn { program, source: e }
            }
        })
    }
}
