//! Session acquisition against endpoints where nothing ever answers.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pagefit_libreoffice::{
    Endpoint, RetryPolicy, SessionConfig, SessionError, SessionManager, SessionState,
};

/// A localhost port with no listener.
fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn config(soffice: PathBuf) -> SessionConfig {
    SessionConfig {
        soffice_path: Some(soffice),
        endpoint: Endpoint {
            host: "127.0.0.1".to_string(),
            port: unused_port(),
        },
        retry: RetryPolicy {
            max_attempts: 10,
            interval: Duration::from_millis(50),
            attempt_timeout: Duration::from_secs(1),
        },
        extra_args: Vec::new(),
    }
}

#[tokio::test]
async fn test_missing_executable_is_tool_not_found() {
    let mut manager = SessionManager::new(config(PathBuf::from("/nonexistent/pagefit/soffice")));

    let err = manager.acquire_session().await.err().unwrap();
    assert!(matches!(err, SessionError::ToolNotFound(_)), "{err}");
    assert_eq!(manager.state(), SessionState::Failed);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreachable_engine_is_killed_after_retries() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("pid");
    let script = dir.path().join("soffice");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 30\n", pid_file.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut manager = SessionManager::new(config(script));
    let err = manager.acquire_session().await.err().unwrap();

    match err {
        SessionError::Connection { attempts, .. } => {
            assert!((1..=10).contains(&attempts), "{attempts} attempts")
        }
        other => panic!("expected Connection error, got {other}"),
    }
    assert_eq!(manager.state(), SessionState::Failed);

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let alive = std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.trim())
        .stderr(std::process::Stdio::null())
        .status()
        .unwrap()
        .success();
    assert!(!alive, "launched engine {} still running", pid.trim());
}

#[cfg(unix)]
fn sleeping_soffice(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("soffice");
    std::fs::write(&script, "#!/bin/sh\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(unix)]
#[tokio::test]
async fn test_silent_listener_is_bounded_by_retry_budget() {
    // Accepts connections and never speaks URP.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let holder = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let retry = RetryPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(200),
        attempt_timeout: Duration::from_secs(5),
    };
    let mut manager = SessionManager::new(SessionConfig {
        soffice_path: Some(sleeping_soffice(dir.path())),
        endpoint: Endpoint {
            host: "127.0.0.1".to_string(),
            port,
        },
        retry,
        extra_args: Vec::new(),
    });

    let started = Instant::now();
    let err = manager.acquire_session().await.err().unwrap();
    let elapsed = started.elapsed();
    holder.abort();

    assert!(matches!(err, SessionError::Connection { .. }), "{err}");
    assert_eq!(retry.budget(), Duration::from_millis(600));
    assert!(
        elapsed < retry.budget() + Duration::from_secs(2),
        "acquire took {elapsed:?} against a {:?} budget",
        retry.budget()
    );
    assert_eq!(manager.state(), SessionState::Failed);
}
