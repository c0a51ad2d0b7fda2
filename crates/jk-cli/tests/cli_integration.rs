//! CLI integration tests
//!
//! Tests the jk-console binaries using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn get_available_port() -> Command {
    Command::cargo_bin("get-available-port")
        .expect("Failed to locate get-available-port binary - ensure it's built before running tests")
}

fn run_ark(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("run-ark")
        .expect("Failed to locate run-ark binary - ensure it's built before running tests");
    cmd.env("JK_CONSOLE_CONFIG", config).env_remove("RUST_LOG");
    cmd
}

fn printed_port(cmd: &mut Command) -> u16 {
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.ends_with('\n'), "expected a trailing newline: {text:?}");
    text.trim().parse().expect("stdout should be a decimal port")
}

#[test]
fn test_get_available_port_prints_port() {
    let port = printed_port(&mut get_available_port());
    assert!(port >= 1);
}

#[test]
fn test_get_available_port_repeatable() {
    let first = printed_port(&mut get_available_port());
    let second = printed_port(&mut get_available_port());
    assert!(first >= 1 && second >= 1);
}

#[test]
fn test_get_available_port_port_is_bindable() {
    let port = printed_port(&mut get_available_port());
    // Racy by nature, but a freshly released ephemeral port is almost always free
    let listener = std::net::TcpListener::bind(("127.0.0.1", port));
    assert!(listener.is_ok());
}

#[test]
fn test_get_available_port_help() {
    get_available_port()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Print a free TCP port"));
}

#[test]
fn test_get_available_port_rejects_arguments() {
    get_available_port()
        .arg("extra")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_run_ark_missing_kernel() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "kernel_name = \"jk-no-such-kernel\"\nkernel_search_paths = [{:?}]\n",
            tmp.path()
        ),
    )
    .unwrap();

    run_ark(&config)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No such kernel named 'jk-no-such-kernel'"));
}

#[test]
fn test_run_ark_missing_config_file() {
    let tmp = TempDir::new().unwrap();

    run_ark(&tmp.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[cfg(unix)]
#[test]
fn test_run_ark_readiness_timeout() {
    let tmp = TempDir::new().unwrap();
    let kernels = tmp.path().join("kernels");
    std::fs::create_dir_all(kernels.join("silent")).unwrap();
    std::fs::write(
        kernels.join("silent").join("kernel.json"),
        r#"{"argv": ["sleep", "30"], "display_name": "Silent", "language": "none"}"#,
    )
    .unwrap();

    let runtime = tmp.path().join("runtime");
    let config = tmp.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "kernel_name = \"silent\"\nready_timeout = 0.5\nkernel_search_paths = [{:?}]\nruntime_dir = {:?}\n",
            kernels, runtime
        ),
    )
    .unwrap();

    run_ark(&config)
        .arg("--lsp-channel=127.0.0.1:9999")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Kernel didn't respond in 0.5 seconds"));

    let leftovers: Vec<_> = std::fs::read_dir(&runtime).unwrap().collect();
    assert!(leftovers.is_empty());
}

/// Whether a process has exited (gone, or a zombie awaiting its reaper)
#[cfg(target_os = "linux")]
fn process_exited(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(") ")
            .is_some_and(|(_, rest)| rest.starts_with('Z') || rest.starts_with('X')),
        Err(_) => true,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_run_ark_interrupted_during_startup_stops_kernel() {
    use assert_cmd::cargo::CommandCargoExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let tmp = TempDir::new().unwrap();
    let kernels = tmp.path().join("kernels");
    let pid_file = tmp.path().join("kernel.pid");
    std::fs::create_dir_all(kernels.join("silent")).unwrap();
    let spec = serde_json::json!({
        "argv": ["sh", "-c", "echo $$ > \"$0\"; exec sleep 60", pid_file],
        "display_name": "Silent",
        "language": "none"
    });
    std::fs::write(kernels.join("silent").join("kernel.json"), spec.to_string()).unwrap();

    let runtime = tmp.path().join("runtime");
    let config = tmp.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "kernel_name = \"silent\"\nready_timeout = 30\nkernel_search_paths = [{:?}]\nruntime_dir = {:?}\n",
            kernels, runtime
        ),
    )
    .unwrap();

    let mut launcher = std::process::Command::cargo_bin("run-ark")
        .unwrap()
        .env("JK_CONSOLE_CONFIG", &config)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Wait for the kernel to be up, so the launcher is inside the readiness wait
    let deadline = Instant::now() + Duration::from_secs(10);
    let kernel_pid: u32 = loop {
        if let Some(pid) = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|text| text.trim().parse().ok())
        {
            break pid;
        }
        assert!(Instant::now() < deadline, "kernel never started");
        std::thread::sleep(Duration::from_millis(50));
    };

    let status = std::process::Command::new("kill")
        .args(["-INT", &launcher.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = launcher.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Received SIGINT while starting kernel"));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !process_exited(kernel_pid) {
        assert!(Instant::now() < deadline, "kernel {} outlived the launcher", kernel_pid);
        std::thread::sleep(Duration::from_millis(50));
    }

    let leftovers: Vec<_> = std::fs::read_dir(&runtime).unwrap().collect();
    assert!(leftovers.is_empty());
}
