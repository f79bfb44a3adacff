use std::fs::File;
use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::predicate;

#[test]
fn print_debug_info() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let file_path = dir.path().join("ward.yaml");
    let mut file = File::create(&file_path)?;
    writeln!(file, "programs: {{}}")?;

    let mut cmd = Command::cargo_bin("wardd")?;
    cmd.arg("--config").arg(&file_path).arg("--print-debug-info");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("print_debug_info: true"));

    Ok(())
}

#[test]
fn refuses_to_start_twice_against_the_same_pid_file() -> Result<(), Box<dyn std::error::Error>> {
    // The daemon arbitrates a single fixed pid-file path, so a second
    // instance started while the first still owns it must fail fast with
    // exit code 1 rather than racing it for the transport port.
    let dir = assert_fs::TempDir::new()?;
    let file_path = dir.path().join("ward.yaml");
    let mut file = File::create(&file_path)?;
    writeln!(
        file,
        r#"
server:
  type: socket
  port: 0
programs: {{}}
"#
    )?;

    let mut first = Command::cargo_bin("wardd")?;
    first.arg("--config").arg(&file_path).arg("--foreground");
    let mut child = first.spawn()?;
    std::thread::sleep(std::time::Duration::from_millis(300));

    let mut second = Command::cargo_bin("wardd")?;
    second.arg("--config").arg(&file_path).arg("--foreground");
    second.assert().failure().code(1);

    // SIGTERM, not kill(), so wardd's own handler runs and removes its
    // pid-file before the process exits.
    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        nix::sys::signal::Signal::SIGTERM,
    )
    .ok();
    child.wait().ok();

    Ok(())
}
