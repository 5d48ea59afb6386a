use std::process::Command;

#[test]
fn short_session_runs_to_completion() {
    let output = Command::new(env!("CARGO_BIN_EXE_horde"))
        .args(["--seed", "3", "--seconds", "8", "--tick-rate", "20"])
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to launch the horde binary");

    assert!(output.status.success(), "horde should exit cleanly");
    let log = String::from_utf8_lossy(&output.stdout);
    assert!(log.contains("session finished"), "summary is logged: {log}");
}

#[test]
fn invalid_tick_rate_fails() {
    let status = Command::new(env!("CARGO_BIN_EXE_horde"))
        .args(["--tick-rate", "0"])
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to launch the horde binary");

    assert!(!status.success(), "a zero tick rate is rejected");
}
