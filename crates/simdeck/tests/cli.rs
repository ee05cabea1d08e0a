use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;

const DIVIDER: &str = r#"{
  "title": "divider",
  "components": [
    { "model": "R", "name": "R1",
      "ports": [ { "name": "1", "net": "in" }, { "name": "2", "net": "out" } ],
      "properties": [ { "name": "R", "value": "1 kOhm", "visible": true } ] },
    { "model": "R", "name": "R2",
      "ports": [ { "name": "1", "net": "out" }, { "name": "2", "net": "gnd" } ],
      "properties": [ { "name": "R", "value": "2.2 kOhm" } ] },
    { "model": "GND", "name": "GND1", "ports": [ { "name": "1", "net": "gnd" } ] }
  ]
}"#;

fn simdeck() -> Command {
    let mut cmd = Command::cargo_bin("simdeck").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_netlist_to_stdout() {
    let dir = TempDir::new().unwrap();
    let circuit = dir.child("divider.json");
    circuit.write_str(DIVIDER).unwrap();

    let output = simdeck()
        .args(["netlist", "--dialect", "ngspice", "--stdout"])
        .arg(circuit.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr_of(&output));

    let deck = stdout_of(&output);
    assert!(deck.starts_with("* divider\n"), "{deck}");
    assert!(deck.contains("R1 in out 1k\n"), "{deck}");
    assert!(deck.contains("R2 out 0 2.2k\n"), "{deck}");
    assert!(deck.trim_end().ends_with(".END"), "{deck}");
}

#[test]
fn test_netlist_writes_next_to_circuit() {
    let dir = TempDir::new().unwrap();
    let circuit = dir.child("divider.json");
    circuit.write_str(DIVIDER).unwrap();

    simdeck()
        .args(["netlist", "-d", "xyce"])
        .arg(circuit.path())
        .assert()
        .success();

    let deck = std::fs::read_to_string(dir.child("divider.cir").path()).unwrap();
    assert!(deck.contains("R1 in out 1k\n"), "{deck}");

    let custom = dir.child("out.net");
    simdeck()
        .args(["netlist", "--dialect", "qucsator", "-o"])
        .arg(custom.path())
        .arg(circuit.path())
        .assert()
        .success();
    let deck = std::fs::read_to_string(custom.path()).unwrap();
    assert!(deck.contains("R:R1 in out"), "{deck}");
}

#[test]
fn test_netlist_reports_diagnostics() {
    let dir = TempDir::new().unwrap();
    let circuit = dir.child("antenna.json");
    circuit
        .write_str(
            r#"{ "title": "antenna", "components": [
                { "model": "Antenna", "name": "A1", "ports": [ { "name": "1", "net": "rf" } ] } ] }"#,
        )
        .unwrap();

    let output = simdeck()
        .args(["netlist", "--stdout"])
        .arg(circuit.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("unknown model 'Antenna'"), "{stderr}");
    assert!(stderr.contains("net 'rf' has a single connection"), "{stderr}");
}

#[test]
fn test_missing_circuit_fails() {
    let dir = TempDir::new().unwrap();
    let output = simdeck()
        .args(["netlist", "--stdout"])
        .arg(dir.child("missing.json").path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("Failed to read circuit"));
}

#[test]
fn test_unknown_dialect_is_rejected() {
    simdeck()
        .args(["netlist", "--dialect", "hspice", "c.json"])
        .assert()
        .failure();
}

#[test]
fn test_simulate_refuses_non_simulating_dialect() {
    let dir = TempDir::new().unwrap();
    let circuit = dir.child("divider.json");
    circuit.write_str(DIVIDER).unwrap();

    let output = simdeck()
        .args(["simulate", "--dialect", "cdl"])
        .arg(circuit.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("cdl decks cannot be simulated"));
}

#[test]
fn test_cdl_fix() {
    let dir = TempDir::new().unwrap();
    let deck = dir.child("top.cdl");
    deck.write_str(".SUBCKT SUB_A a b c\nR1 a b 1k\n.ENDS\nXfoo n1 n2 n3 SUB_A\nXbar n1 n2 SUB_B\n")
        .unwrap();

    let output = simdeck().arg("cdl-fix").arg(deck.path()).output().unwrap();
    assert!(output.status.success());
    let fixed = stdout_of(&output);
    assert!(fixed.contains("\nXfoo n1 n2 n3 SUB_A\n"), "{fixed}");
    assert!(fixed.contains("\nbar n1 n2 SUB_B\n"), "{fixed}");
}

#[test]
fn test_parse_prn_to_dataset() {
    let dir = TempDir::new().unwrap();
    let prn = dir.child("rc.cir.prn");
    prn.write_str("Index   TIME   V(OUT)\n0  0.0  1.0\n1  1.0e-3  2.0\nEnd of Xyce(TM) Simulation\n")
        .unwrap();

    let output = simdeck()
        .args(["parse", "--analysis", "tran"])
        .arg(prn.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr_of(&output));
    let text = stdout_of(&output);
    assert!(text.starts_with("<Qucs Dataset 0.0.19>\n"), "{text}");
    assert!(text.contains("<indep tran.time 2>\n  +0.00000000000e0\n  +1.00000000000e-3\n</indep>"), "{text}");
    assert!(text.contains("<dep tran.v(out) tran.time>\n"), "{text}");

    let json = dir.child("rc.json");
    simdeck()
        .args(["parse", "-a", "tran", "--prefix", "t1", "--json", "-o"])
        .arg(json.path())
        .arg(prn.path())
        .assert()
        .success();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json.path()).unwrap()).unwrap();
    assert_eq!(value["vectors"][1]["name"], "t1.v(out)");
    assert_eq!(value["vectors"][1]["dependencies"][0], "t1.time");
}

#[test]
fn test_parse_reads_qucs_dataset() {
    let dir = TempDir::new().unwrap();
    let dat = dir.child("rc.dat");
    dat.write_str("<Qucs Dataset 0.0.19>\n<indep time 2>\n  +0.0\n  +1.0\n</indep>\n<dep out.Vt time>\n  +0.5\n  +0.25\n</dep>\n")
        .unwrap();

    let output = simdeck()
        .args(["parse", "--analysis", "tran"])
        .arg(dat.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr_of(&output));
    assert!(stdout_of(&output).contains("<dep out.Vt time>\n  +5.00000000000e-1\n"));
}

#[test]
fn test_parse_log_without_results_fails() {
    let dir = TempDir::new().unwrap();
    let log = dir.child("run.log");
    log.write_str("Circuit: rc\n").unwrap();

    let output = simdeck()
        .args(["parse", "--analysis", "four"])
        .arg(log.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("no four results found"));
}
