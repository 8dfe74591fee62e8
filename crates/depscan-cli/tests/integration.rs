//! Integration tests for depscan

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LOGIN_DESCRIPTOR: &str = r"apiVersion: apps/v1
kind: Deployment
metadata:
  name: login
  labels:
    app: login
    version: v1
spec:
  template:
    metadata:
      labels:
        app: login
    spec:
      containers:
        - name: login
          image: login-service:latest
          ports:
            - containerPort: 8083
---
apiVersion: v1
kind: Service
metadata:
  name: login-svc
";

const GAME_DESCRIPTOR: &str = r"apiVersion: apps/v1
kind: Deployment
metadata:
  name: game
  labels:
    version: v2
";

const BROKEN_DESCRIPTOR: &str = r"apiVersion: apps/v1
metadata:
  name: orphan
";

const LOGIN_NACOS: &str = r#"package main

func registerService(client naming_client.INamingClient, serviceName, ip string, port uint64) error {
	_, err := client.RegisterInstance(vo.RegisterInstanceParam{
		Ip:          ip,
		Port:        port,
		ServiceName: serviceName,
	})
	return err
}
"#;

const LOGIN_MAIN: &str = r#"package main

func main() {
	registerService(NamingClient, "login-service", "10.0.0.5", 8083)
}
"#;

const GAME_NACOS: &str = r#"package main

func subscribeLoginService() {
	err := NamingClient.Subscribe(&vo.SubscribeParam{
		ServiceName: "login-service",
	})
	_ = err
}

func lookup(name string) {
	NamingClient.SelectInstances(vo.SelectInstancesParam{ServiceName: name})
}
"#;

const GAME_MAIN: &str = r#"package main

func main() {
	subscribeLoginService()
	lookup("leaderboard-service")
}
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> io::Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join("services");
        write(&root.join("login"), "deployment.yaml", LOGIN_DESCRIPTOR)?;
        write(&root.join("login"), "nacos.go", LOGIN_NACOS)?;
        write(&root.join("login"), "main.go", LOGIN_MAIN)?;
        write(&root.join("game"), "deployment.yaml", GAME_DESCRIPTOR)?;
        write(&root.join("game"), "nacos.go", GAME_NACOS)?;
        write(&root.join("game"), "main.go", GAME_MAIN)?;
        write(&root.join("orphan"), "deployment.yaml", BROKEN_DESCRIPTOR)?;
        Ok(Workspace { dir })
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("services")
    }

    fn output_prefix(&self) -> String {
        format!("{}/out/", self.dir.path().display())
    }

    fn manifest(&self, service: &str) -> PathBuf {
        self.dir.path().join("out").join(format!("{}.json", service))
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("depscan");
        cmd.env("DEPSCAN_CONFIG", self.dir.path().join("config").join("depscan.toml"));
        cmd.env("HOME", self.dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn analyze(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("analyze")
            .arg(self.root())
            .arg("--output-prefix")
            .arg(self.output_prefix());
        cmd
    }
}

fn write(dir: &Path, name: &str, content: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(name), content)
}

fn read_json(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn test_version() -> io::Result<()> {
    Workspace::new()?
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("depscan"));
    Ok(())
}

#[test]
fn test_help() -> io::Result<()> {
    Workspace::new()?
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("TCP dependencies"));
    Ok(())
}

#[test]
fn test_invalid_command() -> io::Result<()> {
    Workspace::new()?.cmd().arg("invalid").assert().failure();
    Ok(())
}

#[test]
fn test_analyze_writes_joined_manifests() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;
    workspace.analyze().assert().success();

    let game = read_json(&workspace.manifest("game"))?;
    assert_eq!(game["service"], "game");
    assert_eq!(game["version"], "v2");
    assert_eq!(game["requests"][0]["type"], "tcp");
    assert_eq!(game["requests"][0]["url"], "10.0.0.5");
    assert_eq!(game["requests"][0]["name"], "login");
    assert_eq!(game["requests"][0]["port"], "8083");
    assert_eq!(game["requests"][1]["url"], "");
    assert_eq!(game["requests"][1]["name"], "");

    let login = read_json(&workspace.manifest("login"))?;
    assert_eq!(login["version"], "v1");
    assert_eq!(login["requests"], serde_json::json!([]));

    assert!(!workspace.manifest("orphan").exists());
    Ok(())
}

#[test]
fn test_manifest_uses_one_space_indent() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;
    workspace.analyze().assert().success();

    let text = fs::read_to_string(workspace.manifest("login"))?;
    assert!(text.starts_with("{\n \"service\": \"login\",\n \"version\": \"v1\",\n \"requests\": []"));
    assert!(text.ends_with("}\n"));
    Ok(())
}

#[test]
fn test_blocked_output_does_not_stop_other_manifests() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;
    fs::create_dir_all(workspace.manifest("game"))?;

    workspace
        .analyze()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to write manifest for 'game'"))
        .stderr(predicate::str::contains("1 of 2 manifest(s) could not be written"));

    let login = read_json(&workspace.manifest("login"))?;
    assert_eq!(login["service"], "login");
    assert!(workspace.manifest("game").is_dir());
    Ok(())
}

#[test]
fn test_analyze_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;

    workspace.analyze().assert().success();
    let first = fs::read(workspace.manifest("game"))?;
    workspace.analyze().assert().success();
    let second = fs::read(workspace.manifest("game"))?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_omit_unresolved_flag() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;
    workspace.analyze().arg("--omit-unresolved").assert().success();

    let game = read_json(&workspace.manifest("game"))?;
    assert_eq!(game["requests"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn test_dry_run_prints_without_writing() -> io::Result<()> {
    let workspace = Workspace::new()?;
    workspace
        .analyze()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"service\": \"game\""))
        .stdout(predicate::str::contains("\"url\": \"10.0.0.5\""));

    assert!(!workspace.manifest("game").exists());
    Ok(())
}

#[test]
fn test_parse_error_skipped_unless_strict() -> io::Result<()> {
    let workspace = Workspace::new()?;
    write(
        &workspace.root().join("game"),
        "broken.go",
        "package main\n\nfunc main() {}\n\n)))\n",
    )?;

    workspace
        .analyze()
        .assert()
        .success()
        .stderr(predicate::str::contains("parse error"));

    workspace
        .analyze()
        .arg("--strict")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Analysis aborted"));
    Ok(())
}

#[test]
fn test_missing_root_fails() -> io::Result<()> {
    let workspace = Workspace::new()?;
    workspace
        .cmd()
        .args(["analyze", "does-not-exist"])
        .current_dir(workspace.dir.path())
        .assert()
        .failure()
        .code(1);
    Ok(())
}

#[test]
fn test_wrappers_lists_inferred_wrappers() -> io::Result<()> {
    let workspace = Workspace::new()?;
    workspace
        .cmd()
        .arg("wrappers")
        .arg(workspace.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("registerService"))
        .stdout(predicate::str::contains("subscribeLoginService"))
        .stdout(predicate::str::contains("via Subscribe"));
    Ok(())
}

#[test]
fn test_wrappers_json() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;
    let output = workspace
        .cmd()
        .arg("wrappers")
        .arg(workspace.root())
        .arg("--json")
        .output()?;
    assert!(output.status.success());

    let listings: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(listings[0]["service_name"], "game");
    assert_eq!(listings[1]["registration"][0]["function"], "registerService");
    assert_eq!(
        listings[1]["registration"][0]["service_name"],
        serde_json::json!({"kind": "parameter", "value": 1})
    );
    Ok(())
}

#[test]
fn test_config_show() -> io::Result<()> {
    Workspace::new()?
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration:"));
    Ok(())
}

#[test]
fn test_config_set_then_show() -> io::Result<()> {
    let workspace = Workspace::new()?;
    workspace
        .cmd()
        .args(["config", "set", "output-prefix", "manifests/"])
        .assert()
        .success();

    workspace
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output-prefix"))
        .stdout(predicate::str::contains("manifests/"));
    Ok(())
}

#[test]
fn test_config_set_rejects_unknown_key() -> io::Result<()> {
    Workspace::new()?
        .cmd()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
    Ok(())
}

#[test]
fn test_config_path_honours_env() -> io::Result<()> {
    let workspace = Workspace::new()?;
    workspace
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("depscan.toml"));
    Ok(())
}

#[test]
fn test_configured_sdk_names_are_used() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = Workspace::new()?;
    write(
        &workspace.dir.path().join("config"),
        "depscan.toml",
        "[sdk]\nregister-entry-point = \"Publish\"\n",
    )?;

    workspace.analyze().assert().success();

    let game = read_json(&workspace.manifest("game"))?;
    assert_eq!(game["requests"][0]["url"], "");
    Ok(())
}
