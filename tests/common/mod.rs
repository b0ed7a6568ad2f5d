//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory holding a package index, a shell-script
/// builder and the run output.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project with the sample index and a builder failing `failing`
    pub fn with_sample(failing: &[&str]) -> Self {
        let project = Self::new();
        project.create_file("index.toml", SAMPLE_INDEX);
        project.write_builder(failing, None);
        project.write_config();
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write `builder.sh`
    ///
    /// The script appends each package it builds to `built.txt` and exits
    /// non-zero for packages in `failing`. When `crash_on` is set, building
    /// that package kills massbuild once.
    pub fn write_builder(&self, failing: &[&str], crash_on: Option<&str>) {
        let root = self.path();
        let crash = crash_on.map_or(String::new(), |name| {
            format!(
                r#"if [ "$1" = "{name}" ] && [ ! -e "{marker}" ]; then
    : > "{marker}"
    kill -9 $PPID
    exit 1
fi
"#,
                marker = root.join("crashed").display()
            )
        });
        let script = format!(
            r#"#!/bin/sh
echo "building $1 in $(pwd)"
{crash}case " {failing} " in
    *" $1 "*) echo "error: $1 does not compile" >&2; exit 2 ;;
esac
echo "$1" >> "{record}"
"#,
            failing = failing.join(" "),
            record = root.join("built.txt").display()
        );

        let path = root.join("builder.sh");
        std::fs::write(&path, script).expect("Failed to write builder");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make builder executable");
    }

    /// Write `config.toml` pointing at the sample index and builder
    pub fn write_config(&self) {
        let root = self.path();
        self.create_file(
            "config.toml",
            &format!(
                r#"index = "{}"

[build]
command = ["{}"]
"#,
                root.join("index.toml").display(),
                root.join("builder.sh").display()
            ),
        );
    }

    /// Packages the builder succeeded on, in order
    pub fn built(&self) -> Vec<String> {
        if !self.file_exists("built.txt") {
            return Vec::new();
        }
        self.read_file("built.txt")
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    /// Run massbuild with the project's config
    pub fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_massbuild"));
        cmd.current_dir(self.path())
            .env("MASSBUILD_CONFIG_DIR", self.path().join("no-config"))
            .env("MASSBUILD_DATA_DIR", self.path().join("data"))
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.path().join("config.toml"));
        for arg in args {
            cmd.arg(arg);
        }
        cmd.output().expect("Failed to execute massbuild")
    }

    /// Read the JSON report of a completed run in `out`
    pub fn report(&self, out: &str) -> serde_json::Value {
        serde_json::from_str(&self.read_file(&format!("{out}/report.json")))
            .expect("Invalid report.json")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample package index
///
/// `journal` needs a virtual package that is not installed, and `curl`
/// takes either TLS library.
pub const SAMPLE_INDEX: &str = r#"
[virtual]
libc-dev = true
systemd = false

[packages.zlib]
build_depends = [["libc-dev"]]

[packages.openssl]
build_depends = [["zlib"]]

[packages.curl]
build_depends = [["openssl", "gnutls"], ["zlib"]]

[packages.curl-doc]
variant_of = "curl"

[packages.journal]
build_depends = [["systemd"]]
"#;

/// Build order of the sample index with `--all`
pub const SAMPLE_ORDER: [&str; 3] = ["zlib", "openssl", "curl"];

/// Stdout as a string
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Stderr as a string
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
