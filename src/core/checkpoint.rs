//! Resumable run checkpoint
//!
//! The checkpoint is an append-only file of self-describing records, one per
//! line, each prefixed with the SHA-256 of its JSON payload:
//!
//! ```text
//! <sha256-hex>|{"type":"Snapshot","version":1,...}
//! <sha256-hex>|{"type":"Advance","package":"zlib","failed":{}}
//! ```
//!
//! The first record is a full snapshot of the run. Every processed package
//! appends one `Advance` delta and is synced to disk before the next package
//! starts. Restoring replays the deltas over the snapshot.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::config::RunConfig;
use crate::core::failures::FailureSet;
use crate::core::graph::DependencyGraph;
use crate::error::CheckpointError;

/// Current record format version
pub const FORMAT_VERSION: u32 = 1;

/// State of a run that is enough to continue it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Packages still to process, front first
    pub queue: VecDeque<String>,
    /// Dependency graph the run was scheduled from
    pub graph: DependencyGraph,
    /// Failures recorded so far
    pub failures: FailureSet,
}

impl RunState {
    /// Pop `package` off the queue front and record its failures
    ///
    /// Fails when `package` is not the queue front.
    pub fn advance(&mut self, package: &str, failed: FailureSet) -> Result<(), String> {
        match self.queue.front() {
            Some(front) if front == package => {}
            Some(front) => return Err(format!("expected '{front}', found '{package}'")),
            None => return Err(format!("queue is empty, found '{package}'")),
        }
        self.queue.pop_front();
        self.failures.merge(failed);
        Ok(())
    }
}

/// A checkpoint record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CheckpointRecord {
    /// Complete run state at start
    Snapshot {
        version: u32,
        created: u64,
        config: RunConfig,
        state: RunState,
    },

    /// One package processed
    Advance { package: String, failed: FailureSet },
}

/// Result of replaying a checkpoint
#[derive(Debug, Clone)]
pub struct Restored {
    /// Configuration of the interrupted run
    pub config: RunConfig,
    /// State after the last complete record
    pub state: RunState,
    /// Number of packages processed before the interruption
    pub steps: usize,
    /// Seconds since the epoch when the run started
    pub created: u64,
}

/// Append-only checkpoint with a sync after every record
#[derive(Debug)]
pub struct Checkpoint {
    path: PathBuf,
    file: File,
}

impl Checkpoint {
    /// Create a new checkpoint holding the initial snapshot
    pub fn init(path: &Path, config: &RunConfig, state: &RunState) -> Result<Self, CheckpointError> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    CheckpointError::AlreadyExists {
                        path: path.to_path_buf(),
                    }
                } else {
                    io_error(path, &e)
                }
            })?;

        let mut checkpoint = Self {
            path: path.to_path_buf(),
            file,
        };
        checkpoint.append(&CheckpointRecord::Snapshot {
            version: FORMAT_VERSION,
            created: now(),
            config: config.clone(),
            state: state.clone(),
        })?;
        tracing::debug!("Created checkpoint {}", path.display());
        Ok(checkpoint)
    }

    /// Record that `package` was processed, adding `failed` to the failure set
    ///
    /// Returns once the record is on disk.
    pub fn advance(&mut self, package: &str, failed: &FailureSet) -> Result<(), CheckpointError> {
        self.append(&CheckpointRecord::Advance {
            package: package.to_string(),
            failed: failed.clone(),
        })
    }

    /// Reopen a checkpoint to continue the run
    ///
    /// A torn final record is dropped and the file truncated before
    /// appending resumes.
    pub fn restore(path: &Path) -> Result<(Self, Restored), CheckpointError> {
        let contents = read(path)?;
        let parsed = parse(path, &contents)?;

        if parsed.valid_len < contents.len() {
            tracing::warn!(
                "Discarding incomplete final record of checkpoint {} ({} bytes)",
                path.display(),
                contents.len() - parsed.valid_len
            );
            let file = OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| io_error(path, &e))?;
            file.set_len(parsed.valid_len as u64)
                .and_then(|()| file.sync_all())
                .map_err(|e| io_error(path, &e))?;
        }

        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| io_error(path, &e))?;

        Ok((
            Self {
                path: path.to_path_buf(),
                file,
            },
            parsed.restored,
        ))
    }

    /// Read a checkpoint without modifying it
    pub fn load(path: &Path) -> Result<Restored, CheckpointError> {
        let contents = read(path)?;
        Ok(parse(path, &contents)?.restored)
    }

    /// Delete the checkpoint once the run is complete
    pub fn remove(self) -> Result<(), CheckpointError> {
        let Self { path, file } = self;
        drop(file);
        discard(&path)
    }

    fn append(&mut self, record: &CheckpointRecord) -> Result<(), CheckpointError> {
        let json =
            serde_json::to_string(record).map_err(|e| CheckpointError::Serialize(e.to_string()))?;
        let line = format!("{}|{}\n", digest(&json), json);

        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .and_then(|()| self.file.sync_data())
            .map_err(|e| io_error(&self.path, &e))
    }
}

/// Delete the checkpoint at `path`
pub fn discard(path: &Path) -> Result<(), CheckpointError> {
    fs::remove_file(path).map_err(|e| io_error(path, &e))
}

struct Parsed {
    restored: Restored,
    valid_len: usize,
}

fn parse(path: &Path, contents: &[u8]) -> Result<Parsed, CheckpointError> {
    // everything after the last newline is a torn write
    let valid_len = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    let text = std::str::from_utf8(&contents[..valid_len]).map_err(|e| corrupt(path, 0, e))?;

    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));

    let Some((_, first)) = lines.next() else {
        return Err(CheckpointError::MissingSnapshot {
            path: path.to_path_buf(),
        });
    };
    let (config, mut state, created) = parse_snapshot(path, first)?;

    let mut steps = 0;
    for (line_no, line) in lines {
        match parse_record(path, line_no, line)? {
            CheckpointRecord::Advance { package, failed } => {
                state
                    .advance(&package, failed)
                    .map_err(|reason| corrupt(path, line_no, reason))?;
                steps += 1;
            }
            CheckpointRecord::Snapshot { .. } => {
                return Err(corrupt(path, line_no, "unexpected second snapshot"));
            }
        }
    }

    Ok(Parsed {
        restored: Restored {
            config,
            state,
            steps,
            created,
        },
        valid_len,
    })
}

fn parse_snapshot(path: &Path, line: &str) -> Result<(RunConfig, RunState, u64), CheckpointError> {
    let json = verify(path, 1, line)?;
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| corrupt(path, 1, e))?;

    if value.get("type").and_then(|t| t.as_str()) != Some("Snapshot") {
        return Err(CheckpointError::MissingSnapshot {
            path: path.to_path_buf(),
        });
    }
    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| corrupt(path, 1, "snapshot has no version"))?;
    if version != u64::from(FORMAT_VERSION) {
        return Err(CheckpointError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: u32::try_from(version).unwrap_or(u32::MAX),
            expected: FORMAT_VERSION,
        });
    }

    match serde_json::from_value(value).map_err(|e| corrupt(path, 1, e))? {
        CheckpointRecord::Snapshot {
            config,
            state,
            created,
            ..
        } => Ok((config, state, created)),
        CheckpointRecord::Advance { .. } => Err(CheckpointError::MissingSnapshot {
            path: path.to_path_buf(),
        }),
    }
}

fn parse_record(path: &Path, line_no: usize, line: &str) -> Result<CheckpointRecord, CheckpointError> {
    let json = verify(path, line_no, line)?;
    serde_json::from_str(json).map_err(|e| corrupt(path, line_no, e))
}

/// Check the digest prefix and return the JSON payload
fn verify<'l>(path: &Path, line_no: usize, line: &'l str) -> Result<&'l str, CheckpointError> {
    let (expected, json) = line
        .split_once('|')
        .ok_or_else(|| corrupt(path, line_no, "missing checksum delimiter"))?;
    let actual = digest(json);
    if !expected.eq_ignore_ascii_case(&actual) {
        return Err(corrupt(
            path,
            line_no,
            format!("checksum mismatch: expected {expected}, got {actual}"),
        ));
    }
    Ok(json)
}

fn digest(json: &str) -> String {
    hex::encode(Sha256::digest(json.as_bytes()))
}

fn read(path: &Path) -> Result<Vec<u8>, CheckpointError> {
    fs::read(path).map_err(|e| io_error(path, &e))
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn io_error(path: &Path, e: &std::io::Error) -> CheckpointError {
    CheckpointError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

fn corrupt(path: &Path, line: usize, reason: impl ToString) -> CheckpointError {
    CheckpointError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::failures::FailureReason;
    use crate::core::package::PackageNode;
    use tempfile::TempDir;

    fn sample_state() -> RunState {
        RunState {
            queue: ["a", "b", "c"].iter().map(ToString::to_string).collect(),
            graph: DependencyGraph::from_nodes([
                PackageNode::new("a"),
                PackageNode::new("b").with_build_dep(["a"]),
                PackageNode::new("c"),
            ]),
            failures: [("x".to_string(), FailureReason::Skipped)]
                .into_iter()
                .collect(),
        }
    }

    fn failed(name: &str) -> FailureSet {
        [(name.to_string(), FailureReason::BuildFailed { exit_code: Some(1) })]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_snapshot_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");
        let state = sample_state();
        let config = RunConfig {
            index: Some(PathBuf::from("/srv/index.toml")),
            ..RunConfig::default()
        };

        Checkpoint::init(&path, &config, &state).unwrap();
        let restored = Checkpoint::load(&path).unwrap();

        assert_eq!(restored.config, config);
        assert_eq!(restored.state, state);
        assert_eq!(restored.steps, 0);
    }

    #[test]
    fn test_advance_replays() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");

        let mut checkpoint = Checkpoint::init(&path, &RunConfig::default(), &sample_state()).unwrap();
        checkpoint.advance("a", &failed("a")).unwrap();
        checkpoint.advance("b", &FailureSet::new()).unwrap();
        drop(checkpoint);

        let restored = Checkpoint::load(&path).unwrap();
        assert_eq!(restored.steps, 2);
        assert_eq!(restored.state.queue, VecDeque::from(vec!["c".to_string()]));
        assert!(restored.state.failures.contains("a"));
        assert!(restored.state.failures.contains("x"));
    }

    #[test]
    fn test_init_refuses_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");
        fs::write(&path, "").unwrap();

        let err = Checkpoint::init(&path, &RunConfig::default(), &sample_state()).unwrap_err();
        assert!(matches!(err, CheckpointError::AlreadyExists { .. }));
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");

        let mut checkpoint = Checkpoint::init(&path, &RunConfig::default(), &sample_state()).unwrap();
        checkpoint.advance("a", &FailureSet::new()).unwrap();
        drop(checkpoint);
        let intact = fs::read(&path).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"0123abcd|{\"type\":\"Adv").unwrap();
        drop(file);

        let (mut checkpoint, restored) = Checkpoint::restore(&path).unwrap();
        assert_eq!(restored.steps, 1);
        assert_eq!(fs::read(&path).unwrap(), intact);

        // appending continues cleanly after truncation
        checkpoint.advance("b", &FailureSet::new()).unwrap();
        drop(checkpoint);
        assert_eq!(Checkpoint::load(&path).unwrap().steps, 2);
    }

    #[test]
    fn test_checksum_mismatch_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");

        let mut checkpoint = Checkpoint::init(&path, &RunConfig::default(), &sample_state()).unwrap();
        checkpoint.advance("a", &FailureSet::new()).unwrap();
        checkpoint.advance("b", &FailureSet::new()).unwrap();
        drop(checkpoint);

        let text = fs::read_to_string(&path).unwrap();
        let tampered = text.replacen("\"package\":\"a\"", "\"package\":\"z\"", 1);
        fs::write(&path, tampered).unwrap();

        let err = Checkpoint::restore(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { line: 2, .. }));
    }

    #[test]
    fn test_delta_must_match_queue_front() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");

        let mut checkpoint = Checkpoint::init(&path, &RunConfig::default(), &sample_state()).unwrap();
        checkpoint.advance("b", &FailureSet::new()).unwrap();
        drop(checkpoint);

        let err = Checkpoint::load(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { line: 2, .. }));
    }

    #[test]
    fn test_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::MissingSnapshot { .. })
        ));

        let json = r#"{"type":"Advance","package":"a","failed":{}}"#;
        fs::write(&path, format!("{}|{}\n", digest(json), json)).unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::MissingSnapshot { .. })
        ));
    }

    #[test]
    fn test_unknown_version_is_fatal() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");
        let json = r#"{"type":"Snapshot","version":99,"created":0}"#;
        fs::write(&path, format!("{}|{}\n", digest(json), json)).unwrap();

        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_remove_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("checkpoint");

        let checkpoint = Checkpoint::init(&path, &RunConfig::default(), &sample_state()).unwrap();
        checkpoint.remove().unwrap();
        assert!(!path.exists());
    }
}
