//! Default configuration values

/// Checkpoint file inside the output directory
pub const CHECKPOINT_FILE: &str = "checkpoint";

/// Collapsed build order written at run start
pub const ORDER_FILE: &str = "order.txt";

/// Final failure report written at run completion
pub const REPORT_FILE: &str = "report.json";

/// Per-package logs
pub const LOGS_SUBDIR: &str = "logs";

/// Archived source trees of failed packages
pub const FAILED_SUBDIR: &str = "failed";

/// Default builder work directory
pub const WORK_SUBDIR: &str = "work";

/// Extension of per-package log files
pub const LOG_EXTENSION: &str = "log";
