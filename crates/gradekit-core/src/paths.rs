use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Sentinels and artifact names written by the per-repository grading script
// ---------------------------------------------------------------------------

pub const SUCCESS_SENTINEL: &str = "SUCCESS";
pub const FAILED_SENTINEL: &str = "FAILED";

pub const PASS_DIR: &str = "PASS";
pub const FAIL_DIR: &str = "FAIL";

pub const SIMILARITY_DIR: &str = "Mossbox";

pub const CONFIG_FILE: &str = "gradekit.yaml";
pub const HOME_CONFIG_DIR: &str = ".gradekit";
pub const HOME_CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Basename of a checkout directory, used as the stem of every artifact name.
pub fn basename(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn success_log_name(base: &str) -> String {
    format!("{base}.log.success")
}

pub fn failed_log_name(base: &str) -> String {
    format!("{base}.log.failed")
}

/// Name of a collected log inside PASS/ or FAIL/.
pub fn collected_log_name(base: &str) -> String {
    format!("{base}.log")
}

pub fn grade_fragment_name(base: &str) -> String {
    format!("{base}_Grade.json")
}

pub fn pass_dir(output_root: &Path) -> PathBuf {
    output_root.join(PASS_DIR)
}

pub fn fail_dir(output_root: &Path) -> PathBuf {
    output_root.join(FAIL_DIR)
}

pub fn project_dir(workdir: &Path, project: &str) -> PathBuf {
    workdir.join(project)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
