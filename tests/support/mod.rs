//! Shared helpers for integration tests
#![allow(dead_code)]

use pipekit::dispatch::ScriptedRunner;
use pipekit::fs::RealFileSystem;
use pipekit::PipeContext;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Pipe context rooted at `dir`, driven by scripted commands
pub fn context(
    dir: &Path,
    vars: &[(&str, &str)],
    runner: ScriptedRunner,
) -> (PipeContext, Arc<ScriptedRunner>) {
    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.entry("WORKING_DIR".to_string())
        .or_insert_with(|| dir.display().to_string());

    let runner = Arc::new(runner);
    let ctx = PipeContext::new(Arc::new(env), Arc::new(RealFileSystem::new()), runner.clone());
    (ctx, runner)
}

pub fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write fixture file");
}

/// Parses `build-info/<pipe>-info.txt` back into a map
pub fn build_info(dir: &Path, pipe: &str) -> HashMap<String, String> {
    let path = dir.join("build-info").join(format!("{}-info.txt", pipe));
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    content
        .lines()
        .map(|line| {
            let (key, value) = line
                .split_once('=')
                .unwrap_or_else(|| panic!("Malformed build-info line: {}", line));
            (key.to_string(), value.to_string())
        })
        .collect()
}

pub fn report_json(dir: &Path, pipe: &str) -> serde_json::Value {
    let path = dir.join("build-info").join(format!("{}-report.json", pipe));
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).expect("Report is not valid JSON")
}
