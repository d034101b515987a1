//! Test helpers: a context rooted in a scratch directory with scripted commands

use super::context::PipeContext;
use crate::dispatch::ScriptedRunner;
use crate::fs::RealFileSystem;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub(crate) fn context_with(
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

pub(crate) fn context_in(dir: &Path, vars: &[(&str, &str)]) -> (PipeContext, Arc<ScriptedRunner>) {
    context_with(dir, vars, ScriptedRunner::new())
}

pub(crate) fn touch(dir: &Path, relative: &str, content: &str) {
    crate::report::artifact::write_file(&dir.join(relative), content).unwrap();
}
