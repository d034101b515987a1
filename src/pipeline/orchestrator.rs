//! Single top-level handler for a pipe run
//!
//! Runs the pipe, folds any error into the report, and writes
//! `<pipe>-info.txt` plus `<pipe>-report.json` whatever the outcome.

use super::context::PipeContext;
use super::pipe_trait::Pipe;
use crate::report::artifact::write_json;
use crate::report::PipeReport;
use crate::error::PipeError;
use chrono::{SecondsFormat, Utc};
use std::time::Instant;
use tracing::{debug, error, info};

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn run_pipe(pipe: &dyn Pipe, ctx: &mut PipeContext) -> PipeReport {
    let start = Instant::now();
    info!("Starting {} pipe in {}", pipe.name(), ctx.working_dir().display());
    debug!("{}", ctx.common);

    ctx.report = PipeReport::new(pipe.name());
    if let Err(err) = pipe.run(ctx) {
        error!("{} pipe failed: {}", pipe.name(), err);
        ctx.report.set_error(&err);
    }

    if let Err(err) = write_artifacts(ctx) {
        error!("Failed to write artifacts: {:#}", err);
        if ctx.report.error.is_none() {
            ctx.report.set_error(&PipeError::Other(err));
        }
    }

    info!(
        "{} pipe finished: {} in {:.1}s",
        pipe.name(),
        ctx.report.status(),
        start.elapsed().as_secs_f64()
    );
    ctx.report.clone()
}

fn write_artifacts(ctx: &PipeContext) -> anyhow::Result<()> {
    let dir = ctx.common.build_info_path();
    let report = &ctx.report;
    let info_path = report.build_info(&timestamp()).write(&dir, &report.pipe)?;
    let json_path = dir.join(format!("{}-report.json", report.pipe));
    write_json(&json_path, report)?;
    debug!(
        info = %info_path.display(),
        report = %json_path.display(),
        "Artifacts written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::context_in;
    use crate::report::GateResult;
    use tempfile::TempDir;

    struct FailingPipe;

    impl Pipe for FailingPipe {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
            ctx.report.set("STEP", "before-error");
            Err(crate::config::ConfigError::missing("IMAGE_NAME").into())
        }
    }

    struct PassingPipe;

    impl Pipe for PassingPipe {
        fn name(&self) -> &'static str {
            "passing"
        }

        fn run(&self, ctx: &mut PipeContext) -> Result<(), PipeError> {
            ctx.report.gate(GateResult::passed("noop", "ok"));
            Ok(())
        }
    }

    #[test]
    fn test_artifacts_written_on_error() {
        let temp = TempDir::new().unwrap();
        let (mut ctx, _) = context_in(temp.path(), &[]);
        let report = run_pipe(&FailingPipe, &mut ctx);
        assert_eq!(report.exit_code(), 1);

        let info = std::fs::read_to_string(temp.path().join("build-info/failing-info.txt")).unwrap();
        assert!(info.contains("PIPE=failing\n"));
        assert!(info.contains("STATUS=failed\n"));
        assert!(info.contains("EXIT_CODE=1\n"));
        assert!(info.contains("STEP=before-error\n"));
        assert!(info.contains("ERROR_KIND=configuration\n"));

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("build-info/failing-report.json")).unwrap(),
        )
        .unwrap();
        assert!(json["error"]["message"].as_str().unwrap().contains("IMAGE_NAME"));
    }

    #[test]
    fn test_passing_run() {
        let temp = TempDir::new().unwrap();
        let (mut ctx, _) = context_in(temp.path(), &[("BUILD_INFO_DIR", "out")]);
        let report = run_pipe(&PassingPipe, &mut ctx);
        assert_eq!(report.exit_code(), 0);
        let info = std::fs::read_to_string(temp.path().join("out/passing-info.txt")).unwrap();
        assert!(info.contains("STATUS=passed\n"));
        assert!(info.contains("TIMESTAMP="));
    }

    #[test]
    fn test_timestamp_is_utc_seconds() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00Z".len());
    }
}
