//! `hdlrun run`: run one simulation.
//!
//! Resolves the selected run profile, overlays the command-line flags, and
//! hands the request to the coordinator. Diagnostics are rendered to stderr;
//! the exit code is 0 when build and test succeeded and 1 otherwise.

use std::error::Error;

use hdlrun_config::resolve_run;
use hdlrun_diagnostics::{Diagnostic, DiagnosticRenderer, TerminalRenderer};
use hdlrun_runner::RunResult;

use crate::project::{build_request, describe, Project};
use crate::{GlobalArgs, RunArgs};

/// Runs the `hdlrun run` command.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::load(global)?;
    let resolved = resolve_run(&project.config, args.name.as_deref())?;
    let request = build_request(resolved.profile.overlay(&args.overrides()))?;
    let coordinator = project.coordinator()?;

    if !global.quiet {
        eprintln!("   Simulating {} with {}", describe(&request), request.engine);
    }

    let result = coordinator.run(&request)?;
    render_diagnostics(&result.diagnostics, global.color);
    report(&result, global);
    Ok(if result.success { 0 } else { 1 })
}

/// Renders diagnostics to stderr and returns how many were printed.
pub fn render_diagnostics(diagnostics: &[Diagnostic], color: bool) -> usize {
    let renderer = TerminalRenderer::new(color);
    for diag in diagnostics {
        eprintln!("{}", renderer.render(diag));
    }
    diagnostics.len()
}

fn report(result: &RunResult, global: &GlobalArgs) {
    if !result.success {
        let message = result.message.as_deref().unwrap_or("Test failed");
        eprintln!("error: {message}");
        eprintln!("       (seed {}; rerun with --seed {} to reproduce)", result.seed, result.seed);
        return;
    }
    if global.quiet {
        return;
    }
    if let Some(language) = result.language {
        eprintln!("   Converted design to {language}");
    }
    if let Some(path) = &result.waveform {
        eprintln!("       Wrote {}", path.display());
    }
    eprintln!("    Finished {} (seed {})", result.engine, result.seed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdlrun_diagnostics::DiagnosticCode;

    #[test]
    fn render_counts_diagnostics() {
        let diags = vec![
            Diagnostic::warning(DiagnosticCode::UNKNOWN_SIMULATOR, "using unknown simulator: questa"),
            Diagnostic::warning(DiagnosticCode::WAVEFORM_MISSING, "failed to find waveform output file"),
        ];
        assert_eq!(render_diagnostics(&diags, false), 2);
    }

    #[test]
    fn unknown_run_is_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hdlrun.toml"), "[run]\nengine = \"icarus\"\n").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(tmp.path().join("hdlrun.toml").display().to_string()),
        };
        let args = RunArgs {
            name: Some("nightly".into()),
            ..RunArgs::default()
        };
        let err = run(&args, &global).unwrap_err();
        assert_eq!(err.to_string(), "unknown run 'nightly'");
    }

    #[test]
    fn invalid_request_fails_before_running() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("hdlrun.toml"),
            "[run]\nengine = \"nvc\"\ntoplevel = \"adder\"\ntest_module = \"t\"\nvcd_file = \"adder.vcd\"\n\n[run.sources]\nvhdl = [\"adder.vhd\"]\n",
        )
        .unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(tmp.path().display().to_string()),
        };
        let err = run(&RunArgs::default(), &global).unwrap_err();
        assert!(err.to_string().contains("nvc doesn't support .vcd"));
    }
}
