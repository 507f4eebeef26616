//! `hdlrun check`: validate run profiles without staging or running them.

use std::error::Error;

use hdlrun_config::resolve_run;

use crate::project::{build_request, Project};
use crate::run::render_diagnostics;
use crate::{CheckArgs, GlobalArgs};

/// Runs the `hdlrun check` command.
///
/// Checks the named profile, or `[run]` followed by every `[runs.<name>]`
/// profile. Returns exit code 0 if all of them resolve, 1 otherwise.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::load(global)?;
    let coordinator = project.coordinator()?;

    let names: Vec<Option<&str>> = match &args.name {
        Some(name) => vec![Some(name.as_str())],
        None => std::iter::once(None)
            .chain(project.config.runs.keys().map(|k| Some(k.as_str())))
            .collect(),
    };

    let mut failed = 0;
    for name in names {
        let label = name.unwrap_or("[run]");
        let outcome = resolve_run(&project.config, name)
            .map_err(Box::<dyn Error>::from)
            .and_then(|resolved| build_request(resolved.profile))
            .and_then(|request| coordinator.check(&request).map_err(Into::into));
        match outcome {
            Ok(warnings) => {
                render_diagnostics(&warnings, global.color);
                if !global.quiet {
                    eprintln!("     Checked {label}");
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("error: {label}: {e}");
            }
        }
    }

    Ok(if failed == 0 { 0 } else { 1 })
}
