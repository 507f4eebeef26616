//! `hdlrun engines`: list the simulators hdlrun can drive.

use std::error::Error;

use hdlrun_engine::{EngineProfile, PROFILES};

use crate::project::Project;
use crate::GlobalArgs;

/// Runs the `hdlrun engines` command.
///
/// Prints one line per built-in engine, then one per template engine
/// configured in `hdlrun.toml`.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::load(global)?;
    for profile in PROFILES.iter() {
        println!("{}", builtin_line(profile));
    }
    for name in project.config.engines.keys() {
        if PROFILES.iter().any(|p| p.name == name.as_str()) {
            println!("{name:<10} (built-in, command template overridden)");
        } else {
            println!("{name:<10} (command template)");
        }
    }
    Ok(0)
}

fn builtin_line(profile: &EngineProfile) -> String {
    let languages: Vec<_> = profile.languages.iter().map(|l| l.tag()).collect();
    let formats: Vec<_> = profile
        .formats
        .iter()
        .map(|f| match &profile.degraded {
            Some(d) if d.format == *f => format!("{f} (degraded)"),
            _ => f.to_string(),
        })
        .collect();
    format!(
        "{:<10} languages: {:<14} waveforms: {}",
        profile.name,
        languages.join(", "),
        formats.join(", ")
    )
}
