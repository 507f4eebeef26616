//! The test-process environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::runtime::TestRuntime;

const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Run-specific inputs to [`compute_env`].
#[derive(Clone, Debug)]
pub struct EnvInputs<'a> {
    /// The (engine-normalized) toplevel name.
    pub toplevel: &'a str,
    /// The dotted test module name.
    pub test_module: &'a str,
    /// The random seed.
    pub seed: u64,
    /// Where the runtime writes its results.
    pub results_file: &'a Path,
    /// The test runtime.
    pub runtime: &'a TestRuntime,
    /// Directories appended to `PYTHONPATH`.
    pub pythonpath: &'a [PathBuf],
    /// Caller overrides, applied last.
    pub extra_env: &'a BTreeMap<String, String>,
}

/// Where the test runtime writes its results inside `build_dir`.
pub fn results_path(build_dir: &Path) -> PathBuf {
    build_dir.join("results.xml")
}

/// Computes the test process environment from `base` (typically the calling
/// process's environment) without touching the calling process.
pub fn compute_env(base: &BTreeMap<String, String>, inputs: &EnvInputs<'_>) -> BTreeMap<String, String> {
    let mut env = base.clone();

    if !env.contains_key("LIBPYTHON_LOC") {
        if let Some(lib) = &inputs.runtime.libpython {
            env.insert("LIBPYTHON_LOC".into(), lib.display().to_string());
        }
    }

    let libs = inputs.runtime.lib_dir.display().to_string();
    let path = match env.get("PATH") {
        Some(existing) if !existing.is_empty() => format!("{existing}{PATH_SEPARATOR}{libs}"),
        _ => libs,
    };
    env.insert("PATH".into(), path);

    if !inputs.pythonpath.is_empty() {
        let mut entries: Vec<String> = env
            .get("PYTHONPATH")
            .filter(|p| !p.is_empty())
            .map(|p| vec![p.clone()])
            .unwrap_or_default();
        entries.extend(inputs.pythonpath.iter().map(|p| p.display().to_string()));
        env.insert("PYTHONPATH".into(), entries.join(PATH_SEPARATOR));
    }

    env.insert(
        "PYGPI_PYTHON_BIN".into(),
        inputs.runtime.python_bin.display().to_string(),
    );
    env.insert("COCOTB_TOPLEVEL".into(), inputs.toplevel.to_string());
    env.insert("COCOTB_TEST_MODULES".into(), inputs.test_module.to_string());
    env.insert("COCOTB_RANDOM_SEED".into(), inputs.seed.to_string());
    env.insert(
        "COCOTB_RESULTS_FILE".into(),
        inputs.results_file.display().to_string(),
    );

    for (key, value) in inputs.extra_env {
        env.insert(key.clone(), value.clone());
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime(libpython: Option<&str>) -> TestRuntime {
        TestRuntime {
            lib_dir: "/rt/libs".into(),
            share_dir: "/rt/share".into(),
            libpython: libpython.map(PathBuf::from),
            python_bin: "/usr/bin/python3".into(),
        }
    }

    fn base() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("HOME".to_string(), "/home/u".to_string()),
        ])
    }

    #[test]
    fn contract_variables() {
        let rt = runtime(Some("/usr/lib/libpython3.so"));
        let extra = BTreeMap::new();
        let env = compute_env(
            &base(),
            &EnvInputs {
                toplevel: "adder",
                test_module: "tests.test_adder",
                seed: 7,
                results_file: Path::new("/b/results.xml"),
                runtime: &rt,
                pythonpath: &[],
                extra_env: &extra,
            },
        );
        assert_eq!(env["COCOTB_TOPLEVEL"], "adder");
        assert_eq!(env["COCOTB_TEST_MODULES"], "tests.test_adder");
        assert_eq!(env["COCOTB_RANDOM_SEED"], "7");
        assert_eq!(env["COCOTB_RESULTS_FILE"], "/b/results.xml");
        assert_eq!(env["PYGPI_PYTHON_BIN"], "/usr/bin/python3");
        assert_eq!(env["LIBPYTHON_LOC"], "/usr/lib/libpython3.so");
        assert_eq!(env["PATH"], format!("/usr/bin{PATH_SEPARATOR}/rt/libs"));
        assert_eq!(env["HOME"], "/home/u");
        assert!(!env.contains_key("PYTHONPATH"));
    }

    #[test]
    fn existing_libpython_wins_and_unknown_is_unset() {
        let rt = runtime(Some("/found/libpython.so"));
        let extra = BTreeMap::new();
        let mut inherited = base();
        inherited.insert("LIBPYTHON_LOC".into(), "/mine.so".into());
        let inputs = EnvInputs {
            toplevel: "t",
            test_module: "m",
            seed: 0,
            results_file: Path::new("r.xml"),
            runtime: &rt,
            pythonpath: &[],
            extra_env: &extra,
        };
        assert_eq!(compute_env(&inherited, &inputs)["LIBPYTHON_LOC"], "/mine.so");

        let rt = runtime(None);
        let inputs = EnvInputs {
            runtime: &rt,
            ..inputs
        };
        assert!(!compute_env(&base(), &inputs).contains_key("LIBPYTHON_LOC"));
    }

    #[test]
    fn pythonpath_appends() {
        let rt = runtime(None);
        let extra = BTreeMap::new();
        let mut base = base();
        base.insert("PYTHONPATH".into(), "/site".into());
        let dirs = [PathBuf::from("/proj")];
        let env = compute_env(
            &base,
            &EnvInputs {
                toplevel: "t",
                test_module: "m",
                seed: 0,
                results_file: Path::new("r.xml"),
                runtime: &rt,
                pythonpath: &dirs,
                extra_env: &extra,
            },
        );
        assert_eq!(env["PYTHONPATH"], format!("/site{PATH_SEPARATOR}/proj"));
    }

    #[test]
    fn extra_env_overrides_last() {
        let rt = runtime(None);
        let extra = BTreeMap::from([
            ("COCOTB_RANDOM_SEED".to_string(), "99".to_string()),
            ("WIDTH".to_string(), "8".to_string()),
        ]);
        let env = compute_env(
            &BTreeMap::new(),
            &EnvInputs {
                toplevel: "t",
                test_module: "m",
                seed: 1,
                results_file: Path::new("r.xml"),
                runtime: &rt,
                pythonpath: &[],
                extra_env: &extra,
            },
        );
        assert_eq!(env["COCOTB_RANDOM_SEED"], "99");
        assert_eq!(env["WIDTH"], "8");
        assert_eq!(env["PATH"], "/rt/libs");
    }

    #[test]
    fn results_path_in_build_dir() {
        assert_eq!(results_path(Path::new("/b")), PathBuf::from("/b/results.xml"));
    }
}
