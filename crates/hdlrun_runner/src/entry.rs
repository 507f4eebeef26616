//! Resolving the test entry into an importable module name.
//!
//! The test runtime imports tests by dotted module name. A caller may instead
//! name the test file; its module name is then derived from the package
//! structure (`__init__.py` files) below the first search path containing it,
//! and that search path must be importable from the test process. Files
//! outside any package are imported from their own directory.

use std::path::{Path, PathBuf};

use crate::error::RunError;

/// An importable test module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestEntry {
    /// The dotted module name.
    pub module: String,
    /// The directory the module is importable from, if it has to be added to
    /// the Python path.
    pub pythonpath: Option<PathBuf>,
}

/// Resolves `entry`, either a module name or an absolute `.py` path.
pub fn resolve_test_entry(entry: &str, search_paths: &[PathBuf]) -> Result<TestEntry, RunError> {
    if entry.is_empty() {
        return Err(RunError::Configuration("no test module given".to_string()));
    }

    let looks_like_path = entry.contains('/') || entry.contains('\\') || entry.ends_with(".py");
    if !looks_like_path {
        return Ok(TestEntry {
            module: entry.to_string(),
            pythonpath: None,
        });
    }

    let path = Path::new(entry);
    let ext_ok = matches!(path.extension().and_then(|e| e.to_str()), None | Some("py"));
    if !path.is_absolute() || !ext_ok {
        return Err(RunError::Configuration(format!(
            "test file must be an absolute path, not {entry}"
        )));
    }
    Ok(module_from_file(path, search_paths))
}

fn module_from_file(path: &Path, search_paths: &[PathBuf]) -> TestEntry {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = path.parent().unwrap_or(Path::new("/"));

    for root in search_paths {
        let Ok(rel) = dir.strip_prefix(root) else {
            continue;
        };
        if let Some(packages) = package_chain(root, rel) {
            let mut parts = packages;
            parts.push(stem);
            return TestEntry {
                module: parts.join("."),
                pythonpath: Some(root.clone()),
            };
        }
    }

    TestEntry {
        module: stem,
        pythonpath: Some(dir.to_path_buf()),
    }
}

/// The package names leading from `root` to `root/rel`, if every level is a package.
fn package_chain(root: &Path, rel: &Path) -> Option<Vec<String>> {
    let mut current = root.to_path_buf();
    let mut names = Vec::new();
    for component in rel.components() {
        current.push(component);
        if !current.join("__init__.py").is_file() {
            return None;
        }
        names.push(component.as_os_str().to_string_lossy().into_owned());
    }
    Some(names)
}
