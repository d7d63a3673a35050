//! Cleanup of orphaned services and stale unit files
//!
//! A unit file whose definition has been uninstalled is an orphan: the
//! process it recorded (if any) is signalled through the exec core, and the
//! unit file is removed.

use std::fs;

use glob::glob;
use log::{debug, warn};

use crate::exceptions::{LadleError, Result};
use crate::exec::{Invocation, StderrMode, popen_read};
use crate::services::{ServiceRoot, ServiceUnit};

/// Kill orphaned services and remove their unit files
///
/// Returns the names cleaned, in the order the unit files were visited; an
/// empty list means everything was in order. Signalling a process that has
/// already gone away is not an error.
pub fn cleanup(root: &ServiceRoot) -> Result<Vec<String>> {
    let mut cleaned = Vec::new();

    let pattern = root.units_dir().join("*.unit.json");
    let matches = glob(&pattern.to_string_lossy())
        .map_err(|err| LadleError::ServiceError(format!("bad unit pattern: {err}")))?;

    for entry in matches {
        let unit_path =
            entry.map_err(|err| LadleError::ServiceError(format!("unreadable unit: {err}")))?;

        let raw = fs::read_to_string(&unit_path)?;
        let unit: ServiceUnit = match serde_json::from_str(&raw) {
            Ok(unit) => unit,
            Err(err) => {
                warn!("ignoring malformed unit file {unit_path:?}: {err}");
                continue;
            }
        };

        if root.has_definition(&unit.name) {
            continue;
        }

        debug!("cleaning orphaned service {}", unit.name);
        if let Some(pid) = unit.pid {
            kill_recorded_process(&unit.name, pid);
        }
        fs::remove_file(&unit_path)?;
        cleaned.push(unit.name);
    }

    Ok(cleaned)
}

/// Best-effort termination of the pid a unit file recorded
fn kill_recorded_process(name: &str, pid: u32) {
    let pid_arg = pid.to_string();
    let invocation = Invocation::new(["kill", pid_arg.as_str()]).stderr(StderrMode::Discard);
    match popen_read(&invocation) {
        Ok(result) if !result.success() => {
            debug!("service {name}: pid {pid} already gone");
        }
        Ok(_) => {}
        Err(err) => warn!("service {name}: failed to signal pid {pid}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::cleanup;
    use crate::services::tests::{FIXTURE_DEFINITION, fixture_root};

    #[test]
    fn test_cleanup_nothing_to_do() {
        let (_dir, root) = fixture_root();
        fs::write(
            root.definitions_dir().join("fancy.json"),
            FIXTURE_DEFINITION,
        )
        .unwrap();
        fs::write(
            root.units_dir().join("fancy.unit.json"),
            r#"{ "name": "fancy", "pid": 4242 }"#,
        )
        .unwrap();

        let cleaned = cleanup(&root).unwrap();
        assert!(cleaned.is_empty());
        assert!(root.units_dir().join("fancy.unit.json").exists());
    }

    #[test]
    fn test_cleanup_removes_orphaned_unit() {
        let (_dir, root) = fixture_root();
        // No definition for "ghost": its unit is an orphan. No pid recorded,
        // so nothing is signalled.
        fs::write(
            root.units_dir().join("ghost.unit.json"),
            r#"{ "name": "ghost" }"#,
        )
        .unwrap();

        let cleaned = cleanup(&root).unwrap();
        assert_eq!(cleaned, ["ghost"]);
        assert!(!root.units_dir().join("ghost.unit.json").exists());
    }

    #[test]
    fn test_cleanup_keeps_units_with_definitions() {
        let (_dir, root) = fixture_root();
        fs::write(
            root.definitions_dir().join("fancy.json"),
            FIXTURE_DEFINITION,
        )
        .unwrap();
        fs::write(
            root.units_dir().join("fancy.unit.json"),
            r#"{ "name": "fancy" }"#,
        )
        .unwrap();
        fs::write(
            root.units_dir().join("ghost.unit.json"),
            r#"{ "name": "ghost" }"#,
        )
        .unwrap();

        let cleaned = cleanup(&root).unwrap();
        assert_eq!(cleaned, ["ghost"]);
        assert!(root.units_dir().join("fancy.unit.json").exists());
    }

    #[test]
    fn test_cleanup_skips_malformed_units() {
        let (_dir, root) = fixture_root();
        fs::write(root.units_dir().join("broken.unit.json"), "{ not json").unwrap();

        let cleaned = cleanup(&root).unwrap();
        assert!(cleaned.is_empty());
        // Malformed files are left in place for inspection.
        assert!(root.units_dir().join("broken.unit.json").exists());
    }
}
