//! Service definition listing
//!
//! A service installation is two directories. `definitions` holds one JSON
//! document per installed service; `units` holds a unit file for every
//! loaded service, recording the process it started. Listing is plain data
//! manipulation over those files; anything that has to touch a running
//! process goes through the exec core.

mod cleanup;

pub use cleanup::cleanup;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::exceptions::Result;
use crate::utils::get_data_dir;

/// An installed service definition document
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
    /// Service name, matching the definition file stem
    pub name: String,
    /// Optional version string
    #[serde(default)]
    pub version: Option<String>,
    /// Command the service runs, as an ordered token list
    pub run: Vec<String>,
    /// Environment overrides for the service process
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Unit file written when a service is loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUnit {
    /// Name of the service the unit belongs to
    pub name: String,
    /// Pid of the started process, when one was recorded
    #[serde(default)]
    pub pid: Option<u32>,
}

/// The two directories making up a service installation
#[derive(Debug, Clone)]
pub struct ServiceRoot {
    definitions_dir: PathBuf,
    units_dir: PathBuf,
}

/// An installed definition together with its loaded state
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    /// The decoded definition document
    pub definition: ServiceDefinition,
    /// Where the definition was read from
    pub definition_path: PathBuf,
    /// The decoded unit file, when the service is loaded
    pub unit: Option<ServiceUnit>,
    /// Where the unit file lives (whether or not it exists)
    pub unit_path: PathBuf,
    root_owned: bool,
}

impl ServiceEntry {
    /// Whether a unit file exists for this service
    pub fn loaded(&self) -> bool {
        self.unit.is_some()
    }

    /// Pid recorded in the unit file, if any
    pub fn pid(&self) -> Option<u32> {
        self.unit.as_ref().and_then(|unit| unit.pid)
    }
}

/// One row of `services list` output
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Whether a unit file exists
    pub loaded: bool,
    /// Pid recorded in the unit file, if any
    pub pid: Option<u32>,
    /// Path of the definition document
    pub definition_path: PathBuf,
    /// Path of the unit file, when loaded
    pub unit_path: Option<PathBuf>,
}

impl ServiceRoot {
    /// A root with explicit directories
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(definitions_dir: P, units_dir: Q) -> Self {
        ServiceRoot {
            definitions_dir: definitions_dir.into(),
            units_dir: units_dir.into(),
        }
    }

    /// The root under the ladle data directory
    pub fn from_env() -> Self {
        let data = get_data_dir();
        ServiceRoot::new(data.join("services"), data.join("units"))
    }

    /// Directory holding definition documents
    pub fn definitions_dir(&self) -> &Path {
        &self.definitions_dir
    }

    /// Directory holding unit files
    pub fn units_dir(&self) -> &Path {
        &self.units_dir
    }

    pub(crate) fn unit_path(&self, name: &str) -> PathBuf {
        self.units_dir.join(format!("{name}.unit.json"))
    }

    pub(crate) fn has_definition(&self, name: &str) -> bool {
        self.definitions_dir.join(format!("{name}.json")).is_file()
    }

    /// All installed services, with optional filters applied
    ///
    /// Sorted by name. `loaded` keeps only services whose loaded state
    /// matches; `skip_root` drops services whose definition file is owned
    /// by root. Unreadable or malformed definition documents are skipped
    /// with a warning rather than failing the whole listing.
    pub fn available_services(
        &self,
        loaded: Option<bool>,
        skip_root: bool,
    ) -> Result<Vec<ServiceEntry>> {
        let mut services = Vec::new();
        let entries = match fs::read_dir(&self.definitions_dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(services),
        };

        for dir_entry in entries {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(entry) = self.read_entry(&path) else {
                continue;
            };
            services.push(entry);
        }

        services.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));

        if let Some(wanted) = loaded {
            services.retain(|service| service.loaded() == wanted);
        }
        if skip_root {
            services.retain(|service| !service.root_owned);
        }

        Ok(services)
    }

    fn read_entry(&self, path: &Path) -> Option<ServiceEntry> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("skipping unreadable definition {path:?}: {err}");
                return None;
            }
        };
        let definition: ServiceDefinition = match serde_json::from_str(&raw) {
            Ok(definition) => definition,
            Err(err) => {
                warn!("skipping malformed definition {path:?}: {err}");
                return None;
            }
        };

        let root_owned = definition_owned_by_root(path);
        let unit_path = self.unit_path(&definition.name);
        let unit = read_unit(&unit_path);

        Some(ServiceEntry {
            definition,
            definition_path: path.to_path_buf(),
            unit,
            unit_path,
            root_owned,
        })
    }
}

/// List all installed services with status, pid, and file locations
pub fn services_list(root: &ServiceRoot) -> Result<Vec<ServiceInfo>> {
    let services = root.available_services(None, false)?;
    Ok(services
        .into_iter()
        .map(|entry| {
            let loaded = entry.loaded();
            ServiceInfo {
                name: entry.definition.name,
                loaded,
                pid: entry.unit.as_ref().and_then(|unit| unit.pid),
                definition_path: entry.definition_path,
                unit_path: loaded.then_some(entry.unit_path),
            }
        })
        .collect())
}

fn read_unit(path: &Path) -> Option<ServiceUnit> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(unit) => Some(unit),
        Err(err) => {
            warn!("ignoring malformed unit file {path:?}: {err}");
            None
        }
    }
}

fn definition_owned_by_root(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).map(|meta| meta.uid() == 0).unwrap_or(false)
}
