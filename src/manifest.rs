//! Package manifest editing on top of the JSON document model.
//!
//! A manifest is a JSON object whose `"dependencies"` entry maps package names
//! to version strings. Only that entry is touched; everything else, including
//! key order, is written back as it was read.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::serialize::serialize_object_with;
use crate::{parse, AccessError, Formatting, JsonObject, ParseError, Value, ValueKind};

pub const DEPENDENCIES_KEY: &str = "dependencies";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("document root must be {expected}, found {found}")]
    UnexpectedRoot {
        expected: ValueKind,
        found: ValueKind,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    root: JsonObject,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        match parse(text)? {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ManifestError::UnexpectedRoot {
                expected: ValueKind::Object,
                found: other.kind(),
            }),
        }
    }

    pub fn root(&self) -> &JsonObject {
        &self.root
    }

    pub fn dependencies(&self) -> Result<&JsonObject, AccessError> {
        self.root.get::<JsonObject>(DEPENDENCIES_KEY)
    }

    pub fn dependencies_mut(&mut self) -> Result<&mut JsonObject, AccessError> {
        self.root.get_mut::<JsonObject>(DEPENDENCIES_KEY)
    }

    pub fn dependency_version(&self, name: &str) -> Result<&str, AccessError> {
        self.dependencies()?.get::<str>(name)
    }

    /// Points `name` at `version`. Known packages keep their place in the
    /// list, new ones are appended. Returns what was stored before.
    pub fn set_dependency(
        &mut self,
        name: &str,
        version: &str,
    ) -> Result<Option<Value>, AccessError> {
        let dependencies = self.dependencies_mut()?;
        Ok(dependencies.insert(name, version))
    }

    pub fn apply(&mut self, updates: &[PackageUpdate]) -> Result<(), AccessError> {
        log::debug!("manifest before: {}", self.root);
        for update in updates {
            self.set_dependency(&update.name, &update.new_version)?;
        }
        log::debug!("manifest after: {}", self.root);
        log::info!("{}", update_summary(updates).trim_end());
        Ok(())
    }

    /// The whole manifest as indented JSON.
    pub fn to_json(&self) -> String {
        self.to_json_with(Formatting::default())
    }

    pub fn to_json_with(&self, formatting: Formatting) -> String {
        serialize_object_with(&self.root, formatting)
    }
}

/// Where the package manager resolved a package from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSource {
    Registry,
    BuiltIn,
    Embedded,
    Local,
    LocalTarball,
    Git,
    Unknown,
}

impl FromStr for PackageSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let source = match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "registry" => PackageSource::Registry,
            "builtin" => PackageSource::BuiltIn,
            "embedded" => PackageSource::Embedded,
            "local" => PackageSource::Local,
            "localtarball" => PackageSource::LocalTarball,
            "git" => PackageSource::Git,
            _ => PackageSource::Unknown,
        };
        Ok(source)
    }
}

/// An installed package as reported by the package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub latest_compatible: String,
    pub source: PackageSource,
}

impl PackageInfo {
    /// Reads `{"name", "version", "latestCompatible", "source"}`.
    pub fn from_json(object: &JsonObject) -> Result<Self, AccessError> {
        let source = match object.get_value("source") {
            None => PackageSource::Unknown,
            Some(value) => value
                .try_as::<str>()?
                .parse()
                .unwrap_or(PackageSource::Unknown),
        };
        Ok(Self {
            name: object.get::<str>("name")?.to_string(),
            version: object.get::<str>("version")?.to_string(),
            latest_compatible: object.get::<str>("latestCompatible")?.to_string(),
            source,
        })
    }

    /// Reads a JSON array of package objects.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>, ManifestError> {
        let document = parse(text)?;
        let packages = document
            .as_array()
            .ok_or(ManifestError::UnexpectedRoot {
                expected: ValueKind::Array,
                found: document.kind(),
            })?;

        let mut list = Vec::with_capacity(packages.len());
        for index in 0..packages.len() {
            list.push(Self::from_json(packages.get::<JsonObject>(index)?)?);
        }
        Ok(list)
    }

    fn is_preview(version: &str) -> bool {
        version.contains("preview")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
    pub name: String,
    pub current_version: String,
    pub new_version: String,
}

impl From<&PackageInfo> for PackageUpdate {
    fn from(info: &PackageInfo) -> Self {
        Self {
            name: info.name.clone(),
            current_version: info.version.clone(),
            new_version: info.latest_compatible.clone(),
        }
    }
}

impl fmt::Display for PackageUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.name, self.current_version, self.new_version
        )
    }
}

/// An available update and whether it should be applied by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCandidate {
    pub update: PackageUpdate,
    pub selected: bool,
}

/// Picks the registry packages that have a newer compatible version.
///
/// Stable targets are selected. A preview target is only offered, unselected,
/// to packages that are already on a preview.
pub fn select_updates(packages: &[PackageInfo]) -> Vec<UpdateCandidate> {
    packages
        .iter()
        .filter(|info| info.source == PackageSource::Registry)
        .filter(|info| info.version != info.latest_compatible)
        .filter_map(|info| {
            let selected = if !PackageInfo::is_preview(&info.latest_compatible) {
                true
            } else if PackageInfo::is_preview(&info.version) {
                false
            } else {
                log::debug!("skipping preview {} for {}", info.latest_compatible, info.name);
                return None;
            };
            Some(UpdateCandidate {
                update: PackageUpdate::from(info),
                selected,
            })
        })
        .collect()
}

pub fn update_summary(updates: &[PackageUpdate]) -> String {
    let mut summary = String::from("Updating the following packages:\n");
    for update in updates {
        summary.push_str(&update.to_string());
        summary.push('\n');
    }
    summary
}
