use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to serialize manifest: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("manifest name must not be empty")]
    EmptyName,
    #[error("empty identifier in [{section}]")]
    EmptyId { section: &'static str },
}

/// An installable application or runtime.
///
/// Applications and runtimes share one shape; they differ only by which
/// catalog section they are published in. `runtime` names the id of another
/// runtime that must be installed (and launched) first.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Package {
    /// Filled from the table key on parse; never written to the document.
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Package {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_owned(),
            kind: kind.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: &str) -> Self {
        self.runtime = Some(runtime.to_owned());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Human-readable label, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Server {
    #[serde(skip)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: String,
    /// Client application id used to connect to this server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    pub fn new(id: &str, address: &str) -> Self {
        Self {
            id: id.to_owned(),
            address: address.to_owned(),
            ..Self::default()
        }
    }
}

/// On-disk document layout. `source` is not part of the document: it is
/// whatever location the bytes were read from.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ManifestDocument {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    applications: BTreeMap<String, Package>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    runtimes: BTreeMap<String, Package>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    servers: BTreeMap<String, Server>,
}

/// A parsed manifest attributed to the source it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub source: String,
    pub name: String,
    pub applications: BTreeMap<String, Package>,
    pub runtimes: BTreeMap<String, Package>,
    pub servers: BTreeMap<String, Server>,
}

impl Manifest {
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            source: source.to_owned(),
            name: name.to_owned(),
            applications: BTreeMap::new(),
            runtimes: BTreeMap::new(),
            servers: BTreeMap::new(),
        }
    }

    pub fn insert_application(&mut self, package: Package) {
        self.applications.insert(package.id.clone(), package);
    }

    pub fn insert_runtime(&mut self, package: Package) {
        self.runtimes.insert(package.id.clone(), package);
    }

    pub fn insert_server(&mut self, server: Server) {
        self.servers.insert(server.id.clone(), server);
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.runtimes.is_empty() && self.servers.is_empty()
    }

    pub fn to_toml_string(&self) -> Result<String, ManifestError> {
        let doc = ManifestDocument {
            name: self.name.clone(),
            applications: self.applications.clone(),
            runtimes: self.runtimes.clone(),
            servers: self.servers.clone(),
        };
        Ok(toml::to_string_pretty(&doc)?)
    }

    fn from_document(doc: ManifestDocument, source: &str) -> Result<Self, ManifestError> {
        if doc.name.trim().is_empty() {
            return Err(ManifestError::EmptyName);
        }

        let applications = keyed_packages(doc.applications, "applications")?;
        let runtimes = keyed_packages(doc.runtimes, "runtimes")?;

        let mut servers = BTreeMap::new();
        for (id, mut server) in doc.servers {
            if id.is_empty() {
                return Err(ManifestError::EmptyId { section: "servers" });
            }
            server.id.clone_from(&id);
            servers.insert(id, server);
        }

        Ok(Self {
            source: source.to_owned(),
            name: doc.name,
            applications,
            runtimes,
            servers,
        })
    }
}

fn keyed_packages(
    section: BTreeMap<String, Package>,
    name: &'static str,
) -> Result<BTreeMap<String, Package>, ManifestError> {
    let mut out = BTreeMap::new();
    for (id, mut package) in section {
        if id.is_empty() {
            return Err(ManifestError::EmptyId { section: name });
        }
        package.id.clone_from(&id);
        out.insert(id, package);
    }
    Ok(out)
}

pub fn parse_manifest_str(input: &str, source: &str) -> Result<Manifest, ManifestError> {
    let doc: ManifestDocument = toml::from_str(input)?;
    Manifest::from_document(doc, source)
}

pub fn parse_manifest_bytes(input: &[u8], source: &str) -> Result<Manifest, ManifestError> {
    parse_manifest_str(std::str::from_utf8(input)?, source)
}

pub fn parse_manifest_file(path: impl AsRef<Path>, source: &str) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content, source)
}
