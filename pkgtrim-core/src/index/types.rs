use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub dependencies: Vec<String>,
    pub provides: Vec<String>,
}

impl PackageRecord {
    pub fn new(name: &str, version: &str) -> Self {
        PackageRecord {
            name: name.to_string(),
            version: version.to_string(),
            arch: None,
            origin: None,
            dependencies: Vec::new(),
            provides: Vec::new(),
        }
    }
}

/// All package records read from one repository's index.
#[derive(Clone, Debug)]
pub struct RepositoryIndex {
    pub url: String,
    pub packages: Vec<PackageRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct IndexRequest {
    pub repositories: Vec<String>,
    /// Signing keys by file name. Signatures are not verified for
    /// dependency analysis; the keys are accepted for parity with
    /// repository configuration.
    pub keys: BTreeMap<String, Vec<u8>>,
    pub arch: String,
}

impl IndexRequest {
    pub fn new(repositories: Vec<String>, arch: &str) -> Self {
        IndexRequest {
            repositories,
            keys: BTreeMap::new(),
            arch: arch.to_string(),
        }
    }
}
