use serde::{Deserialize, Serialize};

/// The `pcd.json` descriptor at the root of a Profilarr-compliant database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    pub profilarr: ProfilarrRequirement,

    pub dependencies: Dependencies,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilarrRequirement {
    pub minimum_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Schema version or reference the database is written against.
    pub schema: String,
}
