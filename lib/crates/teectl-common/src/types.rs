use serde::{Deserialize, Serialize};

/// A single app entry returned by the off-chain `info` endpoint.
///
/// Every field is optional: the API omits fields it has not populated yet
/// (e.g. no IP before the instance boots).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiAppInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Free-form lifecycle label, e.g. `"Deploying"`, `"Running"`, `"Failed"`.
    #[serde(default, alias = "app_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, alias = "machine_type", skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

/// Envelope returned by `GET /info?apps=<address>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfoResponse {
    #[serde(default)]
    pub apps: Vec<ApiAppInfo>,
}

/// An instance type offered by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sku {
    #[serde(alias = "id")]
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcpus: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<u32>,
}

/// Envelope returned by `GET /skus`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkuCatalog {
    #[serde(default)]
    pub skus: Vec<Sku>,
}

/// Document printed by `teectl info --json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppInfoOutput {
    pub app_id: String,
    pub environment: String,
    pub contract_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_status: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

/// Document printed by `teectl deploy --json` and `teectl upgrade --json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseOutput {
    pub app_id: String,
    pub environment: String,
    pub tx_hash: String,
    pub image: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}
