use serde::{Deserialize, Serialize};

/// One row of a product's specification table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSpecification {
    /// Property name as printed on the certificate, e.g. "Hardness (Shore A)".
    pub property: String,
    #[serde(default)]
    pub unit: String,
    /// Test standard reference, e.g. "ASTM D2240".
    #[serde(default)]
    pub standard: String,
    /// Acceptance expression, e.g. "68±7", "50-90", ">=4", "V-0".
    pub specification: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typical_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Short compound code, unique, e.g. "NBR-70".
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub specifications: Vec<ProductSpecification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub specifications: Vec<ProductSpecification>,
}
