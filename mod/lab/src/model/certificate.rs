use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Draft => "DRAFT",
            CertificateStatus::PendingApproval => "PENDING_APPROVAL",
            CertificateStatus::Approved => "APPROVED",
            CertificateStatus::Rejected => "REJECTED",
        }
    }
}

/// One printed line of a certificate: the specification row plus the
/// measured result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateLine {
    pub property: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub standard: String,
    pub specification: String,
    /// "-" when the batch recorded no matching measurement.
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub batch_id: String,
    pub reference_no: String,
    pub product_id: String,
    pub product_name: String,
    pub lines: Vec<CertificateLine>,
    pub status: CertificateStatus,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}
