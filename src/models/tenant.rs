use serde::{Deserialize, Serialize};

/// A clinic the current user may act within.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenantOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The tenant to activate when none is selected: the flagged default, else the first.
pub fn preferred_tenant(tenants: &[TenantOption]) -> Option<&TenantOption> {
    tenants
        .iter()
        .find(|t| t.is_default)
        .or_else(|| tenants.first())
}
