use crate::client::{ApiClient, ApiError, RequestAuth};
use crate::models::TenantOption;

const TENANTS_PATH: &str = "/tenants";

#[derive(Clone)]
pub struct TenantsApi {
    client: ApiClient,
}

impl TenantsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, auth: &RequestAuth) -> Result<Vec<TenantOption>, ApiError> {
        self.client.get(TENANTS_PATH, &[], auth).await
    }
}
