use chrono::{DateTime, SecondsFormat, Utc};

use crate::client::{ApiClient, ApiError, RequestAuth};
use crate::models::analytics::{
    ClinicalAnalytics, DashboardMetrics, PainMapAnalytics, UnifiedAnalytics,
};

const ANALYTICS_BASE: &str = "/api/clinic-analytics";
const DEFAULT_UNIFIED_DAYS: u32 = 30;

fn iso(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn range_query(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(from) = from {
        query.push(("from", iso(&from)));
    }
    if let Some(to) = to {
        query.push(("to", iso(&to)));
    }
    query
}

/// Read-only clinic analytics. All calls retry transient failures.
#[derive(Clone)]
pub struct AnalyticsApi {
    client: ApiClient,
}

impl AnalyticsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn dashboard(
        &self,
        date: Option<DateTime<Utc>>,
        auth: &RequestAuth,
    ) -> Result<DashboardMetrics, ApiError> {
        let query: Vec<_> = date.map(|d| ("date", iso(&d))).into_iter().collect();
        self.client
            .get(&format!("{}/dashboard", ANALYTICS_BASE), &query, auth)
            .await
    }

    pub async fn clinical(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        auth: &RequestAuth,
    ) -> Result<ClinicalAnalytics, ApiError> {
        self.client
            .get(
                &format!("{}/clinical", ANALYTICS_BASE),
                &range_query(from, to),
                auth,
            )
            .await
    }

    pub async fn pain_maps(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        auth: &RequestAuth,
    ) -> Result<PainMapAnalytics, ApiError> {
        self.client
            .get(
                &format!("{}/pain-maps", ANALYTICS_BASE),
                &range_query(from, to),
                auth,
            )
            .await
    }

    /// `days` defaults to 30.
    pub async fn unified(
        &self,
        days: Option<u32>,
        auth: &RequestAuth,
    ) -> Result<UnifiedAnalytics, ApiError> {
        let days = days.unwrap_or(DEFAULT_UNIFIED_DAYS);
        self.client
            .get(
                &format!("{}/unified", ANALYTICS_BASE),
                &[("days", days.to_string())],
                auth,
            )
            .await
    }
}
