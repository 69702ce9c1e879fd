use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{ApiClient, ApiError, RequestAuth};
use crate::models::notification::Notification;

const NOTIFICATIONS_PATH: &str = "/api/v1/notifications";

/// The endpoint answers either with a bare array or with a paged `{items: [...]}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationList {
    Items(Vec<Notification>),
    Paged { items: Vec<Notification> },
}

impl From<NotificationList> for Vec<Notification> {
    fn from(list: NotificationList) -> Self {
        match list {
            NotificationList::Items(items) | NotificationList::Paged { items } => items,
        }
    }
}

#[derive(Clone)]
pub struct NotificationsApi {
    client: ApiClient,
}

impl NotificationsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, auth: &RequestAuth) -> Result<Vec<Notification>, ApiError> {
        let list: NotificationList = self.client.get(NOTIFICATIONS_PATH, &[], auth).await?;
        Ok(list.into())
    }

    pub async fn mark_read(&self, id: &str, auth: &RequestAuth) -> Result<(), ApiError> {
        let _: Value = self
            .client
            .put(&format!("{}/{}/read", NOTIFICATIONS_PATH, id), &json!({}), auth)
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, auth: &RequestAuth) -> Result<(), ApiError> {
        let _: Value = self
            .client
            .put(&format!("{}/read-all", NOTIFICATIONS_PATH), &json!({}), auth)
            .await?;
        Ok(())
    }
}
