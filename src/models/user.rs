use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::extract::Validate;
use crate::envelope::{Paginated, Pagination};
use crate::errors::{DomainFailure, ErrorKey, FieldErrors};

/// Body of `POST /users`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Display name, unique across users
    pub name: String,
    /// Initial password
    pub password: String,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut fields = FieldErrors::new();
        if self.name.trim().is_empty() {
            fields.insert("name".to_string(), vec!["name should not be empty".to_string()]);
        }
        if self.password.is_empty() {
            fields.insert(
                "password".to_string(),
                vec!["password should not be empty".to_string()],
            );
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(fields)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory user store backing the demonstration endpoints
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<Vec<User>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<User, DomainFailure> {
        let name = request.name.trim().to_string();
        let mut users = self.users.write().await;

        if users.iter().any(|user| user.name == name) {
            return Err(DomainFailure::new(ErrorKey::DuplicateEntry)
                .with_details(json!({ "field": "name", "value": name })));
        }

        let user = User {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DomainFailure> {
        self.users
            .read()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| {
                DomainFailure::new(ErrorKey::ResourceNotFound)
                    .with_details(json!({ "resource": "user", "id": id }))
            })
    }

    /// One page of users in creation order; `page` starts at 1
    pub async fn list(&self, page: u64, limit: u64) -> Paginated<Vec<User>> {
        let users = self.users.read().await;
        let total = users.len() as u64;
        let skip = usize::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);

        let data = users.iter().skip(skip).take(take).cloned().collect();
        Paginated::new(data, Pagination::new(page, limit, total))
    }
}
