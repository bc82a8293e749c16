use std::sync::Arc;

use async_trait::async_trait;

use super::feed::ChangeFeed;
use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::events::{ChangeAction, Collection};
use crate::models::users::{NewUser, User, UserStatus};
use crate::repositories::{Datastore, UserRepository};
use crate::utils::{paginate, Page, Paged};

#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    pub query: Option<String>,
    pub status: Option<UserStatus>,
    pub page: Page,
}

pub enum UserRequest {
    ListUsers {
        filter: UserFilter,
        response: Reply<Paged<User>>,
    },
    GetUser {
        id: String,
        response: Reply<User>,
    },
    CreateUser {
        user: NewUser,
        response: Reply<User>,
    },
    SetStatus {
        id: String,
        status: UserStatus,
        response: Reply<User>,
    },
    ToggleStatus {
        id: String,
        response: Reply<User>,
    },
}

fn user_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("user not found: {}", id))
}

#[derive(Clone)]
pub struct UserRequestHandler {
    store: Arc<dyn Datastore>,
    feed: ChangeFeed,
}

impl UserRequestHandler {
    pub fn new(store: Arc<dyn Datastore>, feed: ChangeFeed) -> Self {
        UserRequestHandler { store, feed }
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Paged<User>, ServiceError> {
        let query = filter.query.unwrap_or_default();
        let users = self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(|u| filter.status.map_or(true, |status| u.status == status))
            .filter(|u| u.matches(&query))
            .collect();

        Ok(paginate(users, filter.page))
    }

    async fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, ServiceError> {
        new_user.validate()?;

        let user = self.store.insert_user(&new_user).await?;
        log::info!("Registered user {} as {}", user.id, user.account_number);
        self.feed
            .publish(Collection::Users, &user.id, ChangeAction::Created);

        Ok(user)
    }

    async fn set_status(&self, id: &str, status: UserStatus) -> Result<User, ServiceError> {
        let user = self
            .store
            .set_user_status(id, status)
            .await?
            .ok_or_else(|| user_not_found(id))?;
        log::info!("User {} is now {}", user.id, user.status);
        self.feed
            .publish(Collection::Users, &user.id, ChangeAction::Updated);

        Ok(user)
    }

    async fn toggle_status(&self, id: &str) -> Result<User, ServiceError> {
        let user = self
            .store
            .toggle_user_status(id)
            .await?
            .ok_or_else(|| user_not_found(id))?;
        log::info!("User {} toggled to {}", user.id, user.status);
        self.feed
            .publish(Collection::Users, &user.id, ChangeAction::Updated);

        Ok(user)
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::ListUsers { filter, response } => {
                let users = self.list_users(filter).await;
                respond("list users", response, users);
            }
            UserRequest::GetUser { id, response } => {
                let user = self.get_user(&id).await;
                respond("get user", response, user);
            }
            UserRequest::CreateUser { user, response } => {
                let user = self.create_user(user).await;
                respond("create user", response, user);
            }
            UserRequest::SetStatus {
                id,
                status,
                response,
            } => {
                let user = self.set_status(&id, status).await;
                respond("set user status", response, user);
            }
            UserRequest::ToggleStatus { id, response } => {
                let user = self.toggle_status(&id).await;
                respond("toggle user status", response, user);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;

    fn handler() -> UserRequestHandler {
        UserRequestHandler::new(Arc::new(MemoryStore::new()), ChangeFeed::new(16))
    }

    fn new_user(name: &str, email: &str, phone: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn filters_by_query_and_status() {
        let handler = handler();
        handler
            .create_user(new_user("John Doe", "john@example.com", "+2348012345678"))
            .await
            .unwrap();
        let jane = handler
            .create_user(new_user("Jane Smith", "jane@example.com", "+2348023456789"))
            .await
            .unwrap();
        handler.toggle_status(&jane.id).await.unwrap();

        let found = handler
            .list_users(UserFilter {
                query: Some("JOHN".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].name, "John Doe");

        let by_account = handler
            .list_users(UserFilter {
                query: Some("100002".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_account.items[0].id, jane.id);

        let suspended = handler
            .list_users(UserFilter {
                status: Some(UserStatus::Suspended),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(suspended.total, 1);
    }

    #[tokio::test]
    async fn publishes_changes() {
        let handler = handler();
        let mut events = handler.feed.subscribe();

        let user = handler
            .create_user(new_user("John Doe", "john@example.com", "+2348012345678"))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.id, user.id);
        assert_eq!(event.action, ChangeAction::Created);
    }

    #[tokio::test]
    async fn rejects_invalid_and_unknown() {
        let handler = handler();

        let invalid = handler.create_user(new_user("", "nobody", "")).await;
        assert!(matches!(invalid, Err(ServiceError::Invalid(_))));

        let missing = handler.get_user("missing").await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
