use crate::error::{Result, ServiceError};
use crate::models::User;

use super::access::EntityAccessService;

#[derive(Clone)]
pub struct UserService {
    users: EntityAccessService<User>,
}

impl UserService {
    pub fn new(users: EntityAccessService<User>) -> Self {
        Self { users }
    }

    pub fn access(&self) -> &EntityAccessService<User> {
        &self.users
    }

    /// First user registered under `user_name`. Names are not unique.
    pub async fn get_by_username(&self, user_name: &str) -> Result<User> {
        self.users
            .find(|u| u.user_name == user_name)
            .await?
            .into_iter()
            .min_by_key(|u| u.registration_date)
            .ok_or_else(|| {
                ServiceError::not_found("userName", format!("User {user_name} not found"))
            })
    }
}
