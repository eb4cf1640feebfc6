//! User DTOs - display info attached to messages and participants

use crate::entities::User;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserDTO {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            image: value.image,
        }
    }
}
