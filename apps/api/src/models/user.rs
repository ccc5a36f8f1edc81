use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// The authenticated caller, as resolved from the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
}
