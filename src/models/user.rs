use serde::Serialize;
use sqlx::FromRow;

// Identity management is an external concern; this table only backs the
// Basic-auth stand-in used by the middleware extractor.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i32,
    pub email: String,
    pub password_plain: Option<String>,
    pub first_name: String,
    pub surname: String,
    pub is_active: bool,
}
