use super::DBClient;
use crate::models::{User, UserRole};

/// User database operations.
pub trait UserExt {
    async fn get_user_by_id(&self, user_id: i32) -> Result<Option<User>, sqlx::Error>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;

    async fn save_user(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error>;

    async fn get_users(&self) -> Result<Vec<User>, sqlx::Error>;

    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    async fn delete_user(&self, user_id: i32) -> Result<(), sqlx::Error>;

    /// Number of Admin accounts other than `user_id`. Used by the
    /// last-admin deletion guard.
    async fn count_other_admins(&self, user_id: i32) -> Result<i64, sqlx::Error>;

    /// Whether the user owns products, appears on any order in any role,
    /// or has authored reviews.
    async fn user_has_dependents(&self, user_id: i32) -> Result<bool, sqlx::Error>;
}

const USER_COLUMNS: &str = "id, username, password, role, created_at";

impl UserExt for DBClient {
    async fn get_user_by_id(&self, user_id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn save_user(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }

    async fn delete_user(&self, user_id: i32) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn count_other_admins(&self, user_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'Admin' AND id != $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn user_has_dependents(&self, user_id: i32) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE artisan_id = $1) \
                 OR EXISTS(SELECT 1 FROM orders WHERE client_id = $1 \
                     OR artisan_id = $1 OR delivery_partner_id = $1) \
                 OR EXISTS(SELECT 1 FROM reviews WHERE client_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}
