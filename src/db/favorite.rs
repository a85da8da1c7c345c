use super::DBClient;
use crate::models::Product;

/// Favorite database operations. Favorites are pure bookmarks; both add
/// and remove are idempotent at the handler level.
pub trait FavoriteExt {
    async fn favorite_ids(&self, client_id: i32) -> Result<Vec<i32>, sqlx::Error>;

    /// The favorited products themselves, most recently bookmarked first.
    async fn favorite_products(&self, client_id: i32) -> Result<Vec<Product>, sqlx::Error>;

    async fn add_favorite(&self, client_id: i32, product_id: i32) -> Result<(), sqlx::Error>;

    async fn remove_favorite(&self, client_id: i32, product_id: i32)
        -> Result<(), sqlx::Error>;
}

impl FavoriteExt for DBClient {
    async fn favorite_ids(&self, client_id: i32) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT product_id FROM favorites WHERE client_id = $1")
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn favorite_products(&self, client_id: i32) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            "SELECT p.id, p.title, p.description, p.price, p.image_url, p.artisan_id, \
                 p.is_approved, p.created_at \
             FROM favorites f JOIN products p ON p.id = f.product_id \
             WHERE f.client_id = $1 \
             ORDER BY f.created_at DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn add_favorite(&self, client_id: i32, product_id: i32) -> Result<(), sqlx::Error> {
        // ON CONFLICT keeps the unique (client_id, product_id) pair quiet
        // if two tabs race on the same bookmark.
        sqlx::query(
            "INSERT INTO favorites (client_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (client_id, product_id) DO NOTHING",
        )
        .bind(client_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_favorite(
        &self,
        client_id: i32,
        product_id: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM favorites WHERE client_id = $1 AND product_id = $2")
            .bind(client_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
