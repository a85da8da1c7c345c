use super::DBClient;
use crate::dtos::ArtisanReviewDto;
use crate::models::Review;

/// Review database operations.
pub trait ReviewExt {
    async fn reviews_for_product(&self, product_id: i32) -> Result<Vec<Review>, sqlx::Error>;

    async fn create_review(
        &self,
        product_id: i32,
        client_id: i32,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, sqlx::Error>;

    async fn review_exists(&self, client_id: i32, product_id: i32)
        -> Result<bool, sqlx::Error>;

    async fn get_review(&self, review_id: i32) -> Result<Option<Review>, sqlx::Error>;

    /// Reviews of the artisan's products, newest first, joined with the
    /// product title and the reviewing client's username.
    async fn reviews_for_artisan(
        &self,
        artisan_id: i32,
    ) -> Result<Vec<ArtisanReviewDto>, sqlx::Error>;

    async fn set_artisan_response(
        &self,
        review_id: i32,
        response: &str,
    ) -> Result<Review, sqlx::Error>;

    /// Clear both response fields together.
    async fn clear_artisan_response(&self, review_id: i32) -> Result<Review, sqlx::Error>;
}

const REVIEW_COLUMNS: &str = "id, product_id, client_id, rating, comment, created_at, \
     artisan_response, artisan_response_date";

impl ReviewExt for DBClient {
    async fn reviews_for_product(&self, product_id: i32) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY id DESC"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_review(
        &self,
        product_id: i32,
        client_id: i32,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (product_id, client_id, rating, comment) \
             VALUES ($1, $2, $3, $4) RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(product_id)
        .bind(client_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }

    async fn review_exists(
        &self,
        client_id: i32,
        product_id: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE client_id = $1 AND product_id = $2)",
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_review(&self, review_id: i32) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn reviews_for_artisan(
        &self,
        artisan_id: i32,
    ) -> Result<Vec<ArtisanReviewDto>, sqlx::Error> {
        sqlx::query_as::<_, ArtisanReviewDto>(
            "SELECT r.id, r.product_id, r.client_id, r.rating, r.comment, r.created_at, \
                 r.artisan_response, r.artisan_response_date, \
                 p.title AS product_title, c.username AS client_username \
             FROM reviews r \
             JOIN products p ON p.id = r.product_id \
             JOIN users c ON c.id = r.client_id \
             WHERE p.artisan_id = $1 \
             ORDER BY r.created_at DESC",
        )
        .bind(artisan_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn set_artisan_response(
        &self,
        review_id: i32,
        response: &str,
    ) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET artisan_response = $1, artisan_response_date = Now() \
             WHERE id = $2 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(response)
        .bind(review_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn clear_artisan_response(&self, review_id: i32) -> Result<Review, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET artisan_response = NULL, artisan_response_date = NULL \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review_id)
        .fetch_one(&self.pool)
        .await
    }
}
