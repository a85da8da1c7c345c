use super::DBClient;
use crate::models::Product;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

/// Catalog filters as applied by the public listing endpoint. All filters
/// are ANDed and applied before pagination.
#[derive(Debug, Default)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub artisan_id: Option<i32>,
    /// "recent" (default), "priceAsc" or "priceDesc"; validated upstream.
    pub sort: String,
    pub skip: i64,
    /// Clamped to [1,100] upstream.
    pub take: i64,
}

/// Product database operations.
pub trait ProductExt {
    async fn get_product(&self, product_id: i32) -> Result<Option<Product>, sqlx::Error>;

    async fn product_exists(&self, product_id: i32) -> Result<bool, sqlx::Error>;

    /// Approved-only catalog listing with filters, sort and pagination.
    async fn list_approved_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, sqlx::Error>;

    async fn get_products_by_artisan(&self, artisan_id: i32)
        -> Result<Vec<Product>, sqlx::Error>;

    async fn create_product(
        &self,
        artisan_id: i32,
        title: &str,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
    ) -> Result<Product, sqlx::Error>;

    async fn update_product(
        &self,
        product_id: i32,
        title: &str,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
    ) -> Result<Product, sqlx::Error>;

    async fn delete_product(&self, product_id: i32) -> Result<(), sqlx::Error>;

    async fn pending_products(&self) -> Result<Vec<Product>, sqlx::Error>;

    async fn pending_product_count(&self) -> Result<i64, sqlx::Error>;

    /// Flip the moderation flag to approved. There is no reverse operation.
    async fn approve_product(&self, product_id: i32) -> Result<Product, sqlx::Error>;
}

const PRODUCT_COLUMNS: &str =
    "id, title, description, price, image_url, artisan_id, is_approved, created_at";

impl ProductExt for DBClient {
    async fn get_product(&self, product_id: i32) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn product_exists(&self, product_id: i32) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_approved_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_approved = TRUE"
        ));

        if let Some(term) = &filter.q {
            query.push(" AND (title ILIKE ");
            query.push_bind(format!("%{}%", term.trim()));
            query.push(" OR description ILIKE ");
            query.push_bind(format!("%{}%", term.trim()));
            query.push(")");
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ");
            query.push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ");
            query.push_bind(max_price);
        }
        if let Some(artisan_id) = filter.artisan_id {
            query.push(" AND artisan_id = ");
            query.push_bind(artisan_id);
        }

        match filter.sort.as_str() {
            "priceAsc" => query.push(" ORDER BY price ASC, id DESC"),
            "priceDesc" => query.push(" ORDER BY price DESC, id DESC"),
            _ => query.push(" ORDER BY id DESC"),
        };

        query.push(" OFFSET ");
        query.push_bind(filter.skip);
        query.push(" LIMIT ");
        query.push_bind(filter.take);

        query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await
    }

    async fn get_products_by_artisan(
        &self,
        artisan_id: i32,
    ) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE artisan_id = $1 ORDER BY id DESC"
        ))
        .bind(artisan_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_product(
        &self,
        artisan_id: i32,
        title: &str,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
    ) -> Result<Product, sqlx::Error> {
        // is_approved defaults to FALSE; only the approve operation sets it.
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (title, description, price, image_url, artisan_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(image_url)
        .bind(artisan_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_product(
        &self,
        product_id: i32,
        title: &str,
        description: Option<&str>,
        price: Decimal,
        image_url: Option<&str>,
    ) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET title = $1, description = $2, price = $3, image_url = $4 \
             WHERE id = $5 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(image_url)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_product(&self, product_id: i32) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn pending_products(&self) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_approved = FALSE ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn pending_product_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE is_approved = FALSE")
            .fetch_one(&self.pool)
            .await
    }

    async fn approve_product(&self, product_id: i32) -> Result<Product, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET is_approved = TRUE WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
    }
}
