use super::DBClient;
use crate::dtos::OrderDetailsDto;
use crate::models::{Order, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Order database operations.
///
/// Listing queries return `OrderDetailsDto` (order joined with product and
/// party names) because every consumer renders those fields; mutation paths
/// work on the plain `Order` row.
pub trait OrderExt {
    /// Insert a Pending order. `artisan_id` is the snapshot of the
    /// product's owner taken by the caller at creation time.
    async fn create_order(
        &self,
        product_id: i32,
        client_id: i32,
        artisan_id: i32,
    ) -> Result<Order, sqlx::Error>;

    async fn get_order(&self, order_id: i32) -> Result<Option<Order>, sqlx::Error>;

    async fn get_order_details(
        &self,
        order_id: i32,
    ) -> Result<Option<OrderDetailsDto>, sqlx::Error>;

    async fn all_orders(&self) -> Result<Vec<OrderDetailsDto>, sqlx::Error>;

    async fn orders_for_client(&self, client_id: i32)
        -> Result<Vec<OrderDetailsDto>, sqlx::Error>;

    async fn orders_for_artisan(
        &self,
        artisan_id: i32,
    ) -> Result<Vec<OrderDetailsDto>, sqlx::Error>;

    async fn orders_for_delivery_partner(
        &self,
        delivery_partner_id: i32,
    ) -> Result<Vec<OrderDetailsDto>, sqlx::Error>;

    /// Unassigned orders ready for pickup (status Shipped or PickedUp).
    async fn available_delivery_orders(&self) -> Result<Vec<OrderDetailsDto>, sqlx::Error>;

    async fn set_order_status(
        &self,
        order_id: i32,
        status: OrderStatus,
    ) -> Result<(), sqlx::Error>;

    /// Attach a delivery partner without touching status.
    async fn assign_delivery_partner(
        &self,
        order_id: i32,
        delivery_partner_id: i32,
    ) -> Result<(), sqlx::Error>;

    /// Whether the client has at least one Delivered order for the product.
    async fn has_delivered_order(
        &self,
        client_id: i32,
        product_id: i32,
    ) -> Result<bool, sqlx::Error>;

    /// Sum of product prices and order count over the artisan's Delivered
    /// orders, optionally bounded by an order-date window.
    async fn artisan_earnings(
        &self,
        artisan_id: i32,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<(Decimal, i64), sqlx::Error>;
}

const ORDER_COLUMNS: &str =
    "id, product_id, client_id, artisan_id, delivery_partner_id, status, order_date";

const ORDER_DETAILS_SELECT: &str = "SELECT o.id, o.product_id, o.client_id, o.artisan_id, \
     o.delivery_partner_id, o.status, o.order_date, \
     p.title AS product_title, p.price AS product_price, p.image_url AS product_image_url, \
     c.username AS client_username, a.username AS artisan_username \
     FROM orders o \
     JOIN products p ON p.id = o.product_id \
     JOIN users c ON c.id = o.client_id \
     JOIN users a ON a.id = o.artisan_id";

impl OrderExt for DBClient {
    async fn create_order(
        &self,
        product_id: i32,
        client_id: i32,
        artisan_id: i32,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (product_id, client_id, artisan_id) \
             VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(product_id)
        .bind(client_id)
        .bind(artisan_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_order(&self, order_id: i32) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_order_details(
        &self,
        order_id: i32,
    ) -> Result<Option<OrderDetailsDto>, sqlx::Error> {
        sqlx::query_as::<_, OrderDetailsDto>(&format!("{ORDER_DETAILS_SELECT} WHERE o.id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn all_orders(&self) -> Result<Vec<OrderDetailsDto>, sqlx::Error> {
        sqlx::query_as::<_, OrderDetailsDto>(&format!(
            "{ORDER_DETAILS_SELECT} ORDER BY o.id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn orders_for_client(
        &self,
        client_id: i32,
    ) -> Result<Vec<OrderDetailsDto>, sqlx::Error> {
        sqlx::query_as::<_, OrderDetailsDto>(&format!(
            "{ORDER_DETAILS_SELECT} WHERE o.client_id = $1 ORDER BY o.id DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn orders_for_artisan(
        &self,
        artisan_id: i32,
    ) -> Result<Vec<OrderDetailsDto>, sqlx::Error> {
        sqlx::query_as::<_, OrderDetailsDto>(&format!(
            "{ORDER_DETAILS_SELECT} WHERE o.artisan_id = $1 ORDER BY o.id DESC"
        ))
        .bind(artisan_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn orders_for_delivery_partner(
        &self,
        delivery_partner_id: i32,
    ) -> Result<Vec<OrderDetailsDto>, sqlx::Error> {
        sqlx::query_as::<_, OrderDetailsDto>(&format!(
            "{ORDER_DETAILS_SELECT} WHERE o.delivery_partner_id = $1 ORDER BY o.id DESC"
        ))
        .bind(delivery_partner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn available_delivery_orders(&self) -> Result<Vec<OrderDetailsDto>, sqlx::Error> {
        sqlx::query_as::<_, OrderDetailsDto>(&format!(
            "{ORDER_DETAILS_SELECT} \
             WHERE o.delivery_partner_id IS NULL \
               AND o.status IN ('Shipped', 'PickedUp') \
             ORDER BY o.id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn set_order_status(
        &self,
        order_id: i32,
        status: OrderStatus,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn assign_delivery_partner(
        &self,
        order_id: i32,
        delivery_partner_id: i32,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query("UPDATE orders SET delivery_partner_id = $1 WHERE id = $2")
            .bind(delivery_partner_id)
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn has_delivered_order(
        &self,
        client_id: i32,
        product_id: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM orders \
             WHERE client_id = $1 AND product_id = $2 AND status = 'Delivered')",
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn artisan_earnings(
        &self,
        artisan_id: i32,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<(Decimal, i64), sqlx::Error> {
        sqlx::query_as::<_, (Decimal, i64)>(
            "SELECT COALESCE(SUM(p.price), 0), COUNT(o.id) \
             FROM orders o JOIN products p ON p.id = o.product_id \
             WHERE o.artisan_id = $1 AND o.status = 'Delivered' \
               AND ($2::timestamptz IS NULL OR o.order_date >= $2) \
               AND ($3::timestamptz IS NULL OR o.order_date <= $3)",
        )
        .bind(artisan_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
    }
}
