use chrono::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// User role for role-based access control.
///
/// Stored in the database as the PostgreSQL ENUM type "user_role".
/// Role determines which endpoints a user may call; ownership checks
/// on individual rows are layered on top (see `policy`).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "PascalCase")]
pub enum UserRole {
    Admin,
    Client,
    Artisan,
    DeliveryPartner,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Client => "Client",
            UserRole::Artisan => "Artisan",
            UserRole::DeliveryPartner => "DeliveryPartner",
        }
    }

    /// Parse a role name as sent by clients. Case-sensitive on purpose:
    /// the wire vocabulary is exactly the four PascalCase names.
    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "Admin" => Some(UserRole::Admin),
            "Client" => Some(UserRole::Client),
            "Artisan" => Some(UserRole::Artisan),
            "DeliveryPartner" => Some(UserRole::DeliveryPartner),
            _ => None,
        }
    }
}

/// Order lifecycle status.
///
/// Stored as the PostgreSQL ENUM type "order_status". The artisan-side
/// vocabulary is Pending/InProduction/Shipped/Delivered; the delivery-side
/// vocabulary is PickedUp/InTransit/Delivered. Which role may set which
/// status, and in which direction, lives in `policy::order_transition`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "PascalCase")]
pub enum OrderStatus {
    Pending,
    InProduction,
    Shipped,
    PickedUp,
    InTransit,
    Delivered,
}

impl OrderStatus {
    pub fn to_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InProduction => "InProduction",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::PickedUp => "PickedUp",
            OrderStatus::InTransit => "InTransit",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "InProduction" => Some(OrderStatus::InProduction),
            "Shipped" => Some(OrderStatus::Shipped),
            "PickedUp" => Some(OrderStatus::PickedUp),
            "InTransit" => Some(OrderStatus::InTransit),
            "Delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// User row. `password` holds the argon2 PHC hash string, never plain text.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub role: UserRole,
    pub created_at: Option<DateTime<Utc>>,
}

/// Product row. `is_approved` starts false and is only ever flipped to true
/// by an admin; unapproved products are hidden from the public catalog.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub artisan_id: i32,
    pub is_approved: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Order row.
///
/// `artisan_id` is a snapshot of the product's owner taken at creation time
/// and is never recomputed afterwards. `delivery_partner_id` stays NULL until
/// a delivery partner claims the order.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Order {
    pub id: i32,
    pub product_id: i32,
    pub client_id: i32,
    pub artisan_id: i32,
    pub delivery_partner_id: Option<i32>,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
}

/// Review row. At most one per (client_id, product_id), enforced both by the
/// application and by a unique index. The artisan response fields are set
/// and cleared together.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: i32,
    pub product_id: i32,
    pub client_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub artisan_response: Option<String>,
    pub artisan_response_date: Option<DateTime<Utc>>,
}
