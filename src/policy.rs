//! Pure authorization and lifecycle rules.
//!
//! Everything here takes an explicit actor (`actor_id`, `UserRole`) instead
//! of reading ambient request state, so the rules can be unit-tested without
//! a database or an HTTP stack. Handlers load the rows, call into this
//! module, and only then issue writes.

use crate::error::HttpError;
use crate::models::{Order, OrderStatus, Product, UserRole};

/// Outcome of a denied policy check. Mapped 1:1 onto the HTTP error
/// taxonomy by the `From` impl below.
#[derive(Debug, PartialEq)]
pub enum PolicyError {
    /// Identity is valid but does not own the resource / lacks the role.
    Forbidden(&'static str),
    /// Malformed or out-of-range request (bad status, bad rating, ...).
    Validation(String),
    /// The request violates a uniqueness or referential invariant.
    Conflict(&'static str),
}

impl From<PolicyError> for HttpError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Forbidden(msg) => HttpError::forbidden(msg),
            PolicyError::Validation(msg) => HttpError::bad_request(msg),
            PolicyError::Conflict(msg) => HttpError::conflict(msg),
        }
    }
}

/// Position of a status in the forward-only lifecycle.
/// Pending < InProduction < Shipped < PickedUp < InTransit < Delivered.
fn rank(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::InProduction => 1,
        OrderStatus::Shipped => 2,
        OrderStatus::PickedUp => 3,
        OrderStatus::InTransit => 4,
        OrderStatus::Delivered => 5,
    }
}

/// Status values a role is allowed to write at all.
fn role_vocabulary(role: UserRole) -> &'static [OrderStatus] {
    match role {
        UserRole::Artisan => &[
            OrderStatus::Pending,
            OrderStatus::InProduction,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
        UserRole::DeliveryPartner => &[
            OrderStatus::PickedUp,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
        ],
        // Admins and clients never drive the status machine.
        UserRole::Admin | UserRole::Client => &[],
    }
}

/// Validate a status transition on `order` requested by `actor_id` acting
/// as `actor_role`.
///
/// Checks, in this order:
/// 1. `requested` is in the role's vocabulary, else Validation.
/// 2. The actor holds the required ownership relation on the order
///    (artisan_id for artisans, delivery_partner_id for delivery
///    partners), else Forbidden.
/// 3. The move is not backward: rank(requested) >= rank(current), else
///    Validation. Re-setting the current status is accepted.
pub fn order_transition(
    order: &Order,
    requested: OrderStatus,
    actor_id: i32,
    actor_role: UserRole,
) -> Result<(), PolicyError> {
    if !role_vocabulary(actor_role).contains(&requested) {
        return Err(PolicyError::Validation(format!(
            "Status {} cannot be set by role {}",
            requested.to_str(),
            actor_role.to_str()
        )));
    }

    let owns = match actor_role {
        UserRole::Artisan => order.artisan_id == actor_id,
        UserRole::DeliveryPartner => order.delivery_partner_id == Some(actor_id),
        _ => false,
    };
    if !owns {
        return Err(PolicyError::Forbidden(
            "You are not allowed to update this order",
        ));
    }

    if rank(requested) < rank(order.status) {
        return Err(PolicyError::Validation(format!(
            "Order status cannot move backward from {} to {}",
            order.status.to_str(),
            requested.to_str()
        )));
    }

    Ok(())
}

/// Validate a delivery partner claiming an order for themselves.
///
/// Succeeds iff the order is unassigned or already assigned to the caller,
/// and its status is Shipped or PickedUp. Claiming never touches status.
pub fn claim_delivery(order: &Order, actor_id: i32) -> Result<(), PolicyError> {
    if let Some(dp) = order.delivery_partner_id {
        if dp != actor_id {
            return Err(PolicyError::Forbidden(
                "Order is already assigned to another delivery partner",
            ));
        }
    }

    if order.status != OrderStatus::Shipped && order.status != OrderStatus::PickedUp {
        return Err(PolicyError::Validation(
            "Order must be shipped before it can be claimed".to_string(),
        ));
    }

    Ok(())
}

/// Moderation-gated product visibility.
///
/// Approved products are visible to everyone. Unapproved products are
/// visible only to the owning artisan and to admins; to anybody else they
/// read as not found.
pub fn can_view_product(product: &Product, actor: Option<(i32, UserRole)>) -> bool {
    if product.is_approved {
        return true;
    }
    match actor {
        Some((_, UserRole::Admin)) => true,
        Some((id, UserRole::Artisan)) => product.artisan_id == id,
        _ => false,
    }
}

/// Admin or a party on the order (client, artisan, or the assigned
/// delivery partner) may read its detail.
pub fn can_view_order(order: &Order, actor_id: i32, actor_role: UserRole) -> bool {
    actor_role == UserRole::Admin
        || order.client_id == actor_id
        || order.artisan_id == actor_id
        || order.delivery_partner_id == Some(actor_id)
}

/// Review creation preconditions, checked after the product is known to
/// exist: rating in 1..=5, a Delivered order for this (client, product)
/// pair, and no prior review by the same pair.
pub fn review_eligibility(
    rating: i32,
    has_delivered_order: bool,
    already_reviewed: bool,
) -> Result<(), PolicyError> {
    if !(1..=5).contains(&rating) {
        return Err(PolicyError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    if !has_delivered_order {
        return Err(PolicyError::Validation(
            "You can only review a product after it has been delivered to you".to_string(),
        ));
    }
    if already_reviewed {
        return Err(PolicyError::Conflict(
            "You have already reviewed this product",
        ));
    }
    Ok(())
}

/// Guards on admin user deletion: no self-deletion, at least one other
/// admin must remain, and the target must not have dependent rows
/// (products, orders in any role, reviews).
pub fn user_deletion_guard(
    actor_id: i32,
    target_id: i32,
    target_role: UserRole,
    other_admin_count: i64,
    has_dependents: bool,
) -> Result<(), PolicyError> {
    if target_id == actor_id {
        return Err(PolicyError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    if target_role == UserRole::Admin && other_admin_count == 0 {
        return Err(PolicyError::Conflict(
            "Cannot delete the last remaining administrator",
        ));
    }
    if has_dependents {
        return Err(PolicyError::Conflict(
            "User has linked products, orders or reviews and cannot be deleted",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(status: OrderStatus, dp: Option<i32>) -> Order {
        Order {
            id: 1,
            product_id: 10,
            client_id: 100,
            artisan_id: 200,
            delivery_partner_id: dp,
            status,
            order_date: Utc::now(),
        }
    }

    fn product(approved: bool) -> Product {
        Product {
            id: 10,
            title: "Vase".to_string(),
            description: None,
            price: Decimal::new(4999, 2),
            image_url: None,
            artisan_id: 200,
            is_approved: approved,
            created_at: None,
        }
    }

    #[test]
    fn artisan_advances_through_its_vocabulary() {
        let o = order(OrderStatus::Pending, None);
        assert!(order_transition(&o, OrderStatus::InProduction, 200, UserRole::Artisan).is_ok());
        assert!(order_transition(&o, OrderStatus::Shipped, 200, UserRole::Artisan).is_ok());
        assert!(order_transition(&o, OrderStatus::Delivered, 200, UserRole::Artisan).is_ok());
    }

    #[test]
    fn artisan_cannot_set_delivery_side_statuses() {
        let o = order(OrderStatus::Shipped, None);
        let err = order_transition(&o, OrderStatus::PickedUp, 200, UserRole::Artisan);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
        let err = order_transition(&o, OrderStatus::InTransit, 200, UserRole::Artisan);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn backward_transition_is_rejected() {
        let o = order(OrderStatus::Shipped, None);
        let err = order_transition(&o, OrderStatus::Pending, 200, UserRole::Artisan);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
        let err = order_transition(&o, OrderStatus::InProduction, 200, UserRole::Artisan);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn resetting_the_same_status_is_accepted() {
        let o = order(OrderStatus::Shipped, None);
        assert!(order_transition(&o, OrderStatus::Shipped, 200, UserRole::Artisan).is_ok());
    }

    #[test]
    fn non_owner_artisan_is_forbidden() {
        let o = order(OrderStatus::Pending, None);
        let err = order_transition(&o, OrderStatus::InProduction, 201, UserRole::Artisan);
        assert!(matches!(err, Err(PolicyError::Forbidden(_))));
    }

    #[test]
    fn delivery_partner_requires_assignment() {
        let unassigned = order(OrderStatus::Shipped, None);
        let err = order_transition(&unassigned, OrderStatus::PickedUp, 300, UserRole::DeliveryPartner);
        assert!(matches!(err, Err(PolicyError::Forbidden(_))));

        let assigned = order(OrderStatus::Shipped, Some(300));
        assert!(
            order_transition(&assigned, OrderStatus::PickedUp, 300, UserRole::DeliveryPartner)
                .is_ok()
        );
        assert!(
            order_transition(&assigned, OrderStatus::Delivered, 300, UserRole::DeliveryPartner)
                .is_ok()
        );
    }

    #[test]
    fn clients_and_admins_never_drive_the_machine() {
        let o = order(OrderStatus::Pending, None);
        assert!(order_transition(&o, OrderStatus::Shipped, 100, UserRole::Client).is_err());
        assert!(order_transition(&o, OrderStatus::Shipped, 1, UserRole::Admin).is_err());
    }

    #[test]
    fn claim_requires_shipped_or_picked_up() {
        assert!(claim_delivery(&order(OrderStatus::Shipped, None), 300).is_ok());
        assert!(claim_delivery(&order(OrderStatus::PickedUp, None), 300).is_ok());

        let err = claim_delivery(&order(OrderStatus::Pending, None), 300);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
        let err = claim_delivery(&order(OrderStatus::Delivered, None), 300);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn claim_is_idempotent_for_the_same_partner_only() {
        assert!(claim_delivery(&order(OrderStatus::Shipped, Some(300)), 300).is_ok());
        let err = claim_delivery(&order(OrderStatus::Shipped, Some(301)), 300);
        assert!(matches!(err, Err(PolicyError::Forbidden(_))));
    }

    #[test]
    fn unapproved_product_is_hidden_from_public_and_clients() {
        let p = product(false);
        assert!(!can_view_product(&p, None));
        assert!(!can_view_product(&p, Some((100, UserRole::Client))));
        assert!(!can_view_product(&p, Some((300, UserRole::DeliveryPartner))));
    }

    #[test]
    fn unapproved_product_is_visible_to_owner_and_admin() {
        let p = product(false);
        assert!(can_view_product(&p, Some((200, UserRole::Artisan))));
        assert!(!can_view_product(&p, Some((201, UserRole::Artisan))));
        assert!(can_view_product(&p, Some((1, UserRole::Admin))));
    }

    #[test]
    fn approved_product_is_visible_to_everyone() {
        let p = product(true);
        assert!(can_view_product(&p, None));
        assert!(can_view_product(&p, Some((100, UserRole::Client))));
    }

    #[test]
    fn order_detail_visibility() {
        let o = order(OrderStatus::Pending, None);
        assert!(can_view_order(&o, 1, UserRole::Admin));
        assert!(can_view_order(&o, 100, UserRole::Client));
        assert!(can_view_order(&o, 200, UserRole::Artisan));
        assert!(!can_view_order(&o, 999, UserRole::Client));

        let assigned = order(OrderStatus::InTransit, Some(300));
        assert!(can_view_order(&assigned, 300, UserRole::DeliveryPartner));
        assert!(!can_view_order(&assigned, 301, UserRole::DeliveryPartner));
    }

    #[test]
    fn review_rating_bounds() {
        assert!(matches!(
            review_eligibility(0, true, false),
            Err(PolicyError::Validation(_))
        ));
        assert!(matches!(
            review_eligibility(6, true, false),
            Err(PolicyError::Validation(_))
        ));
        assert!(review_eligibility(3, true, false).is_ok());
        assert!(review_eligibility(1, true, false).is_ok());
        assert!(review_eligibility(5, true, false).is_ok());
    }

    #[test]
    fn review_requires_a_delivered_order() {
        let err = review_eligibility(4, false, false);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn second_review_for_the_same_pair_conflicts() {
        let err = review_eligibility(4, true, true);
        assert!(matches!(err, Err(PolicyError::Conflict(_))));
    }

    #[test]
    fn admin_cannot_delete_self() {
        let err = user_deletion_guard(1, 1, UserRole::Admin, 3, false);
        assert!(matches!(err, Err(PolicyError::Validation(_))));
    }

    #[test]
    fn last_admin_is_protected() {
        let err = user_deletion_guard(1, 2, UserRole::Admin, 0, false);
        assert!(matches!(err, Err(PolicyError::Conflict(_))));
        assert!(user_deletion_guard(1, 2, UserRole::Admin, 1, false).is_ok());
    }

    #[test]
    fn users_with_dependent_rows_cannot_be_deleted() {
        let err = user_deletion_guard(1, 2, UserRole::Artisan, 1, true);
        assert!(matches!(err, Err(PolicyError::Conflict(_))));
        assert!(user_deletion_guard(1, 2, UserRole::Artisan, 1, false).is_ok());
    }
}
