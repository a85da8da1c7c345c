pub mod admin;
pub mod auth;
pub mod favorite;
pub mod order;
pub mod product;
pub mod review;
pub mod upload;
