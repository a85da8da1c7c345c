use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod product;
pub use product::{ProductExt, ProductFilter};

mod order;
pub use order::OrderExt;

mod review;
pub use review::ReviewExt;

mod favorite;
pub use favorite::FavoriteExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
