mod auth;
mod categories;
mod health_check;
mod posts;

pub use auth::{current_user, login, logout, refresh, sessions, REFRESH_COOKIE};
pub use categories::{create_category, list_categories};
pub use health_check::health_check;
pub use posts::{
    create_post, delete_post, get_own_post, get_post, hot_posts, latest_posts, list_posts,
    update_post,
};
