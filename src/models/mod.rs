mod category;
mod post;
mod refresh_token;
mod user;

pub use category::{Category, CategorySummary, NewCategory};
pub use post::{HotPost, LatestPost, NewPost, Post, PostDetail, PostStatus, PostSummary};
pub use refresh_token::{ClientInfo, RefreshTokenRecord, RefreshTokenState};
pub use user::User;
