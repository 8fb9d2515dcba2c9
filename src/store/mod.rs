/// Persistence layer
///
/// Each entity has an async repository trait with a Postgres implementation
/// for production and an in-memory one for tests and local runs. Handlers
/// and services only ever see the trait objects.

mod categories;
mod posts;
mod refresh_tokens;
mod users;

pub use categories::{CategoryStore, InMemoryCategoryStore, PgCategoryStore};
pub use posts::{InMemoryPostStore, PgPostStore, PostStore};
pub use refresh_tokens::{InMemoryRefreshTokenStore, PgRefreshTokenStore, RefreshTokenStore};
pub use users::{InMemoryUserStore, PgUserStore, UserStore};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock an in-memory table. A panic while holding the lock cannot leave a
/// table half-written, so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
