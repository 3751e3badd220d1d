//! Coordinate store: read-only access to city records.

mod memory;
mod migrations;
mod postgres;

pub use memory::MemoryCityStore;
pub use postgres::PgCityStore;

use async_trait::async_trait;
use common::errors::AppError;
use common::models::City;

/// Lookup of city records by name prefix or id.
///
/// An outage of the backing store is reported as
/// [`AppError::StoreUnavailable`], never as an empty result.
#[async_trait]
pub trait CityStore: Send + Sync {
    /// Cities whose name starts with `term` (case-insensitive), ordered by
    /// country then name. An empty term matches every city.
    async fn find_by_prefix(&self, term: &str) -> Result<Vec<City>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<City>, AppError>;
}

/// Escape `LIKE` metacharacters so the term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
