use async_trait::async_trait;
use common::errors::AppError;
use common::models::City;
use std::path::Path;
use tracing::info;

use super::CityStore;

/// In-process city directory, kept sorted by country then name
/// (lowercased, code point order).
#[derive(Debug, Default, Clone)]
pub struct MemoryCityStore {
    cities: Vec<City>,
}

impl MemoryCityStore {
    pub fn new(mut cities: Vec<City>) -> Self {
        cities.sort_by(|a, b| {
            a.country
                .to_lowercase()
                .cmp(&b.country.to_lowercase())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { cities }
    }

    /// Load a JSON array of cities.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::store_unavailable(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let cities: Vec<City> = serde_json::from_str(&raw)?;

        info!(count = cities.len(), path = %path.display(), "Loaded city seed file");
        Ok(Self::new(cities))
    }
}

#[async_trait]
impl CityStore for MemoryCityStore {
    async fn find_by_prefix(&self, term: &str) -> Result<Vec<City>, AppError> {
        let needle = term.to_lowercase();
        Ok(self
            .cities
            .iter()
            .filter(|city| city.name.to_lowercase().starts_with(&needle))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<City>, AppError> {
        Ok(self.cities.iter().find(|city| city.id == id).cloned())
    }
}
