use common::errors::AppError;
use common::models::{City, CityWeather, SearchResult, display_temperature};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, instrument};

use crate::cache::TemperatureCache;
use crate::store::CityStore;

/// Prefix search over the city directory, annotated with temperatures.
pub struct SearchIndex {
    store: Arc<dyn CityStore>,
    cache: TemperatureCache,
    cancellation_token: CancellationToken,
}

impl SearchIndex {
    pub fn new(
        store: Arc<dyn CityStore>,
        cache: TemperatureCache,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            cache,
            cancellation_token,
        }
    }

    /// Matching cities in store order (country, then name), each with its
    /// cached-or-fresh temperature. A store outage fails the whole search.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        term: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>, AppError> {
        let mut cities = self.store.find_by_prefix(term).await?;
        if let Some(limit) = limit {
            cities.truncate(limit);
        }

        info!(count = cities.len(), "Resolving temperatures for matches");

        // Spawn all lookups up front; awaiting the handles in order keeps
        // the store ordering regardless of completion order.
        let mut handles = Vec::with_capacity(cities.len());
        for city in &cities {
            handles.push(self.spawn_lookup(city));
        }

        let mut results = Vec::with_capacity(cities.len());
        for (city, handle) in cities.into_iter().zip(handles) {
            let celsius = handle.await.unwrap_or_else(|e| {
                error!(city_id = city.id, error = %e, "Temperature lookup task failed");
                None
            });
            results.push(SearchResult {
                country: city.country,
                city: city.name,
                temperature: display_temperature(celsius),
            });
        }

        Ok(results)
    }

    /// Current weather for one city.
    #[instrument(skip(self))]
    pub async fn city_weather(&self, id: i64) -> Result<CityWeather, AppError> {
        let city = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("City {} does not exist", id)))?;

        let celsius = self.spawn_lookup(&city).await.unwrap_or_else(|e| {
            error!(city_id = id, error = %e, "Temperature lookup task failed");
            None
        });

        Ok(CityWeather {
            id: city.id,
            city: city.name,
            country: city.country,
            temperature: display_temperature(celsius),
            celsius,
        })
    }

    fn spawn_lookup(&self, city: &City) -> tokio::task::JoinHandle<Option<f64>> {
        let cache = self.cache.clone();
        let cancel = self.cancellation_token.clone();
        let (city_id, coords) = (city.id, city.coordinates);

        tokio::spawn(
            async move {
                if let Some(temperature) = cache.peek(city_id) {
                    return Some(temperature);
                }
                if cancel.is_cancelled() {
                    return None;
                }

                tokio::select! {
                    temperature = cache.get_temperature(city_id, coords) => temperature,
                    _ = cancel.cancelled() => None,
                }
            }
            .in_current_span(),
        )
    }
}
