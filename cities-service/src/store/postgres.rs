use async_trait::async_trait;
use common::errors::AppError;
use common::models::{City, Coordinates};
use sqlx::PgPool;
use tracing::instrument;

use super::{CityStore, escape_like, migrations};

#[derive(sqlx::FromRow)]
struct CityRow {
    id: i64,
    name: String,
    country: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<CityRow> for City {
    fn from(row: CityRow) -> Self {
        City {
            id: row.id,
            name: row.name,
            country: row.country,
            coordinates: Coordinates::from_parts(row.latitude, row.longitude),
        }
    }
}

/// Postgres-backed city directory. Only published cities are visible.
///
/// Ordering uses the "C" collation (code point order of the lowercased
/// names) so results match [`MemoryCityStore`](super::MemoryCityStore)
/// whatever the database's default collation is.
#[derive(Clone)]
pub struct PgCityStore {
    pool: PgPool,
}

impl PgCityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url).await?;
        migrations::run_migrations(&pool).await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CityStore for PgCityStore {
    #[instrument(skip(self))]
    async fn find_by_prefix(&self, term: &str) -> Result<Vec<City>, AppError> {
        let pattern = format!("{}%", escape_like(&term.to_lowercase()));

        let rows = sqlx::query_as::<_, CityRow>(
            r#"
            SELECT c.id, c.name, COALESCE(co.name, '') AS country, c.latitude, c.longitude
            FROM cities c
            LEFT JOIN countries co ON co.id = c.country_id
            WHERE c.published AND lower(c.name) LIKE $1 ESCAPE '\'
            ORDER BY lower(COALESCE(co.name, '')) COLLATE "C", lower(c.name) COLLATE "C", c.id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(City::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> Result<Option<City>, AppError> {
        let row = sqlx::query_as::<_, CityRow>(
            r#"
            SELECT c.id, c.name, COALESCE(co.name, '') AS country, c.latitude, c.longitude
            FROM cities c
            LEFT JOIN countries co ON co.id = c.country_id
            WHERE c.published AND c.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(City::from))
    }
}
