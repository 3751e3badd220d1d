//! Runs against a scratch database:
//! `DATABASE_URL=postgres://... cargo test -p cities-service --test postgres_store -- --ignored`

use cities_service::store::{CityStore, MemoryCityStore, PgCityStore};
use common::models::{City, Coordinates};
use sqlx::PgPool;

async fn pool() -> (PgPool, PgCityStore) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    // Connecting through the store runs the migrations first.
    let store = PgCityStore::connect(&url)
        .await
        .expect("Failed to open city store");
    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    (pool, store)
}

async fn clean(pool: &PgPool) {
    sqlx::query("DELETE FROM cities WHERE name LIKE 'Qx%'")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM countries WHERE name LIKE 'Qx%'")
        .execute(pool)
        .await
        .unwrap();
}

async fn country(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO countries (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn city(
    pool: &PgPool,
    name: &str,
    country_id: Option<i64>,
    coords: Option<(f64, f64)>,
    published: bool,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO cities (name, country_id, latitude, longitude, published)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(country_id)
    .bind(coords.map(|c| c.0))
    .bind(coords.map(|c| c.1))
    .bind(published)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn names(cities: &[City]) -> Vec<&str> {
    cities.iter().map(|c| c.name.as_str()).collect()
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at a scratch Postgres database"]
async fn test_postgres_store_matches_memory_store() {
    let (pool, store) = pool().await;
    clean(&pool).await;

    let germany = country(&pool, "Qx Germany").await;
    let italy = country(&pool, "Qx Italy").await;
    let berlin = city(&pool, "Qxberlin", Some(germany), Some((52.52, 13.41)), true).await;
    city(&pool, "Qxbergamo", Some(italy), Some((45.69, 9.67)), true).await;
    city(&pool, "Qxéa", Some(germany), Some((50.0, 8.0)), true).await;
    city(&pool, "Qxz", Some(germany), Some((51.0, 7.0)), true).await;
    city(&pool, "Qx%tra", Some(germany), None, true).await;
    city(&pool, "Qxnocountry", None, Some((1.0, 2.0)), true).await;
    let hidden = city(&pool, "Qxhidden", Some(germany), Some((3.0, 4.0)), false).await;

    let found = store.find_by_prefix("qX").await.unwrap();
    assert_eq!(
        names(&found),
        vec!["Qxnocountry", "Qx%tra", "Qxberlin", "Qxz", "Qxéa", "Qxbergamo"]
    );
    assert_eq!(found[0].country, "");
    assert!(found[1].coordinates.is_none());
    assert_eq!(
        found[2].coordinates,
        Some(Coordinates {
            latitude: 52.52,
            longitude: 13.41
        })
    );

    let memory = MemoryCityStore::new(found.clone());
    assert_eq!(memory.find_by_prefix("qX").await.unwrap(), found);

    // LIKE metacharacters match literally
    assert_eq!(names(&store.find_by_prefix("Qx%").await.unwrap()), vec!["Qx%tra"]);
    assert!(store.find_by_prefix("Qx_").await.unwrap().is_empty());

    // Unpublished cities are invisible
    assert!(store.find_by_id(hidden).await.unwrap().is_none());
    assert_eq!(
        store.find_by_id(berlin).await.unwrap().unwrap().country,
        "Qx Germany"
    );

    clean(&pool).await;
}
