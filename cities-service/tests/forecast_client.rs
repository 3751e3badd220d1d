use cities_service::api_client::{FetchResult, ForecastClient, OpenMeteoClient};
use cities_service::cache::TemperatureCache;
use common::models::Coordinates;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const BERLIN: Coordinates = Coordinates {
    latitude: 52.52,
    longitude: 13.41,
};

fn client(server: &MockServer, timeout: Duration) -> OpenMeteoClient {
    OpenMeteoClient::new(format!("{}/v1/forecast", server.uri()), timeout)
        .expect("Failed to build client")
}

/// Valid current-weather payload yields the temperature
#[tokio::test]
async fn test_current_temperature() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "52.52"))
        .and(query_param("longitude", "13.41"))
        .and(query_param("current_weather", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 52.52,
            "longitude": 13.41,
            "current_weather": {
                "temperature": 21.3,
                "windspeed": 10.2,
                "weathercode": 3
            }
        })))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, Duration::from_secs(5))
        .fetch_current_temperature(BERLIN)
        .await;

    assert_eq!(result, FetchResult::Ok(21.3));
}

/// A 2xx body without the temperature field is malformed
#[tokio::test]
async fn test_missing_temperature_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_weather": { "windspeed": 4.0 }
        })))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, Duration::from_secs(5))
        .fetch_current_temperature(BERLIN)
        .await;

    assert_eq!(result, FetchResult::MalformedResponse);
}

/// Non-numeric temperature is malformed too
#[tokio::test]
async fn test_non_numeric_temperature_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_weather": { "temperature": "warm" }
        })))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, Duration::from_secs(5))
        .fetch_current_temperature(BERLIN)
        .await;

    assert_eq!(result, FetchResult::MalformedResponse);
}

/// HTTP error responses surface as upstream errors
#[tokio::test]
async fn test_http_error_is_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, Duration::from_secs(5))
        .fetch_current_temperature(BERLIN)
        .await;

    assert!(matches!(result, FetchResult::UpstreamError(_)));
}

/// Slow provider responses terminate as timeouts
#[tokio::test]
async fn test_timeout_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "current_weather": { "temperature": 1.0 } }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, Duration::from_millis(200))
        .fetch_current_temperature(BERLIN)
        .await;

    assert_eq!(result, FetchResult::Timeout);
}

/// Connection failures are upstream errors, not timeouts
#[tokio::test]
async fn test_unreachable_provider() {
    let client = OpenMeteoClient::new(
        "http://127.0.0.1:9/v1/forecast".to_string(),
        Duration::from_secs(2),
    )
    .expect("Failed to build client");

    let result = client.fetch_current_temperature(BERLIN).await;

    assert!(matches!(result, FetchResult::UpstreamError(_)));
}

/// Second lookup within the TTL is served from cache
#[tokio::test]
async fn test_cache_avoids_second_provider_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_weather": { "temperature": 21.3 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = TemperatureCache::new(
        Arc::new(client(&mock_server, Duration::from_secs(5))),
        Duration::from_secs(3600),
    );

    assert_eq!(cache.get_temperature(1, Some(BERLIN)).await, Some(21.3));
    assert_eq!(cache.get_temperature(1, Some(BERLIN)).await, Some(21.3));
}

/// Many simultaneous misses for one city reach the provider once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_coalesce() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "current_weather": { "temperature": -2.5 } }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = TemperatureCache::new(
        Arc::new(client(&mock_server, Duration::from_secs(5))),
        Duration::from_secs(3600),
    );

    let callers: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_temperature(7, Some(BERLIN)).await })
        })
        .collect();

    for caller in callers {
        assert_eq!(caller.await.unwrap(), Some(-2.5));
    }
}

/// Failed fetches are retried on the next lookup
#[tokio::test]
async fn test_failure_is_not_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_weather": { "temperature": 8.4 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = TemperatureCache::new(
        Arc::new(client(&mock_server, Duration::from_secs(5))),
        Duration::from_secs(3600),
    );

    assert_eq!(cache.get_temperature(3, Some(BERLIN)).await, None);
    assert_eq!(cache.get_temperature(3, Some(BERLIN)).await, Some(8.4));
}
