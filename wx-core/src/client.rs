use crate::{
    config::Config,
    error::{FetchError, truncate_body},
    model::Coordinate,
    provider::{Endpoint, ProviderConfig},
    signal::Signal,
    transport::{HttpTransport, Transport},
};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Fetches weather JSON for a coordinate from the configured provider.
///
/// Cloning is cheap: clones share the transport and provider settings, and
/// neither is mutated after construction, so calls never interfere.
#[derive(Debug)]
pub struct WeatherClient<T = HttpTransport> {
    transport: Arc<T>,
    provider: Arc<ProviderConfig>,
}

impl<T> Clone for WeatherClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl WeatherClient<HttpTransport> {
    pub fn new(provider: ProviderConfig) -> anyhow::Result<Self> {
        Self::with_transport(HttpTransport::new(), provider)
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if config.provider.api_key.is_none() {
            tracing::warn!("no API key configured; requests are sent without one");
        }
        Self::new(config.provider.clone())
    }
}

impl<T: Transport> WeatherClient<T> {
    /// Validates `provider` so every endpoint URL can be built.
    pub fn with_transport(transport: T, provider: ProviderConfig) -> anyhow::Result<Self> {
        provider.validate()?;

        Ok(Self {
            transport: Arc::new(transport),
            provider: Arc::new(provider),
        })
    }

    pub fn url_for(&self, endpoint: Endpoint, coordinate: Coordinate) -> Result<Url, FetchError> {
        Ok(self.provider.url_for(endpoint, coordinate)?)
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// Non-success statuses fail with [`FetchError::Http`] before the body is
    /// looked at.
    pub async fn fetch_json(&self, url: Url) -> Result<Value, FetchError> {
        tracing::debug!(%url, "fetching JSON");

        let res = self.transport.get(&url).await?;

        if !res.status.is_success() {
            tracing::warn!(%url, status = %res.status, "request failed");
            return Err(FetchError::Http { status: res.status, url });
        }

        serde_json::from_slice(&res.body).map_err(|source| {
            tracing::warn!(%url, error = %source, "response is not valid JSON");
            FetchError::Parse {
                body: truncate_body(&res.body),
                url,
                source,
            }
        })
    }

    pub async fn fetch_current_conditions(
        &self,
        coordinate: Coordinate,
    ) -> Result<Value, FetchError> {
        self.fetch_endpoint(Endpoint::CurrentConditions, coordinate).await
    }

    pub async fn fetch_hourly_forecast(
        &self,
        coordinate: Coordinate,
    ) -> Result<Value, FetchError> {
        self.fetch_endpoint(Endpoint::HourlyForecast, coordinate).await
    }

    pub async fn fetch_daily_forecast(
        &self,
        coordinate: Coordinate,
    ) -> Result<Value, FetchError> {
        self.fetch_endpoint(Endpoint::DailyForecast, coordinate).await
    }

    pub async fn fetch_endpoint(
        &self,
        endpoint: Endpoint,
        coordinate: Coordinate,
    ) -> Result<Value, FetchError> {
        let url = self.url_for(endpoint, coordinate)?;
        tracing::debug!(%endpoint, %coordinate, "building endpoint request");
        self.fetch_json(url).await
    }
}

/// Spawned forms of the fetch operations.
impl<T: Transport + 'static> WeatherClient<T> {
    pub fn json_signal(&self, url: Url) -> Signal<Value> {
        let client = self.clone();
        Signal::spawn(async move { client.fetch_json(url).await })
    }

    pub fn endpoint_signal(&self, endpoint: Endpoint, coordinate: Coordinate) -> Signal<Value> {
        let client = self.clone();
        Signal::spawn(async move { client.fetch_endpoint(endpoint, coordinate).await })
    }

    pub fn current_conditions_signal(&self, coordinate: Coordinate) -> Signal<Value> {
        self.endpoint_signal(Endpoint::CurrentConditions, coordinate)
    }

    pub fn hourly_forecast_signal(&self, coordinate: Coordinate) -> Signal<Value> {
        self.endpoint_signal(Endpoint::HourlyForecast, coordinate)
    }

    pub fn daily_forecast_signal(&self, coordinate: Coordinate) -> Signal<Value> {
        self.endpoint_signal(Endpoint::DailyForecast, coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;
    use tokio::sync::{Notify, oneshot};

    /// Answers every request with the same canned response.
    #[derive(Debug)]
    struct StaticTransport {
        status: StatusCode,
        body: &'static str,
        calls: AtomicUsize,
    }

    impl StaticTransport {
        fn new(status: StatusCode, body: &'static str) -> Self {
            Self { status, body, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(self.status, self.body))
        }
    }

    /// Echoes the query string back as a JSON object, after a short delay.
    #[derive(Debug)]
    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let echoed: serde_json::Map<String, Value> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .chain([("path".to_string(), Value::String(url.path().to_string()))])
                .collect();
            let body = serde_json::to_vec(&echoed).expect("map serializes");
            Ok(HttpResponse::new(StatusCode::OK, body))
        }
    }

    /// Blocks until the test opens the gate.
    #[derive(Debug)]
    struct GatedTransport {
        started: Notify,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn get(&self, _url: &Url) -> Result<HttpResponse, FetchError> {
            let gate = self.gate.lock().expect("gate lock").take().expect("single request");
            self.started.notify_one();
            let _ = gate.await;
            Ok(HttpResponse::new(StatusCode::OK, r#"{"late": true}"#))
        }
    }

    fn test_provider() -> ProviderConfig {
        ProviderConfig {
            base_url: "http://weather.test/data/".into(),
            api_key: Some("KEY".into()),
            ..ProviderConfig::default()
        }
    }

    fn client<T: Transport>(transport: T) -> WeatherClient<T> {
        WeatherClient::with_transport(transport, test_provider()).expect("valid provider")
    }

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    #[tokio::test]
    async fn fetch_json_parses_success_body() {
        let client = client(StaticTransport::new(StatusCode::OK, r#"{"temp": 72}"#));

        let value = client.fetch_json(url("http://weather.test/x")).await.expect("should parse");
        assert_eq!(value, json!({"temp": 72}));
    }

    #[tokio::test]
    async fn fetch_json_accepts_top_level_arrays() {
        let client = client(StaticTransport::new(StatusCode::OK, r#"[1, "two", null]"#));

        let value = client.fetch_json(url("http://weather.test/x")).await.expect("should parse");
        assert_eq!(value, json!([1, "two", null]));
    }

    #[tokio::test]
    async fn fetch_json_reports_http_status_without_parsing() {
        // A body that would fail to parse proves the status check wins.
        let client = client(StaticTransport::new(StatusCode::NOT_FOUND, "not json"));

        let err = client.fetch_json(url("http://weather.test/x")).await.unwrap_err();
        match err {
            FetchError::Http { status, url } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(url.path(), "/x");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_json_reports_parse_error() {
        let client = client(StaticTransport::new(StatusCode::OK, "not json"));

        let err = client.fetch_json(url("http://weather.test/x")).await.unwrap_err();
        match err {
            FetchError::Parse { body, .. } => assert_eq!(body, "not json"),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn each_call_makes_exactly_one_request() {
        let transport = StaticTransport::new(StatusCode::SERVICE_UNAVAILABLE, "");
        let client = client(transport);

        let _ = client.fetch_current_conditions(coord(1.0, 2.0)).await;
        let _ = client.fetch_hourly_forecast(coord(1.0, 2.0)).await;
        let _ = client.fetch_daily_forecast(coord(1.0, 2.0)).await;

        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn location_operations_hit_their_own_endpoint() {
        let client = client(EchoTransport);
        let c = coord(40.7128, -74.006);

        let current = client.fetch_current_conditions(c).await.expect("current");
        let hourly = client.fetch_hourly_forecast(c).await.expect("hourly");
        let daily = client.fetch_daily_forecast(c).await.expect("daily");

        assert_eq!(current["path"], "/data/weather");
        assert_eq!(hourly["path"], "/data/forecast");
        assert_eq!(daily["path"], "/data/forecast/daily");

        for v in [&current, &hourly, &daily] {
            assert_eq!(v["lat"], "40.7128");
            assert_eq!(v["lon"], "-74.006");
            assert_eq!(v["appid"], "KEY");
        }
        assert_eq!(hourly["cnt"], "12");
        assert_eq!(daily["cnt"], "7");
        assert!(current.get("cnt").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_calls_are_independent() {
        let client = client(EchoTransport);

        let (a, b) = tokio::join!(
            client.fetch_current_conditions(coord(51.5074, -0.1278)),
            client.fetch_current_conditions(coord(-33.8688, 151.2093)),
        );

        let a = a.expect("first call");
        let b = b.expect("second call");
        assert_eq!(a["lat"], "51.5074");
        assert_eq!(a["lon"], "-0.1278");
        assert_eq!(b["lat"], "-33.8688");
        assert_eq!(b["lon"], "151.2093");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_signals_are_independent() {
        let client = client(EchoTransport);

        let first = client.hourly_forecast_signal(coord(10.0, 20.0));
        let second = client.daily_forecast_signal(coord(-10.0, -20.0));

        let (a, b) = tokio::join!(first, second);
        let a = a.expect("first signal");
        let b = b.expect("second signal");
        assert_eq!(a["lat"], "10");
        assert_eq!(a["path"], "/data/forecast");
        assert_eq!(b["lat"], "-10");
        assert_eq!(b["path"], "/data/forecast/daily");
    }

    #[tokio::test]
    async fn cancelled_signal_never_delivers() {
        let (mut gate_tx, gate_rx) = oneshot::channel();
        let client = client(GatedTransport {
            started: Notify::new(),
            gate: Mutex::new(Some(gate_rx)),
        });

        let signal = client.current_conditions_signal(coord(0.0, 0.0));
        client.transport.started.notified().await;

        signal.cancel();

        // The in-flight request future is dropped, taking the gate receiver with it.
        tokio::time::timeout(Duration::from_secs(1), gate_tx.closed())
            .await
            .expect("request future should be dropped on cancel");
        assert!(gate_tx.send(()).is_err());
    }

    #[tokio::test]
    async fn json_signal_delivers_result() {
        let client = client(StaticTransport::new(StatusCode::OK, r#"{"ok": true}"#));

        let value = client.json_signal(url("http://weather.test/any")).await.expect("delivered");
        assert_eq!(value, json!({"ok": true}));
    }

    #[test]
    fn construction_rejects_invalid_provider() {
        let provider = ProviderConfig { base_url: "nope".into(), ..ProviderConfig::default() };
        let transport = StaticTransport::new(StatusCode::OK, "");
        let err = WeatherClient::with_transport(transport, provider).unwrap_err();
        assert!(err.to_string().contains("Invalid provider base URL"));
    }
}
