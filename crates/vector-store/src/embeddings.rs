use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use manualrag_config::Config;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBED_DIM: usize = 1536;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_RETRIES: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// Remote OpenAI-compatible embeddings endpoint
    OpenAi,
    /// Deterministic hashed vectors, no network
    Stub,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported MANUALRAG_EMBEDDING_MODE '{other}' (expected 'openai' or 'stub')"
            ))),
        }
    }

    pub fn from_env() -> Result<Self> {
        let raw = env::var("MANUALRAG_EMBEDDING_MODE").unwrap_or_else(|_| "openai".to_string());
        Self::parse(&raw)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Stub => "stub",
        }
    }
}

/// Retry schedule for embedding calls.
///
/// The wait before retry number `n` (after the `n`-th failed attempt) is
/// `base_delay * 2^n`, so the defaults wait 2, 4, 8 and 16 seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt)
            .unwrap_or(MAX_BACKOFF_EXPONENT)
            .min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddingSettings {
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    /// Bound on a single attempt
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBED_DIM,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingSettings {
    /// Defaults overridden by `MANUALRAG_EMBEDDING_MODEL`, `MANUALRAG_EMBED_DIM`,
    /// `MANUALRAG_EMBEDDING_BASE_URL`, `MANUALRAG_MAX_RETRIES` and `MANUALRAG_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: env_string("MANUALRAG_EMBEDDING_MODEL").unwrap_or(defaults.model),
            dimension: env_usize("MANUALRAG_EMBED_DIM").unwrap_or(defaults.dimension),
            base_url: env_string("MANUALRAG_EMBEDDING_BASE_URL").unwrap_or(defaults.base_url),
            timeout: env_usize("MANUALRAG_TIMEOUT_SECS")
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.timeout),
            retry: RetryPolicy {
                max_attempts: env_usize("MANUALRAG_MAX_RETRIES")
                    .unwrap_or(defaults.retry.max_attempts),
                ..defaults.retry
            },
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_usize(name: &str) -> Option<usize> {
    env_string(name)
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
}

/// The remote embedding service. One call is one attempt; retries live in
/// [`EmbeddingClient`].
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn model_id(&self) -> &str;

    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Builds an [`EmbeddingService`] from freshly loaded configuration.
pub trait EmbeddingConnector: Send + Sync {
    fn settings(&self) -> &EmbeddingSettings;

    fn connect(&self, config: &Config) -> Result<Arc<dyn EmbeddingService>>;

    fn client(&self, config: &Config) -> Result<EmbeddingClient> {
        Ok(EmbeddingClient::new(self.connect(config)?, self.settings()))
    }
}

/// Connector selecting the backend through [`EmbeddingMode`].
#[derive(Clone, Debug)]
pub struct DefaultEmbeddingConnector {
    mode: EmbeddingMode,
    settings: EmbeddingSettings,
}

impl DefaultEmbeddingConnector {
    #[must_use]
    pub const fn new(mode: EmbeddingMode, settings: EmbeddingSettings) -> Self {
        Self { mode, settings }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            EmbeddingMode::from_env()?,
            EmbeddingSettings::from_env(),
        ))
    }

    #[must_use]
    pub const fn mode(&self) -> EmbeddingMode {
        self.mode
    }
}

impl EmbeddingConnector for DefaultEmbeddingConnector {
    fn settings(&self) -> &EmbeddingSettings {
        &self.settings
    }

    fn connect(&self, config: &Config) -> Result<Arc<dyn EmbeddingService>> {
        match self.mode {
            EmbeddingMode::OpenAi => Ok(Arc::new(OpenAiEmbeddingService::new(
                config.credential()?,
                &self.settings,
            )?)),
            EmbeddingMode::Stub => Ok(Arc::new(StubEmbeddingService::new(
                self.settings.dimension,
            ))),
        }
    }
}

/// Embedding client with per-attempt timeout and exponential backoff.
#[derive(Clone)]
pub struct EmbeddingClient {
    service: Arc<dyn EmbeddingService>,
    dimension: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(service: Arc<dyn EmbeddingService>, settings: &EmbeddingSettings) -> Self {
        Self {
            service,
            dimension: settings.dimension,
            timeout: settings.timeout,
            retry: settings.retry,
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }

    /// Embed a batch, retrying transient failures.
    ///
    /// The result has exactly one vector of `dimension` floats per input, in input order.
    /// A response with the wrong number of vectors or the wrong dimension is not retried.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match tokio::time::timeout(self.timeout, self.service.embed(texts)).await {
                Ok(Ok(vectors)) => return self.validate(texts.len(), vectors, attempt),
                Ok(Err(err)) => last_error = err.to_string(),
                Err(_) => last_error = format!("request timed out after {:?}", self.timeout),
            }

            if attempt < max_attempts {
                let wait = self.retry.backoff(attempt);
                log::warn!(
                    "Embedding batch of {} failed (attempt {attempt}/{max_attempts}): {last_error}; retrying in {wait:?}",
                    texts.len()
                );
                tokio::time::sleep(wait).await;
            }
        }

        log::error!("Embedding batch of {} failed permanently: {last_error}", texts.len());
        Err(VectorStoreError::EmbeddingFailure {
            attempts: max_attempts,
            message: last_error,
        })
    }

    fn validate(
        &self,
        expected: usize,
        vectors: Vec<Vec<f32>>,
        attempt: usize,
    ) -> Result<Vec<Vec<f32>>> {
        if vectors.len() != expected {
            return Err(VectorStoreError::EmbeddingFailure {
                attempts: attempt,
                message: format!(
                    "service returned {} embeddings for {expected} inputs",
                    vectors.len()
                ),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

/// OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbeddingService {
    pub fn new(credential: &str, settings: &EmbeddingSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", credential.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| {
                VectorStoreError::EmbeddingError("invalid embedding service credential".into())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingService {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(VectorStoreError::EmbeddingError(format!(
                "embeddings request failed ({status}): {body}"
            )));
        }

        let parsed: EmbeddingResponse = resp.json().await.map_err(|e| {
            VectorStoreError::EmbeddingError(format!("failed to parse embedding response: {e}"))
        })?;
        Ok(parsed.into_input_order())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingResponse {
    fn into_input_order(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|entry| entry.index);
        self.data.into_iter().map(|entry| entry.embedding).collect()
    }
}

/// Offline backend producing deterministic unit vectors from a text hash.
#[derive(Clone, Debug)]
pub struct StubEmbeddingService {
    dimension: usize,
}

impl StubEmbeddingService {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingService for StubEmbeddingService {
    fn model_id(&self) -> &str {
        "stub"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect())
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state = fnv1a_64(text.as_bytes());
    let mut vec: Vec<f32> = (0..dimension)
        .map(|_| {
            let bits = splitmix64(&mut state) >> 40;
            (bits as f32 / (1u64 << 24) as f32).mul_add(2.0, -1.0)
        })
        .collect();
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls, then returns constant vectors.
    struct FlakyService {
        failures: usize,
        dimension: usize,
        calls: AtomicUsize,
    }

    impl FlakyService {
        fn new(failures: usize, dimension: usize) -> Self {
            Self {
                failures,
                dimension,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingService for FlakyService {
        fn model_id(&self) -> &str {
            "flaky"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(VectorStoreError::EmbeddingError("429 rate limited".into()));
            }
            Ok(texts
                .iter()
                .enumerate()
                .map(|(i, _)| vec![i as f32; self.dimension])
                .collect())
        }
    }

    struct SlowService;

    #[async_trait]
    impl EmbeddingService for SlowService {
        fn model_id(&self) -> &str {
            "slow"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(vec![vec![0.0; 4]; texts.len()])
        }
    }

    /// Returns a fixed response regardless of input.
    struct FixedService(Vec<Vec<f32>>);

    #[async_trait]
    impl EmbeddingService for FixedService {
        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(self.0.clone())
        }
    }

    fn settings(dimension: usize) -> EmbeddingSettings {
        EmbeddingSettings {
            dimension,
            ..EmbeddingSettings::default()
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(16));
    }

    #[test]
    fn embedding_mode_parse() {
        assert_eq!(EmbeddingMode::parse("stub").unwrap(), EmbeddingMode::Stub);
        assert_eq!(EmbeddingMode::parse(" OpenAI ").unwrap(), EmbeddingMode::OpenAi);
        assert!(EmbeddingMode::parse("onnx").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exponential_backoff_then_succeeds() {
        let service = Arc::new(FlakyService::new(2, 3));
        let client = EmbeddingClient::new(service.clone(), &settings(3));

        let started = tokio::time::Instant::now();
        let vectors = client.embed_batch(&texts(4)).await.unwrap();

        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[2], vec![2.0; 3]);
        // 2s after the first failure, 4s after the second.
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_embedding_failure() {
        let service = Arc::new(FlakyService::new(usize::MAX, 3));
        let client = EmbeddingClient::new(service.clone(), &settings(3));

        let err = client.embed_batch(&texts(2)).await.unwrap_err();
        assert_eq!(service.calls.load(Ordering::SeqCst), DEFAULT_MAX_RETRIES);
        match err {
            VectorStoreError::EmbeddingFailure { attempts, message } => {
                assert_eq!(attempts, DEFAULT_MAX_RETRIES);
                assert!(message.contains("rate limited"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_is_bounded_by_timeout() {
        let mut settings = settings(4);
        settings.retry.max_attempts = 2;
        let client = EmbeddingClient::new(Arc::new(SlowService), &settings);

        let started = tokio::time::Instant::now();
        let err = client.embed_batch(&texts(1)).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::EmbeddingFailure { attempts: 2, .. }));
        assert!(err.to_string().contains("timed out"));
        // Two 30s timeouts plus one 2s backoff.
        assert!(started.elapsed() < Duration::from_secs(70));
    }

    #[tokio::test]
    async fn wrong_vector_count_is_rejected() {
        let client = EmbeddingClient::new(
            Arc::new(FixedService(vec![vec![0.0, 1.0]])),
            &settings(2),
        );
        let err = client.embed_batch(&texts(3)).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::EmbeddingFailure { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let client = EmbeddingClient::new(
            Arc::new(FixedService(vec![vec![0.0, 1.0, 2.0]])),
            &settings(2),
        );
        let err = client.embed_batch(&texts(1)).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::InvalidDimension {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn empty_batch_skips_the_service() {
        let service = Arc::new(FlakyService::new(0, 3));
        let client = EmbeddingClient::new(service.clone(), &settings(3));
        assert!(client.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stub_vectors_are_deterministic_unit_vectors() {
        let stub = StubEmbeddingService::new(16);
        let a = stub.embed(&texts(2)).await.unwrap();
        let b = stub.embed(&texts(2)).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn openai_response_is_reordered_by_index() {
        let raw = r#"{"data":[
            {"embedding":[2.0],"index":2},
            {"embedding":[0.0],"index":0},
            {"embedding":[1.0],"index":1}
        ]}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_input_order(), vec![vec![0.0], vec![1.0], vec![2.0]]);
    }

    #[test]
    fn openai_connector_requires_credential() {
        let connector = DefaultEmbeddingConnector::new(EmbeddingMode::OpenAi, settings(8));
        let err = connector.connect(&Config::default()).err().unwrap();
        assert!(matches!(err, VectorStoreError::ConfigError(_)));
    }

    #[test]
    fn stub_connector_ignores_credential() {
        let connector = DefaultEmbeddingConnector::new(EmbeddingMode::Stub, settings(8));
        let client = connector.client(&Config::default()).unwrap();
        assert_eq!(client.dimension(), 8);
        assert_eq!(client.model_id(), "stub");
    }
}
