//! Location resolution: free-text place description → coordinates.
//!
//! Resolution runs an ordered chain of fallback strategies, short-circuiting
//! on the first hit:
//!
//! 1. exact match in the curated override table;
//! 2. external geocoding on the description with any trailing `&…`
//!    disambiguator stripped (the service cannot parse "this place and a
//!    nearby second place");
//! 3. LLM coordinate inference on the original, unstripped description;
//! 4. country-level retry on the text before the first comma — override
//!    table first, then the external service again.
//!
//! Every external failure (network, timeout, malformed reply) is absorbed at
//! its tier and falls through to the next one; exhaustion means unresolved.
//! Results — including failures — are cached per session, so the chain runs
//! at most once per distinct place string, and all external geocoding calls
//! pass through one global rate gate because the service forbids bursts.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::{GeocodingConfig, InferenceConfig};
use crate::models::Coordinates;

// ============ Clock / rate gate ============

/// Time source for the rate gate. Injected so tests run without real delay.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation used outside tests.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Enforces a minimum spacing between calls to one external service.
///
/// The lock is held across the sleep intentionally: concurrent callers must
/// serialize, since the spacing applies to the service as a whole, not per
/// query.
pub struct RateGate {
    min_delay: Duration,
    clock: Arc<dyn Clock>,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_delay: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_delay,
            clock,
            last_call: Mutex::new(None),
        }
    }

    /// Block until at least `min_delay` has passed since the previous call,
    /// then claim the slot.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = self.clock.now().duration_since(prev);
            if elapsed < self.min_delay {
                self.clock.sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(self.clock.now());
    }
}

// ============ External seams ============

/// External geocoding lookup: query in, best-match coordinates or nothing.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>>;
}

/// LLM-based coordinate estimation for places the geocoder cannot find.
#[async_trait]
pub trait CoordinateInference: Send + Sync {
    async fn infer(&self, place: &str) -> Result<Option<Coordinates>>;
}

/// Nominatim-style geocoding client. All lookups pass through the shared
/// rate gate before touching the network.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    gate: RateGate,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            gate: RateGate::new(Duration::from_millis(config.min_delay_ms), clock),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>> {
        self.gate.wait().await;

        let url = format!("{}/search", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("geocoding service returned {}", status);
        }

        let results: Vec<serde_json::Value> = response.json().await?;
        let Some(first) = results.first() else {
            return Ok(None);
        };

        // Nominatim serializes lat/lon as strings.
        let lat = first.get("lat").and_then(|v| v.as_str()).and_then(|s| s.parse::<f64>().ok());
        let lon = first.get("lon").and_then(|v| v.as_str()).and_then(|s| s.parse::<f64>().ok());
        match (lat, lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinates::new(lat, lon))),
            _ => Ok(None),
        }
    }
}

/// Coordinate inference over the OpenAI chat completions API. The prompt
/// constrains the reply to `latitude, longitude` or the literal `None, None`;
/// anything else is rejected by the strict parser.
pub struct OpenAiInference {
    client: reqwest::Client,
    model: String,
}

impl OpenAiInference {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CoordinateInference for OpenAiInference {
    async fn infer(&self, place: &str) -> Result<Option<Coordinates>> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let prompt = format!(
            "다음 장소의 위도(latitude)와 경도(longitude)를 'latitude, longitude' 형식으로 \
             소수점 4자리까지 알려주세요. 모르면 'None, None'이라고 답해주세요.\n장소: \"{}\"\n좌표:",
            place
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You provide geographical coordinates."},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": 20,
            "temperature": 0.0,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("inference API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();

        Ok(parse_inference_reply(content))
    }
}

/// Strict parse of the inference reply: exactly two comma-separated numeric
/// tokens, neither `none`. Any deviation is an unresolved tier, not an error.
pub fn parse_inference_reply(reply: &str) -> Option<Coordinates> {
    let parts: Vec<&str> = reply.trim().split(',').collect();
    if parts.len() != 2 {
        return None;
    }
    let lat_str = parts[0].trim();
    let lon_str = parts[1].trim();
    if lat_str.eq_ignore_ascii_case("none") || lon_str.eq_ignore_ascii_case("none") {
        return None;
    }
    let lat = lat_str.parse::<f64>().ok()?;
    let lon = lon_str.parse::<f64>().ok()?;
    Some(Coordinates::new(lat, lon))
}

// ============ Resolution chain ============

/// Result of one strategy attempt. No tier can abort the chain early, so
/// "unresolved" is exactly chain exhaustion.
enum Outcome {
    Resolved(Coordinates),
    TryNext,
}

#[async_trait]
trait ResolutionStrategy: Send + Sync {
    async fn attempt(&self, place: &str, deps: &ResolverDeps) -> Outcome;
}

/// Shared collaborators for the strategies.
pub struct ResolverDeps {
    pub overrides: HashMap<String, Coordinates>,
    pub geocoder: Arc<dyn Geocoder>,
    pub inference: Option<Arc<dyn CoordinateInference>>,
}

struct OverrideStrategy;

#[async_trait]
impl ResolutionStrategy for OverrideStrategy {
    async fn attempt(&self, place: &str, deps: &ResolverDeps) -> Outcome {
        match deps.overrides.get(place) {
            Some(coords) => Outcome::Resolved(*coords),
            None => Outcome::TryNext,
        }
    }
}

/// Drop a trailing "`& <nearby second place>`" disambiguator the external
/// service cannot parse. The override table sees the full string; only the
/// computed tiers use the stripped form.
fn strip_disambiguator(place: &str) -> &str {
    match place.find('&') {
        Some(idx) => place[..idx].trim(),
        None => place.trim(),
    }
}

struct PrimaryGeocode;

#[async_trait]
impl ResolutionStrategy for PrimaryGeocode {
    async fn attempt(&self, place: &str, deps: &ResolverDeps) -> Outcome {
        let query = strip_disambiguator(place);
        if query.is_empty() {
            return Outcome::TryNext;
        }
        match deps.geocoder.lookup(query).await {
            Ok(Some(coords)) => Outcome::Resolved(coords),
            Ok(None) => Outcome::TryNext,
            Err(err) => {
                eprintln!("geocode: lookup failed for '{}': {}", query, err);
                Outcome::TryNext
            }
        }
    }
}

struct InferCoordinates;

#[async_trait]
impl ResolutionStrategy for InferCoordinates {
    async fn attempt(&self, place: &str, deps: &ResolverDeps) -> Outcome {
        let Some(inference) = deps.inference.as_ref() else {
            return Outcome::TryNext;
        };
        // The original description, not the stripped one: the model can use
        // the disambiguator the geocoder chokes on.
        match inference.infer(place).await {
            Ok(Some(coords)) => Outcome::Resolved(coords),
            Ok(None) => Outcome::TryNext,
            Err(err) => {
                eprintln!("geocode: inference failed for '{}': {}", place, err);
                Outcome::TryNext
            }
        }
    }
}

struct CountryFallback;

#[async_trait]
impl ResolutionStrategy for CountryFallback {
    async fn attempt(&self, place: &str, deps: &ResolverDeps) -> Outcome {
        let country = place.split(',').next().unwrap_or("").trim();
        if country.is_empty() {
            return Outcome::TryNext;
        }
        if let Some(coords) = deps.overrides.get(country) {
            return Outcome::Resolved(*coords);
        }
        match deps.geocoder.lookup(country).await {
            Ok(Some(coords)) => Outcome::Resolved(coords),
            Ok(None) => Outcome::TryNext,
            Err(err) => {
                eprintln!("geocode: country fallback failed for '{}': {}", country, err);
                Outcome::TryNext
            }
        }
    }
}

/// The session-scoped resolver: strategy chain plus write-once result cache.
pub struct LocationResolver {
    deps: ResolverDeps,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
    cache: Mutex<HashMap<String, Option<Coordinates>>>,
}

impl LocationResolver {
    pub fn new(deps: ResolverDeps) -> Self {
        Self {
            deps,
            strategies: vec![
                Box::new(OverrideStrategy),
                Box::new(PrimaryGeocode),
                Box::new(InferCoordinates),
                Box::new(CountryFallback),
            ],
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// True when the exact place string has a curated override. Used by
    /// callers to report which mechanism produced a marker.
    pub fn has_override(&self, place: &str) -> bool {
        self.deps.overrides.contains_key(place)
    }

    /// Resolve one place description. Repeated calls with the same input are
    /// served from the cache — including cached failures — so the external
    /// chain runs at most once per distinct string per session.
    pub async fn resolve(&self, place: &str) -> Option<Coordinates> {
        if place.trim().is_empty() {
            return None;
        }

        {
            let cache = self.cache.lock().await;
            if let Some(hit) = cache.get(place) {
                return *hit;
            }
        }

        let mut result = None;
        for strategy in &self.strategies {
            match strategy.attempt(place, &self.deps).await {
                Outcome::Resolved(coords) => {
                    result = Some(coords);
                    break;
                }
                Outcome::TryNext => continue,
            }
        }

        // First resolution wins; never re-resolved within a session.
        let mut cache = self.cache.lock().await;
        *cache.entry(place.to_string()).or_insert(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct StubGeocoder {
        calls: AtomicUsize,
        reply: Result<Option<Coordinates>, String>,
    }

    impl StubGeocoder {
        fn returning(reply: Option<Coordinates>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: Ok(reply),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: Err(message.to_string()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn lookup(&self, _query: &str) -> Result<Option<Coordinates>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(r) => Ok(*r),
                Err(m) => Err(anyhow::anyhow!("{}", m)),
            }
        }
    }

    struct StubInference {
        calls: AtomicUsize,
        reply: Option<Coordinates>,
    }

    impl StubInference {
        fn returning(reply: Option<Coordinates>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    #[async_trait]
    impl CoordinateInference for StubInference {
        async fn infer(&self, _place: &str) -> Result<Option<Coordinates>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply)
        }
    }

    fn resolver_with(
        overrides: HashMap<String, Coordinates>,
        geocoder: Arc<StubGeocoder>,
        inference: Option<Arc<StubInference>>,
    ) -> LocationResolver {
        LocationResolver::new(ResolverDeps {
            overrides,
            geocoder,
            inference: inference.map(|i| i as Arc<dyn CoordinateInference>),
        })
    }

    #[tokio::test]
    async fn override_match_invokes_no_external_service() {
        let lima = Coordinates::new(-12.0464, -77.0428);
        let overrides = HashMap::from([("페루, 리마".to_string(), lima)]);
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let inference = Arc::new(StubInference::returning(None));
        let resolver = resolver_with(overrides, geocoder.clone(), Some(inference.clone()));

        let resolved = resolver.resolve("페루, 리마").await;
        assert_eq!(resolved, Some(lima));
        assert_eq!(geocoder.call_count(), 0);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_geocode_result_short_circuits() {
        let cusco = Coordinates::new(-13.5319, -71.9675);
        let geocoder = Arc::new(StubGeocoder::returning(Some(cusco)));
        let inference = Arc::new(StubInference::returning(None));
        let resolver = resolver_with(HashMap::new(), geocoder.clone(), Some(inference.clone()));

        assert_eq!(resolver.resolve("페루, 쿠스코").await, Some(cusco));
        assert_eq!(geocoder.call_count(), 1);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresolved_chain_is_cached_and_runs_once() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let inference = Arc::new(StubInference::returning(None));
        let resolver = resolver_with(HashMap::new(), geocoder.clone(), Some(inference.clone()));

        assert_eq!(resolver.resolve("미지의 장소").await, None);
        // Primary tier plus country fallback.
        assert_eq!(geocoder.call_count(), 2);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);

        // Second call: served from cache, no further external activity.
        assert_eq!(resolver.resolve("미지의 장소").await, None);
        assert_eq!(geocoder.call_count(), 2);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn country_token_falls_back_to_override_table() {
        let peru = Coordinates::new(-9.19, -75.0152);
        let overrides = HashMap::from([("페루".to_string(), peru)]);
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let inference = Arc::new(StubInference::returning(None));
        let resolver = resolver_with(overrides, geocoder.clone(), Some(inference.clone()));

        let resolved = resolver.resolve("페루, 이키토스").await;
        assert_eq!(resolved, Some(peru));
        // Only the primary tier reached the geocoder; the country tier was
        // satisfied by the override table.
        assert_eq!(geocoder.call_count(), 1);
        assert_eq!(inference.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn service_errors_degrade_to_unresolved() {
        let geocoder = Arc::new(StubGeocoder::failing("connection refused"));
        let resolver = resolver_with(HashMap::new(), geocoder.clone(), None);

        assert_eq!(resolver.resolve("볼리비아, 포토시").await, None);
        assert_eq!(geocoder.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_place_resolves_to_none_without_calls() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let resolver = resolver_with(HashMap::new(), geocoder.clone(), None);
        assert_eq!(resolver.resolve("   ").await, None);
        assert_eq!(geocoder.call_count(), 0);
    }

    #[test]
    fn disambiguator_suffix_is_stripped() {
        assert_eq!(strip_disambiguator("페루, 리마 & Callao"), "페루, 리마");
        assert_eq!(strip_disambiguator("칠레, 산티아고"), "칠레, 산티아고");
    }

    #[test]
    fn inference_reply_parses_strictly() {
        let coords = parse_inference_reply("-12.0464, -77.0428").unwrap();
        assert_eq!(coords.latitude, -12.0464);
        assert_eq!(coords.longitude, -77.0428);

        assert!(parse_inference_reply("None, None").is_none());
        assert!(parse_inference_reply("none, -77.0").is_none());
        assert!(parse_inference_reply("-12.0").is_none());
        assert!(parse_inference_reply("-12.0, -77.0, 3.0").is_none());
        assert!(parse_inference_reply("lat, lon").is_none());
        assert!(parse_inference_reply("").is_none());
    }

    // ----- rate gate -----

    struct ManualClock {
        now: StdMutex<Instant>,
        slept: StdMutex<Vec<Duration>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: StdMutex::new(Instant::now()),
                slept: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
            let mut now = self.now.lock().unwrap();
            *now += duration;
        }
    }

    #[tokio::test]
    async fn rate_gate_spaces_back_to_back_calls() {
        let clock = Arc::new(ManualClock::new());
        let gate = RateGate::new(Duration::from_millis(1100), clock.clone());

        gate.wait().await;
        assert!(clock.slept.lock().unwrap().is_empty());

        // Immediate second call: the gate must sleep out the full delay.
        gate.wait().await;
        let slept = clock.slept.lock().unwrap();
        assert_eq!(slept.len(), 1);
        assert_eq!(slept[0], Duration::from_millis(1100));
    }

    #[tokio::test]
    async fn rate_gate_skips_sleep_after_enough_elapsed() {
        let clock = Arc::new(ManualClock::new());
        let gate = RateGate::new(Duration::from_millis(1100), clock.clone());

        gate.wait().await;
        *clock.now.lock().unwrap() += Duration::from_millis(2000);
        gate.wait().await;
        assert!(clock.slept.lock().unwrap().is_empty());
    }
}
