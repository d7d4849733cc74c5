//! Query router: accumulated slots in, exactly one search call out.
//!
//! Priority, first match wins:
//! 1. `community` → `by_community`
//! 2. `landmark_id` or `landmark` → `nearby` (names are resolved first)
//! 3. anything else → `by_platform`

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use rentwise_config::RoutingConfig;
use rentwise_core::error::{Error, Result, RoutingError, UpstreamError};
use rentwise_core::{
    ApiResponse, Dimension, LandmarkLookup, ListingPlatform, SearchEndpoint, SlotSet, SlotValue,
};

/// Dimensions that shape a result page but are not search conditions.
const PRESENTATION: [Dimension; 4] = [
    Dimension::Page,
    Dimension::PageSize,
    Dimension::SortBy,
    Dimension::SortOrder,
];

/// Values filled in when the slots leave them unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDefaults {
    pub page_size: Option<u32>,
    pub page: Option<u32>,
    pub listing_platform: Option<ListingPlatform>,
    /// `max_distance` for nearby searches, in meters.
    pub nearby_max_distance: f64,
}

impl Default for RouteDefaults {
    fn default() -> Self {
        Self {
            page_size: None,
            page: None,
            listing_platform: None,
            nearby_max_distance: 2000.0,
        }
    }
}

impl RouteDefaults {
    pub fn from_config(config: &RoutingConfig) -> Result<Self> {
        let listing_platform = config
            .listing_platform
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(str::parse::<ListingPlatform>)
            .transpose()?;
        Ok(Self {
            page_size: Some(config.page_size),
            page: config.page,
            listing_platform,
            nearby_max_distance: config.nearby_max_distance,
        })
    }
}

/// The router's decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedQuery {
    pub endpoint: SearchEndpoint,
    /// Always a subset of `endpoint.legal_dimensions()`.
    pub params: SlotSet,
}

#[derive(Debug, Clone, Default)]
pub struct QueryRouter {
    defaults: RouteDefaults,
}

impl QueryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: RouteDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &RouteDefaults {
        &self.defaults
    }

    /// Pick the endpoint for `slots` without any I/O.
    pub fn select_endpoint(slots: &SlotSet) -> std::result::Result<SearchEndpoint, RoutingError> {
        if slots.contains(Dimension::Community) {
            return Ok(SearchEndpoint::ByCommunity);
        }
        if slots.contains(Dimension::LandmarkId) || slots.contains(Dimension::Landmark) {
            return Ok(SearchEndpoint::Nearby);
        }

        let has_condition = slots.dimensions().any(|d| !PRESENTATION.contains(&d));
        if !has_condition {
            return Err(RoutingError::NoConditions);
        }
        check_bounds(slots, Dimension::MinPrice, Dimension::MaxPrice, "价格")?;
        check_bounds(slots, Dimension::MinArea, Dimension::MaxArea, "面积")?;
        Ok(SearchEndpoint::ByPlatform)
    }

    /// Route `slots`, resolving a landmark name through `resolver` when needed.
    pub async fn route(
        &self,
        slots: &SlotSet,
        resolver: &LandmarkResolver,
    ) -> std::result::Result<RoutedQuery, RoutingError> {
        let endpoint = Self::select_endpoint(slots)?;
        let mut params = slots.project(endpoint.legal_dimensions());

        if endpoint == SearchEndpoint::Nearby {
            if !params.contains(Dimension::LandmarkId) {
                let name = slots.text(Dimension::Landmark).unwrap_or_default();
                let id = resolver.resolve(name).await?;
                params.insert(Dimension::LandmarkId, SlotValue::Text(id));
            }
            if !params.contains(Dimension::MaxDistance) {
                params.insert(
                    Dimension::MaxDistance,
                    SlotValue::Float(self.defaults.nearby_max_distance),
                );
            }
        }
        self.apply_defaults(&mut params);

        info!(%endpoint, %params, "Route selected");
        Ok(RoutedQuery { endpoint, params })
    }

    fn apply_defaults(&self, params: &mut SlotSet) {
        if let Some(platform) = self.defaults.listing_platform {
            if !params.contains(Dimension::ListingPlatform) {
                params.insert(
                    Dimension::ListingPlatform,
                    SlotValue::Text(platform.as_str().to_string()),
                );
            }
        }
        if let Some(page) = self.defaults.page {
            if !params.contains(Dimension::Page) {
                params.insert(Dimension::Page, SlotValue::Integer(i64::from(page)));
            }
        }
        if let Some(page_size) = self.defaults.page_size {
            if !params.contains(Dimension::PageSize) {
                params.insert(Dimension::PageSize, SlotValue::Integer(i64::from(page_size)));
            }
        }
    }
}

fn check_bounds(
    slots: &SlotSet,
    min: Dimension,
    max: Dimension,
    label: &str,
) -> std::result::Result<(), RoutingError> {
    match (slots.integer(min), slots.integer(max)) {
        (Some(lo), Some(hi)) if lo > hi => Err(RoutingError::Contradictory(format!(
            "{label}下限 {lo} 高于上限 {hi}"
        ))),
        _ => Ok(()),
    }
}

/// Turns landmark names into backend identifiers, caching successes for the
/// lifetime of the process.
pub struct LandmarkResolver {
    lookup: Arc<dyn LandmarkLookup>,
    cache: RwLock<HashMap<String, String>>,
}

impl LandmarkResolver {
    pub fn new(lookup: Arc<dyn LandmarkLookup>) -> Self {
        Self {
            lookup,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn lookup(&self) -> &Arc<dyn LandmarkLookup> {
        &self.lookup
    }

    /// Resolve `name` to a landmark id.
    ///
    /// Id-shaped values (`SS_001`) are checked directly; otherwise the exact
    /// name, then the name with `站` appended, then a fuzzy search.
    pub async fn resolve(&self, name: &str) -> std::result::Result<String, RoutingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoutingError::LandmarkUnresolved(String::new()));
        }
        if let Some(id) = self.cache.read().await.get(name) {
            return Ok(id.clone());
        }

        let id = self.lookup_uncached(name).await?;
        let Some(id) = id else {
            debug!(landmark = name, "Landmark not found");
            return Err(RoutingError::LandmarkUnresolved(name.to_string()));
        };

        debug!(landmark = name, landmark_id = %id, "Landmark resolved");
        self.cache.write().await.insert(name.to_string(), id.clone());
        Ok(id)
    }

    async fn lookup_uncached(&self, name: &str) -> std::result::Result<Option<String>, RoutingError> {
        if looks_like_landmark_id(name) {
            let found = found(name, self.lookup.by_id(name).await)?;
            if found.is_some() {
                return Ok(found);
            }
        }

        if let Some(id) = found(name, self.lookup.by_name(name).await)? {
            return Ok(Some(id));
        }
        if !name.ends_with('站') {
            let station = format!("{name}站");
            if let Some(id) = found(name, self.lookup.by_name(&station).await)? {
                return Ok(Some(id));
            }
        }
        found(name, self.lookup.search(name, None, None).await)
    }
}

fn looks_like_landmark_id(value: &str) -> bool {
    value.contains('_')
        && value.len() <= 10
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Interpret one lookup: a hit yields its id, a client-side miss yields
/// `None`, anything else aborts resolution.
fn found(
    name: &str,
    result: Result<ApiResponse>,
) -> std::result::Result<Option<String>, RoutingError> {
    match result {
        Ok(response) if response.is_empty() => Ok(None),
        Ok(response) => Ok(response.first_id()),
        Err(Error::Upstream(UpstreamError::Status { status_code, .. })) if status_code < 500 => {
            Ok(None)
        }
        Err(e) => Err(RoutingError::LookupFailed {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// In-memory landmark table keyed by exact name.
    #[derive(Default)]
    pub struct MockLandmarks {
        pub by_name: HashMap<String, String>,
        pub fail_with: Option<UpstreamError>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockLandmarks {
        pub fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                by_name: entries
                    .iter()
                    .map(|(n, id)| (n.to_string(), id.to_string()))
                    .collect(),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(e) => Err(Error::Upstream(e.clone())),
                None => Ok(()),
            }
        }

        fn not_found() -> Result<ApiResponse> {
            Err(Error::Upstream(UpstreamError::Status {
                status_code: 404,
                body: "landmark not found".into(),
            }))
        }
    }

    #[async_trait]
    impl LandmarkLookup for MockLandmarks {
        async fn by_name(&self, name: &str) -> Result<ApiResponse> {
            self.record(format!("by_name:{name}"))?;
            match self.by_name.get(name) {
                Some(id) => Ok(ApiResponse(json!({"code": 0, "data": {"id": id, "name": name}}))),
                None => Self::not_found(),
            }
        }

        async fn by_id(&self, id: &str) -> Result<ApiResponse> {
            self.record(format!("by_id:{id}"))?;
            if self.by_name.values().any(|v| v == id) {
                Ok(ApiResponse(json!({"code": 0, "data": {"id": id}})))
            } else {
                Self::not_found()
            }
        }

        async fn search(
            &self,
            query: &str,
            _category: Option<&str>,
            _district: Option<&str>,
        ) -> Result<ApiResponse> {
            self.record(format!("search:{query}"))?;
            let hits: Vec<Value> = self
                .by_name
                .iter()
                .filter(|(n, _)| n.contains(query))
                .map(|(n, id)| json!({"id": id, "name": n}))
                .collect();
            let total = hits.len();
            Ok(ApiResponse(json!({"code": 0, "data": {"items": hits, "total": total}})))
        }

        async fn list(&self, _category: Option<&str>, _district: Option<&str>) -> Result<ApiResponse> {
            Ok(ApiResponse(json!({"code": 0, "data": []})))
        }

        async fn stats(&self) -> Result<ApiResponse> {
            Ok(ApiResponse(json!({"code": 0, "data": {"total": self.by_name.len()}})))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::MockLandmarks;
    use super::*;

    fn slots(pairs: &[(Dimension, &str)]) -> SlotSet {
        let mut s = SlotSet::new();
        for (d, v) in pairs {
            s.set(*d, v).unwrap();
        }
        s
    }

    fn resolver(lookup: MockLandmarks) -> LandmarkResolver {
        LandmarkResolver::new(Arc::new(lookup))
    }

    fn keys(query: &RoutedQuery) -> Vec<Dimension> {
        query.params.dimensions().collect()
    }

    #[test]
    fn empty_slots_have_no_route() {
        assert_eq!(
            QueryRouter::select_endpoint(&SlotSet::new()),
            Err(RoutingError::NoConditions)
        );
        let paging_only = slots(&[(Dimension::Page, "2")]);
        assert_eq!(
            QueryRouter::select_endpoint(&paging_only),
            Err(RoutingError::NoConditions)
        );
    }

    #[test]
    fn inverted_price_range_is_contradictory() {
        let s = slots(&[(Dimension::MinPrice, "6000"), (Dimension::MaxPrice, "3000")]);
        assert!(matches!(
            QueryRouter::select_endpoint(&s),
            Err(RoutingError::Contradictory(_))
        ));
    }

    #[tokio::test]
    async fn community_beats_landmark() {
        let lookup = Arc::new(MockLandmarks::with(&[("国贸", "LM_001")]));
        let r = LandmarkResolver::new(lookup.clone());
        let s = slots(&[
            (Dimension::Community, "X"),
            (Dimension::Landmark, "国贸"),
            (Dimension::District, "朝阳"),
        ]);

        let routed = QueryRouter::new().route(&s, &r).await.unwrap();
        assert_eq!(routed.endpoint, SearchEndpoint::ByCommunity);
        assert_eq!(keys(&routed), vec![Dimension::Community]);
        assert_eq!(routed.params.text(Dimension::Community), Some("X"));
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn community_alone_gets_paging_defaults() {
        let defaults = RouteDefaults {
            page_size: Some(20),
            page: Some(1),
            listing_platform: Some(ListingPlatform::Lianjia),
            ..RouteDefaults::default()
        };
        let s = slots(&[(Dimension::Community, "建清园(南区)")]);
        let routed = QueryRouter::with_defaults(defaults)
            .route(&s, &resolver(MockLandmarks::default()))
            .await
            .unwrap();

        assert_eq!(routed.endpoint, SearchEndpoint::ByCommunity);
        assert_eq!(
            keys(&routed),
            vec![
                Dimension::ListingPlatform,
                Dimension::Page,
                Dimension::PageSize,
                Dimension::Community,
            ]
        );
        assert_eq!(routed.params.text(Dimension::Community), Some("建清园(南区)"));
    }

    #[tokio::test]
    async fn landmark_is_resolved_before_nearby() {
        let r = resolver(MockLandmarks::with(&[("西二旗站", "SS_001")]));
        let s = slots(&[(Dimension::Landmark, "西二旗站")]);

        let routed = QueryRouter::new().route(&s, &r).await.unwrap();
        assert_eq!(routed.endpoint, SearchEndpoint::Nearby);
        assert_eq!(routed.params.text(Dimension::LandmarkId), Some("SS_001"));
        assert_eq!(
            routed.params.get(Dimension::MaxDistance),
            Some(&SlotValue::Float(2000.0))
        );
        assert!(!routed.params.contains(Dimension::Landmark));
    }

    #[tokio::test]
    async fn unresolvable_landmark_is_an_error_not_a_fallback() {
        let r = resolver(MockLandmarks::default());
        let s = slots(&[(Dimension::Landmark, "不存在的地方"), (Dimension::District, "海淀")]);

        let err = QueryRouter::new().route(&s, &r).await.unwrap_err();
        assert_eq!(err, RoutingError::LandmarkUnresolved("不存在的地方".into()));
    }

    #[tokio::test]
    async fn lookup_outage_is_reported() {
        let lookup = MockLandmarks {
            fail_with: Some(UpstreamError::Network("connection refused".into())),
            ..MockLandmarks::default()
        };
        let err = resolver(lookup).resolve("国贸").await.unwrap_err();
        assert!(matches!(err, RoutingError::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn station_suffix_and_cache() {
        let lookup = Arc::new(MockLandmarks::with(&[("西二旗站", "SS_001")]));
        let r = LandmarkResolver::new(lookup.clone());

        assert_eq!(r.resolve("西二旗").await.unwrap(), "SS_001");
        assert_eq!(
            *lookup.calls.lock().unwrap(),
            vec!["by_name:西二旗".to_string(), "by_name:西二旗站".to_string()]
        );

        assert_eq!(r.resolve("西二旗").await.unwrap(), "SS_001");
        assert_eq!(lookup.call_count(), 2);
    }

    #[tokio::test]
    async fn id_shaped_values_are_checked_by_id() {
        let lookup = Arc::new(MockLandmarks::with(&[("国贸", "LM_007")]));
        let r = LandmarkResolver::new(lookup.clone());
        assert_eq!(r.resolve("LM_007").await.unwrap(), "LM_007");
        assert_eq!(*lookup.calls.lock().unwrap(), vec!["by_id:LM_007".to_string()]);
    }

    #[tokio::test]
    async fn fuzzy_search_is_last_resort() {
        let r = resolver(MockLandmarks::with(&[("望京SOHO", "CO_010")]));
        assert_eq!(r.resolve("望京").await.unwrap(), "CO_010");
    }

    #[tokio::test]
    async fn explicit_landmark_id_skips_lookup() {
        let lookup = Arc::new(MockLandmarks::default());
        let r = LandmarkResolver::new(lookup.clone());
        let s = slots(&[
            (Dimension::LandmarkId, "SS_009"),
            (Dimension::MaxDistance, "800"),
            (Dimension::Bedrooms, "2"),
        ]);

        let routed = QueryRouter::new().route(&s, &r).await.unwrap();
        assert_eq!(keys(&routed), vec![Dimension::LandmarkId, Dimension::MaxDistance]);
        assert_eq!(routed.params.to_string(), "{landmark_id=SS_009, max_distance=800}");
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn attribute_search_forwards_everything_legal() {
        let s = slots(&[
            (Dimension::District, "海淀"),
            (Dimension::MaxPrice, "5000"),
            (Dimension::Bedrooms, "1"),
            (Dimension::RentalType, "整租"),
            (Dimension::MaxSubwayDist, "800"),
        ]);
        let routed = QueryRouter::new()
            .route(&s, &resolver(MockLandmarks::default()))
            .await
            .unwrap();
        assert_eq!(routed.endpoint, SearchEndpoint::ByPlatform);
        assert_eq!(routed.params, s);
    }

    #[test]
    fn defaults_from_config() {
        let config = RoutingConfig {
            listing_platform: Some("安居客".into()),
            ..RoutingConfig::default()
        };
        let defaults = RouteDefaults::from_config(&config).unwrap();
        assert_eq!(defaults.page_size, Some(20));
        assert_eq!(defaults.listing_platform, Some(ListingPlatform::Anjuke));

        let bad = RoutingConfig {
            listing_platform: Some("闲鱼".into()),
            ..RoutingConfig::default()
        };
        assert!(RouteDefaults::from_config(&bad).is_err());
    }
}
