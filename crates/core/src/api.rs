//! Rental backend collaborator traits.
//!
//! The turn pipeline talks to the rental backend only through [`HouseApi`]
//! and [`LandmarkLookup`]. `rentwise-listings` provides the HTTP
//! implementation; tests use in-memory mocks.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::action::ActionRequest;
use crate::error::Result;
use crate::schema::Dimension;
use crate::slots::SlotSet;

/// The three house search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEndpoint {
    ByCommunity,
    Nearby,
    ByPlatform,
}

const PAGING: [Dimension; 3] = [
    Dimension::ListingPlatform,
    Dimension::Page,
    Dimension::PageSize,
];

const BY_COMMUNITY: [Dimension; 4] = [
    Dimension::Community,
    Dimension::ListingPlatform,
    Dimension::Page,
    Dimension::PageSize,
];

const NEARBY: [Dimension; 5] = [
    Dimension::LandmarkId,
    Dimension::MaxDistance,
    Dimension::ListingPlatform,
    Dimension::Page,
    Dimension::PageSize,
];

const BY_PLATFORM: [Dimension; 23] = [
    Dimension::District,
    Dimension::Area,
    Dimension::MinPrice,
    Dimension::MaxPrice,
    Dimension::Bedrooms,
    Dimension::RentalType,
    Dimension::Decoration,
    Dimension::Orientation,
    Dimension::Elevator,
    Dimension::MinArea,
    Dimension::MaxArea,
    Dimension::PropertyType,
    Dimension::SubwayLine,
    Dimension::MaxSubwayDist,
    Dimension::SubwayStation,
    Dimension::UtilitiesType,
    Dimension::AvailableFromBefore,
    Dimension::CommuteToXierqiMax,
    Dimension::SortBy,
    Dimension::SortOrder,
    PAGING[0],
    PAGING[1],
    PAGING[2],
];

impl SearchEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ByCommunity => "by_community",
            Self::Nearby => "nearby",
            Self::ByPlatform => "by_platform",
        }
    }

    /// Backend path.
    pub fn path(&self) -> &'static str {
        match self {
            Self::ByCommunity => "/api/houses/by_community",
            Self::Nearby => "/api/houses/nearby",
            Self::ByPlatform => "/api/houses/by_platform",
        }
    }

    /// Dimensions this endpoint accepts; nothing else may be sent to it.
    pub fn legal_dimensions(&self) -> &'static [Dimension] {
        match self {
            Self::ByCommunity => &BY_COMMUNITY,
            Self::Nearby => &NEARBY,
            Self::ByPlatform => &BY_PLATFORM,
        }
    }
}

impl std::fmt::Display for SearchEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded JSON body from the rental backend.
///
/// The backend wraps payloads as `{"code": .., "message": .., "data": ..}`;
/// `data` is either an object, a list, or `{"items": [..], "total": n}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiResponse(pub Value);

impl ApiResponse {
    /// The `data` payload, or the whole body when unwrapped.
    pub fn data(&self) -> &Value {
        match self.0.get("data") {
            Some(data) if !data.is_null() => data,
            _ => &self.0,
        }
    }

    /// List entries, whether `data` is a list or carries `items`/`list`.
    pub fn items(&self) -> Option<&Vec<Value>> {
        let data = self.data();
        data.as_array()
            .or_else(|| data.get("items").and_then(Value::as_array))
            .or_else(|| data.get("list").and_then(Value::as_array))
    }

    /// Total hit count, falling back to the number of items returned.
    pub fn total(&self) -> usize {
        self.data()
            .get("total")
            .and_then(Value::as_u64)
            .map(|t| t as usize)
            .or_else(|| self.items().map(Vec::len))
            .unwrap_or(0)
    }

    /// `id` of a single object, or of the first list entry.
    pub fn first_id(&self) -> Option<String> {
        let data = self.data();
        let entry = match self.items() {
            Some(items) => items.first()?,
            None => data,
        };
        match entry.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// True when the payload carries nothing.
    pub fn is_empty(&self) -> bool {
        match self.data() {
            Value::Null => true,
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        }
    }
}

/// Landmark lookups. None of these need a user identifier.
#[async_trait]
pub trait LandmarkLookup: Send + Sync {
    async fn by_name(&self, name: &str) -> Result<ApiResponse>;

    async fn by_id(&self, id: &str) -> Result<ApiResponse>;

    async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        district: Option<&str>,
    ) -> Result<ApiResponse>;

    async fn list(&self, category: Option<&str>, district: Option<&str>) -> Result<ApiResponse>;

    async fn stats(&self) -> Result<ApiResponse>;
}

/// House endpoints. Every call carries the configured user identifier; a
/// missing identifier fails with `Error::MissingIdentity` before any I/O.
#[async_trait]
pub trait HouseApi: Send + Sync {
    /// Reset the backend's house data for this user.
    async fn init(&self) -> Result<ApiResponse>;

    async fn house(&self, house_id: &str) -> Result<ApiResponse>;

    /// Every platform listing of one house.
    async fn listings(&self, house_id: &str) -> Result<ApiResponse>;

    /// Run one search; `params` must already be restricted to the endpoint's
    /// legal dimensions.
    async fn search(&self, endpoint: SearchEndpoint, params: &SlotSet) -> Result<ApiResponse>;

    /// Landmarks around a community.
    async fn nearby_landmarks(
        &self,
        community: &str,
        category: Option<&str>,
        max_distance: Option<f64>,
    ) -> Result<ApiResponse>;

    async fn stats(&self) -> Result<ApiResponse>;

    /// Perform a mutating operation.
    async fn execute(&self, request: &ActionRequest) -> Result<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_endpoint_accepts_paging() {
        for endpoint in [
            SearchEndpoint::ByCommunity,
            SearchEndpoint::Nearby,
            SearchEndpoint::ByPlatform,
        ] {
            for dim in PAGING {
                assert!(endpoint.legal_dimensions().contains(&dim), "{endpoint} lacks {dim}");
            }
        }
    }

    #[test]
    fn by_platform_excludes_geographic_anchors() {
        let legal = SearchEndpoint::ByPlatform.legal_dimensions();
        assert!(!legal.contains(&Dimension::Community));
        assert!(!legal.contains(&Dimension::Landmark));
        assert!(!legal.contains(&Dimension::LandmarkId));
        assert!(!legal.contains(&Dimension::MaxDistance));
    }

    #[test]
    fn items_and_total_from_paged_payload() {
        let resp = ApiResponse(json!({
            "code": 0,
            "data": {"items": [{"id": "HF_1"}, {"id": "HF_2"}], "total": 37}
        }));
        assert_eq!(resp.items().map(Vec::len), Some(2));
        assert_eq!(resp.total(), 37);
        assert_eq!(resp.first_id().as_deref(), Some("HF_1"));
    }

    #[test]
    fn list_payload_and_single_object() {
        let list = ApiResponse(json!({"data": [{"id": "SS_001", "name": "西二旗站"}]}));
        assert_eq!(list.total(), 1);
        assert_eq!(list.first_id().as_deref(), Some("SS_001"));

        let single = ApiResponse(json!({"data": {"id": "LM_002"}}));
        assert!(single.items().is_none());
        assert_eq!(single.first_id().as_deref(), Some("LM_002"));

        let empty = ApiResponse(json!({"data": []}));
        assert!(empty.is_empty());
        assert_eq!(empty.first_id(), None);
    }
}
