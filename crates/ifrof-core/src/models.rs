//! Core data models for the factory search.
//!
//! These types are shared across all IFROF crates: the validated search input,
//! the LLM-derived normalized product, transient factory candidates, their
//! verification outcome, and the persisted rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Deserialize a list that the model may emit as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a string that the model may emit as `null`.
fn null_as_blank<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// SEARCH INPUT
// =============================================================================

/// Which of the four primary inputs a search was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Image,
    Url,
    Name,
    HsCode,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Url => "url",
            Self::Name => "name",
            Self::HsCode => "hs_code",
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "url" => Ok(Self::Url),
            "name" => Ok(Self::Name),
            "hs_code" => Ok(Self::HsCode),
            _ => Err(format!("Invalid search type: {}", s)),
        }
    }
}

/// A validated product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Base64 payload without any `data:` prefix or whitespace.
    pub base64: String,
    /// MIME type from the data URL prefix or sniffed from the bytes.
    pub mime_type: String,
    /// Decoded size in bytes.
    pub decoded_len: usize,
}

impl ImageInput {
    /// `data:` URL suitable for a vision chat message.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Sanitized primary input. Exactly one variant per search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchInput {
    Image(ImageInput),
    Url(String),
    Name(String),
    HsCode(String),
}

impl SearchInput {
    pub fn search_type(&self) -> SearchType {
        match self {
            Self::Image(_) => SearchType::Image,
            Self::Url(_) => SearchType::Url,
            Self::Name(_) => SearchType::Name,
            Self::HsCode(_) => SearchType::HsCode,
        }
    }

    /// Value stored in `search.input_value`.
    ///
    /// Images are recorded as a short marker, never as the payload itself.
    pub fn stored_value(&self) -> String {
        match self {
            Self::Image(img) => format!("image:{}:{}", img.mime_type, img.decoded_len),
            Self::Url(v) | Self::Name(v) | Self::HsCode(v) => v.clone(),
        }
    }

    /// Text used when the normalizer has to degrade.
    pub fn fallback_title(&self) -> String {
        match self {
            Self::Image(_) => "product image".to_string(),
            Self::Url(v) | Self::Name(v) | Self::HsCode(v) => v.clone(),
        }
    }
}

/// Optional buyer requirements attached to a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oem_odm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certs: Vec<String>,
}

impl OptionalParams {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Human-readable requirement lines for prompts.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(qty) = self.qty {
            lines.push(format!("Quantity: {}", qty));
        }
        if let Some(ref v) = self.oem_odm {
            lines.push(format!("OEM/ODM: {}", v));
        }
        if let Some(ref v) = self.material {
            lines.push(format!("Material: {}", v));
        }
        if let Some(ref v) = self.ship_to {
            lines.push(format!("Ship to: {}", v));
        }
        if !self.certs.is_empty() {
            lines.push(format!("Certifications: {}", self.certs.join(", ")));
        }
        lines
    }
}

/// Validated search request handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSearch {
    pub input: SearchInput,
    pub optional: OptionalParams,
}

// =============================================================================
// NORMALIZED PRODUCT
// =============================================================================

/// LLM-derived structured description of the searched product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    #[serde(rename = "productTitle_ar", default, deserialize_with = "null_as_blank")]
    pub product_title_ar: String,
    #[serde(rename = "productTitle_en", default, deserialize_with = "null_as_blank")]
    pub product_title_en: String,
    #[serde(rename = "productTitle_zh", default, deserialize_with = "null_as_blank")]
    pub product_title_zh: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords_en: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords_zh: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub materials: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub possible_hs_codes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_blank")]
    pub category: String,
    #[serde(default)]
    pub must_have_specs: JsonValue,
}

impl NormalizedProduct {
    /// Minimal product used when the model call fails or returns garbage.
    pub fn degraded(raw: &str) -> Self {
        Self {
            product_title_ar: raw.to_string(),
            product_title_en: raw.to_string(),
            keywords_en: vec![raw.to_string()],
            ..Default::default()
        }
    }
}

// =============================================================================
// FACTORY CANDIDATES AND VERIFICATION
// =============================================================================

/// Unverified company extracted from search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryCandidate {
    #[serde(default, deserialize_with = "null_as_blank")]
    pub name: String,
    #[serde(default)]
    pub name_zh: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub manufacturing_signals: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub trading_signals: Vec<String>,
}

impl FactoryCandidate {
    /// Website if present and non-blank.
    pub fn website(&self) -> Option<&str> {
        self.website.as_deref().map(str::trim).filter(|w| !w.is_empty())
    }

    /// Location if present and non-blank.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// A single piece of supporting evidence for a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub evidence_type: String,
    pub claim: String,
    #[serde(rename = "sourceUrl")]
    pub source_url: String,
}

/// Outcome of scoring one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub score: i32,
    pub evidence: Vec<Evidence>,
    pub red_flags: Vec<String>,
    pub why_factory: Vec<String>,
    pub verification_steps: Vec<String>,
    pub is_accepted: bool,
}

// =============================================================================
// PERSISTED ROWS
// =============================================================================

/// Lifecycle state of a search row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    Processing,
    Completed,
    Failed,
}

impl SearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SearchStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid search status: {}", s)),
        }
    }
}

/// Request to create a search row.
#[derive(Debug, Clone)]
pub struct NewSearch {
    pub user_id: Uuid,
    pub search_type: SearchType,
    pub input_value: String,
    pub optional_params: OptionalParams,
}

/// A persisted search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Search {
    pub id: Uuid,
    pub search_type: SearchType,
    pub input_value: String,
    pub optional_params: OptionalParams,
    pub normalized_product: Option<NormalizedProduct>,
    pub status: SearchStatus,
    /// Internal failure detail. Never serialized to clients.
    #[serde(skip)]
    pub error_message: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A persisted, accepted factory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryResult {
    pub id: Uuid,
    pub search_id: Uuid,
    pub name: String,
    pub name_zh: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub links: Vec<String>,
    pub score: i32,
    pub why_factory: Vec<String>,
    pub evidence: Vec<Evidence>,
    pub red_flags: Vec<String>,
    pub verification_steps: Vec<String>,
    pub is_excluded: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// RATE LIMITING, DISCOVERY, AUTH
// =============================================================================

/// Result of the atomic daily-quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the quota resets, rounded up. Never negative.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            ((millis + 999) / 1000) as u64
        }
    }
}

/// Raw answer from the web search API for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub query: String,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

/// Authenticated caller resolved from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
    pub token_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_search_type_round_trip_strings() {
        for t in [
            SearchType::Image,
            SearchType::Url,
            SearchType::Name,
            SearchType::HsCode,
        ] {
            assert_eq!(t.as_str().parse::<SearchType>().unwrap(), t);
        }
        assert!("barcode".parse::<SearchType>().is_err());
    }

    #[test]
    fn test_search_status_terminal() {
        assert!(!SearchStatus::Processing.is_terminal());
        assert!(SearchStatus::Completed.is_terminal());
        assert!(SearchStatus::Failed.is_terminal());
        assert_eq!("failed".parse::<SearchStatus>().unwrap(), SearchStatus::Failed);
    }

    #[test]
    fn test_normalized_product_field_names() {
        let product = NormalizedProduct {
            product_title_en: "Wireless earbuds".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["productTitle_en"], "Wireless earbuds");
        assert!(json.get("keywords_en").is_some());
        assert!(json.get("possible_hs_codes").is_some());
    }

    #[test]
    fn test_normalized_product_tolerates_nulls_and_missing() {
        let json = r#"{"productTitle_en": "Cup", "keywords_en": null, "category": null}"#;
        let product: NormalizedProduct = serde_json::from_str(json).unwrap();
        assert_eq!(product.product_title_en, "Cup");
        assert!(product.keywords_en.is_empty());
        assert_eq!(product.category, "");
        assert!(product.must_have_specs.is_null());
    }

    #[test]
    fn test_degraded_product() {
        let product = NormalizedProduct::degraded("wireless earbuds");
        assert_eq!(product.product_title_ar, "wireless earbuds");
        assert_eq!(product.product_title_en, "wireless earbuds");
        assert_eq!(product.keywords_en, vec!["wireless earbuds".to_string()]);
        assert!(product.keywords_zh.is_empty());
    }

    #[test]
    fn test_candidate_blank_website_and_location_ignored() {
        let candidate = FactoryCandidate {
            name: "Acme".to_string(),
            website: Some("   ".to_string()),
            location: Some("".to_string()),
            ..Default::default()
        };
        assert!(candidate.website().is_none());
        assert!(candidate.location().is_none());
    }

    #[test]
    fn test_evidence_serializes_camel_case_source_url() {
        let evidence = Evidence {
            evidence_type: "Website".to_string(),
            claim: "Official website".to_string(),
            source_url: "https://acme.cn".to_string(),
        };
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json["type"], "Website");
        assert_eq!(json["sourceUrl"], "https://acme.cn");
    }

    #[test]
    fn test_optional_params_wire_names() {
        let params: OptionalParams =
            serde_json::from_str(r#"{"qty": 500, "oemOdm": "OEM", "shipTo": "Riyadh"}"#).unwrap();
        assert_eq!(params.qty, Some(500));
        assert_eq!(params.oem_odm.as_deref(), Some("OEM"));
        assert_eq!(params.ship_to.as_deref(), Some("Riyadh"));
        assert!(!params.is_empty());
        assert!(OptionalParams::default().is_empty());
    }

    #[test]
    fn test_image_stored_value_is_marker() {
        let input = SearchInput::Image(ImageInput {
            base64: "aGVsbG8=".to_string(),
            mime_type: "image/png".to_string(),
            decoded_len: 5,
        });
        assert_eq!(input.stored_value(), "image:image/png:5");
        assert_eq!(input.search_type(), SearchType::Image);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc::now();
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: now + Duration::milliseconds(1500),
        };
        assert_eq!(decision.retry_after_secs(now), 2);

        let exact = RateLimitDecision {
            reset_at: now + Duration::seconds(60),
            ..decision
        };
        assert_eq!(exact.retry_after_secs(now), 60);
    }

    #[test]
    fn test_retry_after_never_negative() {
        let now = Utc::now();
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: now - Duration::seconds(5),
        };
        assert_eq!(decision.retry_after_secs(now), 0);
    }
}
