//! Request body validation and sanitization.
//!
//! Turns the raw JSON body into a [`ValidatedSearch`]: exactly one primary
//! input plus sanitized optional requirements. Pure, no I/O.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use ifrof_core::defaults::{
    HS_CODE_PATTERN, MAX_CERTS, MAX_CERT_CHARS, MAX_IMAGE_BYTES, MAX_OPTIONAL_TEXT_CHARS,
    MAX_PRODUCT_NAME_CHARS, MAX_PRODUCT_URL_CHARS,
};
use ifrof_core::{ImageInput, OptionalParams, SearchInput, ValidatedSearch};

static HS_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(HS_CODE_PATTERN).expect("HS code pattern is valid"));

static BASE64_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("base64 pattern is valid"));

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Raw request body of the factory search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestBody {
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub hs_code: Option<String>,
    #[serde(default)]
    pub optional: Option<RawOptionalParams>,
}

/// Raw `optional` object, before sanitization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptionalParams {
    /// Number or numeric string.
    #[serde(default)]
    pub qty: Option<JsonValue>,
    #[serde(default)]
    pub oem_odm: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub ship_to: Option<String>,
    #[serde(default)]
    pub certs: Option<Vec<String>>,
}

/// Why a request body was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no input provided")]
    NoInput,

    #[error("product name exceeds {max} characters")]
    NameTooLong { max: usize },

    #[error("invalid url")]
    InvalidUrl,

    #[error("invalid hs code")]
    InvalidHsCode,

    #[error("image exceeds {max_bytes} bytes")]
    ImageTooLarge { max_bytes: usize },

    #[error("invalid image")]
    InvalidImage,

    #[error("quantity must be a positive integer")]
    InvalidQuantity,
}

impl ValidationError {
    /// Stable key used to look up localized messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoInput => "no_input",
            Self::NameTooLong { .. } => "name_too_long",
            Self::InvalidUrl => "invalid_url",
            Self::InvalidHsCode => "invalid_hs_code",
            Self::ImageTooLarge { .. } => "image_too_large",
            Self::InvalidImage => "invalid_image",
            Self::InvalidQuantity => "invalid_quantity",
        }
    }
}

/// Strip control characters and angle brackets, trim, and cap at `max` chars.
pub fn sanitize_text(raw: &str, max: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && *c != '<' && *c != '>')
        .collect();
    cleaned.trim().chars().take(max).collect::<String>().trim_end().to_string()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Validate a request body.
///
/// When several primary inputs are present the first non-blank one in the
/// order image, url, name, hs code wins.
pub fn validate(body: &SearchRequestBody) -> Result<ValidatedSearch, ValidationError> {
    let candidates = [
        ("imageBase64", non_blank(&body.image_base64)),
        ("productUrl", non_blank(&body.product_url)),
        ("productName", non_blank(&body.product_name)),
        ("hsCode", non_blank(&body.hs_code)),
    ];

    let mut present = candidates
        .iter()
        .filter_map(|(field, value)| value.map(|v| (*field, v)));

    let (field, raw) = present.next().ok_or(ValidationError::NoInput)?;
    let ignored: Vec<&str> = present.map(|(f, _)| f).collect();
    if !ignored.is_empty() {
        debug!(
            subsystem = "search",
            component = "validation",
            used = field,
            ignored = ?ignored,
            "Multiple primary inputs supplied"
        );
    }

    let input = match field {
        "imageBase64" => SearchInput::Image(validate_image(raw)?),
        "productUrl" => SearchInput::Url(validate_url(raw)?),
        "productName" => SearchInput::Name(validate_name(raw)?),
        _ => SearchInput::HsCode(validate_hs_code(raw)?),
    };

    let optional = match body.optional {
        Some(ref raw) => validate_optional(raw)?,
        None => OptionalParams::default(),
    };

    Ok(ValidatedSearch { input, optional })
}

fn validate_name(raw: &str) -> Result<String, ValidationError> {
    if raw.trim().chars().count() > MAX_PRODUCT_NAME_CHARS {
        return Err(ValidationError::NameTooLong {
            max: MAX_PRODUCT_NAME_CHARS,
        });
    }
    let name = sanitize_text(raw, MAX_PRODUCT_NAME_CHARS);
    if name.is_empty() {
        return Err(ValidationError::NoInput);
    }
    Ok(name)
}

fn validate_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_PRODUCT_URL_CHARS {
        return Err(ValidationError::InvalidUrl);
    }
    let parsed = url::Url::parse(trimmed).map_err(|_| ValidationError::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl);
    }
    Ok(trimmed.to_string())
}

fn validate_hs_code(raw: &str) -> Result<String, ValidationError> {
    let code: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if !HS_CODE_RE.is_match(&code) {
        return Err(ValidationError::InvalidHsCode);
    }
    Ok(code)
}

fn validate_image(raw: &str) -> Result<ImageInput, ValidationError> {
    let raw = raw.trim();
    let (declared_mime, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or(ValidationError::InvalidImage)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(ValidationError::InvalidImage)?
                .trim()
                .to_ascii_lowercase();
            if !mime.is_empty() && !mime.starts_with("image/") {
                return Err(ValidationError::InvalidImage);
            }
            (Some(mime).filter(|m| !m.is_empty()), data)
        }
        None => (None, raw),
    };

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if payload.is_empty() {
        return Err(ValidationError::InvalidImage);
    }
    if payload.len() * 3 / 4 > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge {
            max_bytes: MAX_IMAGE_BYTES,
        });
    }
    if !BASE64_RE.is_match(&payload) {
        return Err(ValidationError::InvalidImage);
    }

    let bytes = BASE64
        .decode(payload.as_bytes())
        .map_err(|_| ValidationError::InvalidImage)?;
    if bytes.is_empty() {
        return Err(ValidationError::InvalidImage);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge {
            max_bytes: MAX_IMAGE_BYTES,
        });
    }

    let mime_type = declared_mime
        .or_else(|| {
            infer::get(&bytes)
                .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
                .map(|kind| kind.mime_type().to_string())
        })
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

    Ok(ImageInput {
        base64: payload,
        mime_type,
        decoded_len: bytes.len(),
    })
}

fn validate_qty(value: &JsonValue) -> Result<Option<u32>, ValidationError> {
    let qty = match value {
        JsonValue::Null => return Ok(None),
        JsonValue::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(v), _) => Some(v),
            (None, Some(f)) if f.fract() == 0.0 && f > 0.0 && f <= u32::MAX as f64 => Some(f as u64),
            _ => None,
        },
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match qty {
        Some(v) if v > 0 && v <= u32::MAX as u64 => Ok(Some(v as u32)),
        _ => Err(ValidationError::InvalidQuantity),
    }
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| sanitize_text(v, MAX_OPTIONAL_TEXT_CHARS))
        .filter(|v| !v.is_empty())
}

fn validate_optional(raw: &RawOptionalParams) -> Result<OptionalParams, ValidationError> {
    let qty = match raw.qty {
        Some(ref v) => validate_qty(v)?,
        None => None,
    };

    let certs = raw
        .certs
        .iter()
        .flatten()
        .map(|c| sanitize_text(c, MAX_CERT_CHARS))
        .filter(|c| !c.is_empty())
        .take(MAX_CERTS)
        .collect();

    Ok(OptionalParams {
        qty,
        oem_odm: optional_text(&raw.oem_odm),
        material: optional_text(&raw.material),
        ship_to: optional_text(&raw.ship_to),
        certs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifrof_core::SearchType;

    // 1x1 transparent PNG.
    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn body() -> SearchRequestBody {
        SearchRequestBody::default()
    }

    #[test]
    fn test_no_input() {
        assert_eq!(validate(&body()), Err(ValidationError::NoInput));

        let blank = SearchRequestBody {
            product_name: Some("   ".to_string()),
            hs_code: Some("".to_string()),
            ..body()
        };
        assert_eq!(validate(&blank), Err(ValidationError::NoInput));
    }

    #[test]
    fn test_name_length_gate() {
        let ok = SearchRequestBody {
            product_name: Some("a".repeat(200)),
            ..body()
        };
        let search = validate(&ok).unwrap();
        assert_eq!(search.input, SearchInput::Name("a".repeat(200)));

        let too_long = SearchRequestBody {
            product_name: Some("a".repeat(201)),
            ..body()
        };
        assert_eq!(
            validate(&too_long),
            Err(ValidationError::NameTooLong { max: 200 })
        );
    }

    #[test]
    fn test_name_length_counts_characters() {
        let arabic = SearchRequestBody {
            product_name: Some("ق".repeat(200)),
            ..body()
        };
        assert!(validate(&arabic).is_ok());
    }

    #[test]
    fn test_name_length_ignores_surrounding_whitespace() {
        let padded = SearchRequestBody {
            product_name: Some(format!("  {}  ", "a".repeat(199))),
            ..body()
        };
        assert_eq!(
            validate(&padded).unwrap().input,
            SearchInput::Name("a".repeat(199))
        );
    }

    #[test]
    fn test_name_is_sanitized() {
        let req = SearchRequestBody {
            product_name: Some("  <b>Steel</b>\u{0007} bottle ".to_string()),
            ..body()
        };
        let search = validate(&req).unwrap();
        assert_eq!(search.input, SearchInput::Name("bSteel/b bottle".to_string()));

        let only_markup = SearchRequestBody {
            product_name: Some("<>".to_string()),
            ..body()
        };
        assert_eq!(validate(&only_markup), Err(ValidationError::NoInput));
    }

    #[test]
    fn test_hs_code() {
        let valid = SearchRequestBody {
            hs_code: Some("851712".to_string()),
            ..body()
        };
        assert_eq!(
            validate(&valid).unwrap().input,
            SearchInput::HsCode("851712".to_string())
        );

        let spaced = SearchRequestBody {
            hs_code: Some(" 8517 12.00 ".to_string()),
            ..body()
        };
        assert_eq!(
            validate(&spaced).unwrap().input,
            SearchInput::HsCode("851712.00".to_string())
        );

        for bad in ["85", "85a712", "12345678901", "8517.1"] {
            let req = SearchRequestBody {
                hs_code: Some(bad.to_string()),
                ..body()
            };
            assert_eq!(validate(&req), Err(ValidationError::InvalidHsCode), "{}", bad);
        }
    }

    #[test]
    fn test_url() {
        let ok = SearchRequestBody {
            product_url: Some(" https://shop.example/item/1 ".to_string()),
            ..body()
        };
        assert_eq!(
            validate(&ok).unwrap().input,
            SearchInput::Url("https://shop.example/item/1".to_string())
        );

        for bad in ["ftp://shop.example/x", "not a url", "javascript:alert(1)"] {
            let req = SearchRequestBody {
                product_url: Some(bad.to_string()),
                ..body()
            };
            assert_eq!(validate(&req), Err(ValidationError::InvalidUrl), "{}", bad);
        }

        let long = SearchRequestBody {
            product_url: Some(format!("https://shop.example/{}", "x".repeat(500))),
            ..body()
        };
        assert_eq!(validate(&long), Err(ValidationError::InvalidUrl));
    }

    #[test]
    fn test_image_with_data_url_prefix() {
        let req = SearchRequestBody {
            image_base64: Some(format!("data:image/png;base64,{}", PNG_1X1)),
            ..body()
        };
        let search = validate(&req).unwrap();
        match search.input {
            SearchInput::Image(img) => {
                assert_eq!(img.mime_type, "image/png");
                assert_eq!(img.base64, PNG_1X1);
                assert!(img.decoded_len > 0);
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_image_mime_sniffed_or_defaulted() {
        let req = SearchRequestBody {
            image_base64: Some(PNG_1X1.to_string()),
            ..body()
        };
        match validate(&req).unwrap().input {
            SearchInput::Image(img) => assert_eq!(img.mime_type, "image/png"),
            other => panic!("expected image, got {:?}", other),
        }

        let unknown = SearchRequestBody {
            image_base64: Some("aGVsbG8gd29ybGQ=".to_string()),
            ..body()
        };
        match validate(&unknown).unwrap().input {
            SearchInput::Image(img) => assert_eq!(img.mime_type, "image/jpeg"),
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_image_rejections() {
        let bad_alphabet = SearchRequestBody {
            image_base64: Some("not*base64!".to_string()),
            ..body()
        };
        assert_eq!(validate(&bad_alphabet), Err(ValidationError::InvalidImage));

        let wrong_mime = SearchRequestBody {
            image_base64: Some(format!("data:text/plain;base64,{}", PNG_1X1)),
            ..body()
        };
        assert_eq!(validate(&wrong_mime), Err(ValidationError::InvalidImage));

        let oversized = SearchRequestBody {
            image_base64: Some("A".repeat(MAX_IMAGE_BYTES / 3 * 4 + 8)),
            ..body()
        };
        assert_eq!(
            validate(&oversized),
            Err(ValidationError::ImageTooLarge {
                max_bytes: MAX_IMAGE_BYTES
            })
        );
    }

    #[test]
    fn test_priority_image_over_name() {
        let req = SearchRequestBody {
            image_base64: Some(PNG_1X1.to_string()),
            product_name: Some("bottle".to_string()),
            hs_code: Some("851712".to_string()),
            ..body()
        };
        assert_eq!(validate(&req).unwrap().input.search_type(), SearchType::Image);

        let url_and_name = SearchRequestBody {
            product_url: Some("https://shop.example/x".to_string()),
            product_name: Some("bottle".to_string()),
            ..body()
        };
        assert_eq!(
            validate(&url_and_name).unwrap().input.search_type(),
            SearchType::Url
        );
    }

    #[test]
    fn test_invalid_higher_priority_input_is_not_skipped() {
        let req = SearchRequestBody {
            product_url: Some("ftp://nope".to_string()),
            product_name: Some("bottle".to_string()),
            ..body()
        };
        assert_eq!(validate(&req), Err(ValidationError::InvalidUrl));
    }

    #[test]
    fn test_optional_params() {
        let req: SearchRequestBody = serde_json::from_value(serde_json::json!({
            "productName": "bottle",
            "optional": {
                "qty": "500",
                "oemOdm": " OEM ",
                "material": "<script>",
                "shipTo": "",
                "certs": ["ISO 9001", " ", "x".repeat(150)]
            }
        }))
        .unwrap();

        let optional = validate(&req).unwrap().optional;
        assert_eq!(optional.qty, Some(500));
        assert_eq!(optional.oem_odm.as_deref(), Some("OEM"));
        assert_eq!(optional.material.as_deref(), Some("script"));
        assert_eq!(optional.ship_to, None);
        assert_eq!(optional.certs.len(), 2);
        assert_eq!(optional.certs[1].chars().count(), MAX_CERT_CHARS);
    }

    #[test]
    fn test_certs_capped() {
        let certs: Vec<String> = (0..30).map(|i| format!("CERT-{}", i)).collect();
        let req: SearchRequestBody = serde_json::from_value(serde_json::json!({
            "productName": "bottle",
            "optional": {"certs": certs}
        }))
        .unwrap();
        assert_eq!(validate(&req).unwrap().optional.certs.len(), MAX_CERTS);
    }

    #[test]
    fn test_qty_must_be_positive_integer() {
        for bad in [
            serde_json::json!(0),
            serde_json::json!(-3),
            serde_json::json!(2.5),
            serde_json::json!("many"),
            serde_json::json!(true),
        ] {
            let req: SearchRequestBody = serde_json::from_value(serde_json::json!({
                "productName": "bottle",
                "optional": {"qty": bad}
            }))
            .unwrap();
            assert_eq!(validate(&req), Err(ValidationError::InvalidQuantity));
        }

        let float_whole: SearchRequestBody = serde_json::from_value(serde_json::json!({
            "productName": "bottle",
            "optional": {"qty": 100.0, "certs": null}
        }))
        .unwrap();
        assert_eq!(validate(&float_whole).unwrap().optional.qty, Some(100));
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            ValidationError::NoInput.code(),
            ValidationError::NameTooLong { max: 1 }.code(),
            ValidationError::InvalidUrl.code(),
            ValidationError::InvalidHsCode.code(),
            ValidationError::ImageTooLarge { max_bytes: 1 }.code(),
            ValidationError::InvalidImage.code(),
            ValidationError::InvalidQuantity.code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
