//! Prompt templates for the LLM-backed pipeline stages.

use ifrof_core::defaults::{MAX_RESULT_CHARS, MAX_SCRAPED_CHARS};
use ifrof_core::{NormalizedProduct, SearchInput, ValidatedSearch, WebSearchResult};

pub const NORMALIZE_SYSTEM_PROMPT: &str = r#"You are a product classification expert for a B2B sourcing marketplace connecting Arab buyers with Chinese factories.
Identify the product described by the user and respond with ONLY a JSON object of this shape:
{
  "productTitle_ar": "product name in Arabic",
  "productTitle_en": "product name in English",
  "productTitle_zh": "product name in Simplified Chinese",
  "keywords_en": ["3 to 6 English search keywords"],
  "keywords_zh": ["3 to 6 Chinese search keywords"],
  "materials": ["main materials"],
  "possible_hs_codes": ["likely HS codes"],
  "category": "product category",
  "must_have_specs": {"spec name": "value"}
}
Use manufacturer terminology, not retail marketing language."#;

pub const EXTRACT_SYSTEM_PROMPT: &str = r#"You extract manufacturers from web research for a B2B sourcing marketplace.
From the research below, list companies that appear to MANUFACTURE the product. Exclude companies that are obviously trading companies, agents, or resellers.
Respond with ONLY a JSON object of this shape:
{"factories": [{
  "name": "company name in English",
  "name_zh": "company name in Chinese or null",
  "location": "city, province or null",
  "website": "official website or null",
  "links": ["listing and source URLs"],
  "manufacturing_signals": ["concrete evidence of own production"],
  "trading_signals": ["evidence the company is a trader or reseller"]
}]}
Only use facts present in the research. Do not invent companies, websites, or signals."#;

/// Truncate to at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn requirements_block(search: &ValidatedSearch) -> String {
    let lines = search.optional.describe();
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n\nBuyer requirements:\n- {}", lines.join("\n- "))
    }
}

/// User prompt for normalization.
///
/// `scraped_text` is only used for URL input; blank text falls back to the
/// bare URL.
pub fn normalize_prompt(search: &ValidatedSearch, scraped_text: Option<&str>) -> String {
    let body = match &search.input {
        SearchInput::Image(_) => {
            "Identify the product shown in the attached image.".to_string()
        }
        SearchInput::Url(url) => match scraped_text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => format!(
                "Identify the product sold on this page.\nURL: {}\n\nPage content:\n{}",
                url,
                truncate_chars(text, MAX_SCRAPED_CHARS)
            ),
            None => format!("Identify the product sold at this URL: {}", url),
        },
        SearchInput::Name(name) => format!("Product name: {}", name),
        SearchInput::HsCode(code) => format!(
            "HS code: {}\nIdentify the typical product traded under this HS code.",
            code
        ),
    };
    format!("{}{}", body, requirements_block(search))
}

/// User prompt for candidate extraction.
pub fn extraction_prompt(product: &NormalizedProduct, results: &[WebSearchResult]) -> String {
    let mut prompt = format!(
        "Product: {} / {}\nKeywords: {}\n\nResearch:\n",
        product.product_title_en,
        product.product_title_zh,
        product
            .keywords_en
            .iter()
            .chain(product.keywords_zh.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );

    for (i, result) in results.iter().enumerate() {
        prompt.push_str(&format!(
            "\n### Result {} (query: {})\n{}\n",
            i + 1,
            result.query,
            truncate_chars(&result.content, MAX_RESULT_CHARS)
        ));
        if !result.citations.is_empty() {
            prompt.push_str("Sources:\n");
            for citation in &result.citations {
                prompt.push_str(&format!("- {}\n", citation));
            }
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifrof_core::OptionalParams;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("工厂生产", 2), "工厂");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_url_prompt_uses_scraped_text() {
        let search = ValidatedSearch {
            input: SearchInput::Url("https://shop.example/x".into()),
            optional: OptionalParams::default(),
        };
        let long = "y".repeat(MAX_SCRAPED_CHARS + 500);
        let prompt = normalize_prompt(&search, Some(&long));
        assert!(prompt.contains("Page content"));
        assert!(prompt.contains(&"y".repeat(MAX_SCRAPED_CHARS)));
        assert!(!prompt.contains(&"y".repeat(MAX_SCRAPED_CHARS + 1)));

        let bare = normalize_prompt(&search, Some("  "));
        assert!(bare.contains("https://shop.example/x"));
        assert!(!bare.contains("Page content"));
    }

    #[test]
    fn test_requirements_appended() {
        let search = ValidatedSearch {
            input: SearchInput::Name("steel bottle".into()),
            optional: OptionalParams {
                qty: Some(1000),
                certs: vec!["FDA".into()],
                ..Default::default()
            },
        };
        let prompt = normalize_prompt(&search, None);
        assert!(prompt.starts_with("Product name: steel bottle"));
        assert!(prompt.contains("Quantity: 1000"));
        assert!(prompt.contains("Certifications: FDA"));
    }

    #[test]
    fn test_extraction_prompt_truncates_each_result() {
        let product = NormalizedProduct {
            product_title_en: "Steel bottle".into(),
            keywords_en: vec!["vacuum flask".into()],
            ..Default::default()
        };
        let results = vec![WebSearchResult {
            query: "q1".into(),
            content: "z".repeat(MAX_RESULT_CHARS + 10),
            citations: vec!["https://a.example".into()],
        }];
        let prompt = extraction_prompt(&product, &results);
        assert!(prompt.contains("vacuum flask"));
        assert!(prompt.contains("- https://a.example"));
        assert!(!prompt.contains(&"z".repeat(MAX_RESULT_CHARS + 1)));
    }
}
