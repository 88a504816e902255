//! Search query construction and web discovery.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use ifrof_core::defaults::{MAX_SEARCH_QUERIES, MIN_QUERY_CHARS, QUERY_KEYWORDS};
use ifrof_core::{NormalizedProduct, WebSearchResult, WebSearcher};

fn join_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .take(QUERY_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build up to four manufacturer-focused queries, English and Chinese.
///
/// A template whose product part is empty is skipped. Queries shorter than
/// `MIN_QUERY_CHARS` are dropped and duplicates removed in order.
pub fn build_search_queries(product: &NormalizedProduct) -> Vec<String> {
    let templates = [
        (join_keywords(&product.keywords_en), "manufacturer factory"),
        (
            product.product_title_en.trim().to_string(),
            "OEM factory supplier China",
        ),
        (join_keywords(&product.keywords_zh), "工厂 生产厂家"),
        (product.product_title_zh.trim().to_string(), "源头工厂"),
    ];

    let mut seen = HashSet::new();
    templates
        .into_iter()
        .filter(|(part, _)| !part.is_empty())
        .map(|(part, suffix)| format!("{} {}", part, suffix).trim().to_string())
        .filter(|q| q.chars().count() >= MIN_QUERY_CHARS)
        .filter(|q| seen.insert(q.clone()))
        .take(MAX_SEARCH_QUERIES)
        .collect()
}

/// Outcome of running all queries.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub results: Vec<WebSearchResult>,
    pub failed_queries: Vec<String>,
}

/// Runs queries against the web searcher, tolerating per-query failures.
#[derive(Clone)]
pub struct WebDiscovery {
    searcher: Arc<dyn WebSearcher>,
}

impl WebDiscovery {
    pub fn new(searcher: Arc<dyn WebSearcher>) -> Self {
        Self { searcher }
    }

    /// Issue each query in order. Never fails; failing queries are recorded.
    pub async fn discover(&self, queries: &[String]) -> DiscoveryReport {
        let start = Instant::now();
        let mut report = DiscoveryReport::default();

        for query in queries {
            match self.searcher.search(query).await {
                Ok(result) => {
                    debug!(
                        subsystem = "search",
                        component = "discovery",
                        query = %query,
                        citations = result.citations.len(),
                        "Query answered"
                    );
                    report.results.push(result);
                }
                Err(e) => {
                    warn!(
                        subsystem = "search",
                        component = "discovery",
                        query = %query,
                        error = %e,
                        "Search query failed, skipping"
                    );
                    report.failed_queries.push(query.clone());
                }
            }
        }

        info!(
            subsystem = "search",
            component = "discovery",
            op = "discover",
            result_count = report.results.len(),
            failed = report.failed_queries.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Discovery complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSearcher;

    fn product() -> NormalizedProduct {
        NormalizedProduct {
            product_title_en: "Stainless steel water bottle".into(),
            product_title_zh: "不锈钢水瓶".into(),
            keywords_en: vec![
                "vacuum flask".into(),
                "insulated bottle".into(),
                "steel tumbler".into(),
                "ignored fourth".into(),
            ],
            keywords_zh: vec!["保温杯".into(), "水壶".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_four_queries_in_order() {
        let queries = build_search_queries(&product());
        assert_eq!(
            queries,
            vec![
                "vacuum flask insulated bottle steel tumbler manufacturer factory",
                "Stainless steel water bottle OEM factory supplier China",
                "保温杯 水壶 工厂 生产厂家",
                "不锈钢水瓶 源头工厂",
            ]
        );
    }

    #[test]
    fn test_short_and_empty_parts_dropped() {
        let product = NormalizedProduct {
            product_title_en: "Cup".into(),
            product_title_zh: "杯".into(),
            keywords_en: vec![],
            keywords_zh: vec![],
            ..Default::default()
        };
        // "杯 源头工厂" is 6 characters.
        assert_eq!(
            build_search_queries(&product),
            vec!["Cup OEM factory supplier China"]
        );
    }

    #[test]
    fn test_duplicates_removed() {
        let product = NormalizedProduct {
            product_title_en: "bottle".into(),
            keywords_en: vec!["bottle".into()],
            ..Default::default()
        };
        let queries = build_search_queries(&product);
        let unique: HashSet<_> = queries.iter().collect();
        assert_eq!(unique.len(), queries.len());
        assert!(queries.len() <= MAX_SEARCH_QUERIES);
    }

    #[test]
    fn test_degraded_product_still_queries() {
        let queries = build_search_queries(&NormalizedProduct::degraded("steel bottle"));
        assert_eq!(
            queries,
            vec![
                "steel bottle manufacturer factory",
                "steel bottle OEM factory supplier China",
            ]
        );
    }

    #[tokio::test]
    async fn test_all_queries_failing_is_not_an_error() {
        let searcher = Arc::new(FakeSearcher::failing());
        let discovery = WebDiscovery::new(searcher.clone());
        let queries = build_search_queries(&product());

        let report = discovery.discover(&queries).await;
        assert!(report.results.is_empty());
        assert_eq!(report.failed_queries, queries);
        assert_eq!(searcher.queries(), queries);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successes() {
        let searcher = Arc::new(
            FakeSearcher::answering("Ningbo Steel Co. owns a factory.", &["https://a.example"])
                .failing_on("保温杯 水壶 工厂 生产厂家"),
        );
        let report = WebDiscovery::new(searcher)
            .discover(&build_search_queries(&product()))
            .await;
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.failed_queries, vec!["保温杯 水壶 工厂 生产厂家"]);
    }
}
