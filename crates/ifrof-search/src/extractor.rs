//! Factory candidate extraction from web research.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{info, trace, warn};

use ifrof_core::defaults::MAX_CANDIDATES;
use ifrof_core::{
    FactoryCandidate, GenerationBackend, NormalizedProduct, Result, WebSearchResult,
};
use ifrof_inference::parse_lenient_list;

use crate::prompts::{extraction_prompt, EXTRACT_SYSTEM_PROMPT};

/// Key under which the model returns its list.
const FACTORIES_KEY: &str = "factories";

/// Asks the LLM to pull candidate manufacturers out of search results.
#[derive(Clone)]
pub struct CandidateExtractor {
    llm: Arc<dyn GenerationBackend>,
}

impl CandidateExtractor {
    pub fn new(llm: Arc<dyn GenerationBackend>) -> Self {
        Self { llm }
    }

    /// Extract at most `MAX_CANDIDATES` named candidates. Never fails.
    pub async fn extract(
        &self,
        product: &NormalizedProduct,
        results: &[WebSearchResult],
    ) -> Vec<FactoryCandidate> {
        if results.is_empty() {
            info!(
                subsystem = "search",
                component = "extractor",
                "No search results, skipping extraction"
            );
            return Vec::new();
        }

        let start = Instant::now();
        match self.try_extract(product, results).await {
            Ok(candidates) => {
                info!(
                    subsystem = "search",
                    component = "extractor",
                    op = "extract",
                    result_count = candidates.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Candidates extracted"
                );
                candidates
            }
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "extractor",
                    op = "extract",
                    error = %e,
                    "Extraction failed, continuing with no candidates"
                );
                Vec::new()
            }
        }
    }

    async fn try_extract(
        &self,
        product: &NormalizedProduct,
        results: &[WebSearchResult],
    ) -> Result<Vec<FactoryCandidate>> {
        let prompt = extraction_prompt(product, results);
        let raw = self
            .llm
            .generate_with_system(EXTRACT_SYSTEM_PROMPT, &prompt)
            .await?;

        let entries: Vec<JsonValue> = parse_lenient_list(&raw, FACTORIES_KEY)?;
        Ok(clean_candidates(entries))
    }
}

fn tidy_signals(signals: &mut Vec<String>) {
    for signal in signals.iter_mut() {
        *signal = signal.trim().to_string();
    }
    signals.retain(|s| !s.is_empty());
}

/// Decode entries one by one, drop unnamed ones, tidy signals, and cap the list.
fn clean_candidates(entries: Vec<JsonValue>) -> Vec<FactoryCandidate> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<FactoryCandidate>(entry) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                trace!(
                    subsystem = "search",
                    component = "extractor",
                    error = %e,
                    "Skipping malformed candidate"
                );
                None
            }
        })
        .filter_map(|mut candidate| {
            candidate.name = candidate.name.trim().to_string();
            tidy_signals(&mut candidate.manufacturing_signals);
            tidy_signals(&mut candidate.trading_signals);
            (!candidate.name.is_empty()).then_some(candidate)
        })
        .take(MAX_CANDIDATES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn results() -> Vec<WebSearchResult> {
        vec![WebSearchResult {
            query: "bottle manufacturer factory".into(),
            content: "Yongkang Steelware operates 3 production lines.".into(),
            citations: vec!["https://steelware.example".into()],
        }]
    }

    #[tokio::test]
    async fn test_empty_results_skip_llm() {
        let llm = Arc::new(ScriptedLlm::new());
        let candidates = CandidateExtractor::new(llm.clone())
            .extract(&NormalizedProduct::default(), &[])
            .await;
        assert!(candidates.is_empty());
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrapped_list() {
        let llm = Arc::new(ScriptedLlm::new().then_ok(
            r#"{"factories":[
                {"name":" Yongkang Steelware ","location":"Yongkang","website":"https://steelware.example",
                 "links":["https://steelware.example"],"manufacturing_signals":["3 production lines"],
                 "trading_signals":null},
                {"name":"","website":"https://blank.example"}
            ]}"#,
        ));
        let candidates = CandidateExtractor::new(llm.clone())
            .extract(&NormalizedProduct::default(), &results())
            .await;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Yongkang Steelware");
        assert_eq!(candidates[0].manufacturing_signals, vec!["3 production lines"]);
        assert!(candidates[0].trading_signals.is_empty());
        assert!(llm.calls()[0].prompt.contains("3 production lines"));
    }

    #[tokio::test]
    async fn test_bare_array_and_cap() {
        let entries: Vec<JsonValue> = (0..20)
            .map(|i| serde_json::json!({"name": format!("Factory {}", i)}))
            .collect();
        let llm = Arc::new(
            ScriptedLlm::new().then_ok(serde_json::to_string(&entries).unwrap()),
        );
        let candidates = CandidateExtractor::new(llm)
            .extract(&NormalizedProduct::default(), &results())
            .await;

        assert_eq!(candidates.len(), MAX_CANDIDATES);
        assert_eq!(candidates[0].name, "Factory 0");
        assert_eq!(candidates[14].name, "Factory 14");
    }

    #[tokio::test]
    async fn test_blank_signals_dropped_before_scoring() {
        let llm = Arc::new(ScriptedLlm::new().then_ok(
            r#"[{"name":"Edge Co","manufacturing_signals":[""," own plant "],"trading_signals":["  "]}]"#,
        ));
        let candidates = CandidateExtractor::new(llm)
            .extract(&NormalizedProduct::default(), &results())
            .await;
        assert_eq!(candidates[0].manufacturing_signals, vec!["own plant"]);
        assert!(candidates[0].trading_signals.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entry_skipped() {
        let llm = Arc::new(ScriptedLlm::new().then_ok(
            r#"[{"name": 42}, {"name": "Good Factory", "links": ["https://g.example"]}]"#,
        ));
        let candidates = CandidateExtractor::new(llm)
            .extract(&NormalizedProduct::default(), &results())
            .await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Good Factory");
    }

    #[tokio::test]
    async fn test_llm_failure_yields_empty() {
        let llm = Arc::new(ScriptedLlm::new().then_err("timeout"));
        let candidates = CandidateExtractor::new(llm)
            .extract(&NormalizedProduct::default(), &results())
            .await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_output_yields_empty() {
        let llm = Arc::new(ScriptedLlm::new().then_ok("No factories found."));
        let candidates = CandidateExtractor::new(llm)
            .extract(&NormalizedProduct::default(), &results())
            .await;
        assert!(candidates.is_empty());
    }
}
