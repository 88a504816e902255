//! Product normalization through the LLM gateway.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use ifrof_core::{
    Error, GenerationBackend, NormalizedProduct, Result, SearchInput, ValidatedSearch,
};
use ifrof_inference::parse_lenient;

use crate::prompts::{normalize_prompt, NORMALIZE_SYSTEM_PROMPT};

/// Derives a [`NormalizedProduct`] from a validated search. Never fails.
#[derive(Clone)]
pub struct ProductNormalizer {
    llm: Arc<dyn GenerationBackend>,
}

impl ProductNormalizer {
    pub fn new(llm: Arc<dyn GenerationBackend>) -> Self {
        Self { llm }
    }

    /// Normalize the product, degrading to the raw input on any failure.
    pub async fn normalize(
        &self,
        search: &ValidatedSearch,
        scraped_text: Option<&str>,
    ) -> NormalizedProduct {
        let start = Instant::now();
        match self.try_normalize(search, scraped_text).await {
            Ok(product) => {
                debug!(
                    subsystem = "search",
                    component = "normalizer",
                    op = "normalize",
                    title_en = %product.product_title_en,
                    keywords = product.keywords_en.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Product normalized"
                );
                product
            }
            Err(e) => {
                let fallback = search.input.fallback_title();
                warn!(
                    subsystem = "search",
                    component = "normalizer",
                    op = "normalize",
                    search_type = %search.input.search_type(),
                    error = %e,
                    "Normalization failed, using raw input"
                );
                NormalizedProduct::degraded(&fallback)
            }
        }
    }

    async fn try_normalize(
        &self,
        search: &ValidatedSearch,
        scraped_text: Option<&str>,
    ) -> Result<NormalizedProduct> {
        let prompt = normalize_prompt(search, scraped_text);
        let raw = match &search.input {
            SearchInput::Image(image) => {
                self.llm
                    .generate_with_image(NORMALIZE_SYSTEM_PROMPT, &prompt, image)
                    .await?
            }
            _ => {
                self.llm
                    .generate_with_system(NORMALIZE_SYSTEM_PROMPT, &prompt)
                    .await?
            }
        };

        let mut product: NormalizedProduct = parse_lenient(&raw)?;
        tidy(&mut product);
        if !is_searchable(&product) {
            return Err(Error::Inference(
                "normalized product has no title or keywords".to_string(),
            ));
        }
        Ok(product)
    }
}

/// A product is usable only if it yields at least one search query part.
fn is_searchable(product: &NormalizedProduct) -> bool {
    !product.product_title_en.is_empty()
        || !product.product_title_zh.is_empty()
        || !product.keywords_en.is_empty()
        || !product.keywords_zh.is_empty()
}

fn tidy_list(list: &mut Vec<String>) {
    for item in list.iter_mut() {
        *item = item.trim().to_string();
    }
    list.retain(|item| !item.is_empty());
}

/// Trim model output and backfill English keywords from the title.
fn tidy(product: &mut NormalizedProduct) {
    product.product_title_ar = product.product_title_ar.trim().to_string();
    product.product_title_en = product.product_title_en.trim().to_string();
    product.product_title_zh = product.product_title_zh.trim().to_string();
    product.category = product.category.trim().to_string();
    tidy_list(&mut product.keywords_en);
    tidy_list(&mut product.keywords_zh);
    tidy_list(&mut product.materials);
    tidy_list(&mut product.possible_hs_codes);

    if product.keywords_en.is_empty() && !product.product_title_en.is_empty() {
        product.keywords_en = vec![product.product_title_en.clone()];
    }
}
