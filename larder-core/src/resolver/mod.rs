//! Request resolution: input checks, one model call, sanitize, validate.
//!
//! Each operation either returns a validated domain value or a
//! [`ResolveError`] naming the stage that failed. Nothing is retried here.

mod conversion;

use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::archive::RecipeArchive;
use crate::config::{LarderConfig, StoreLocation};
use crate::conversion::{ConversionCache, ConversionStore, DiskStore, MemoryStore};
use crate::error::{ResolveError, Stage, UpstreamError};
use crate::llm::{create_provider, LlmProvider};
use crate::prompts::classify::CLASSIFY_PROMPT_NAME;
use crate::prompts::extract::EXTRACT_PROMPT_NAME;
use crate::prompts::scale::SCALE_PROMPT_NAME;
use crate::prompts::{render_classify_prompt, render_extract_prompt, render_scale_prompt};
use crate::sanitize::{sanitize, Candidate};
use crate::types::{
    ClassificationResult, ClassifyRequest, ExtractRequest, IngredientLine, ScaleRequest,
    ScaledRecipe,
};
use crate::validate::{validate_classification, validate_extraction, validate_scaling};
use crate::vision::{create_detector, LabelDetector};

const LOG_SNIPPET_CHARS: usize = 200;

pub const NO_OBJECTS_MESSAGE: &str = "No recognizable objects found in image.";

/// Resolves requests against the generative model, label detector and
/// conversion cache.
#[derive(Debug)]
pub struct Resolver {
    provider: Arc<dyn LlmProvider>,
    labels: Option<Arc<dyn LabelDetector>>,
    cache: ConversionCache,
    archive: Option<RecipeArchive>,
}

impl Resolver {
    pub fn new(provider: Arc<dyn LlmProvider>, cache: ConversionCache) -> Self {
        Self {
            provider,
            labels: None,
            cache,
            archive: None,
        }
    }

    pub fn with_label_detector(mut self, detector: Arc<dyn LabelDetector>) -> Self {
        self.labels = Some(detector);
        self
    }

    pub fn with_archive(mut self, archive: RecipeArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Build every collaborator from configuration.
    pub fn from_config(config: &LarderConfig) -> Result<Self, UpstreamError> {
        let provider = create_provider(&config.model)?;

        let store: Arc<dyn ConversionStore> = match &config.conversion_store {
            StoreLocation::Memory => Arc::new(MemoryStore::new()),
            StoreLocation::Disk(dir) => Arc::new(DiskStore::new(dir.clone())),
        };
        let cache = ConversionCache::new(store, config.store_timeout);

        let mut resolver = Self::new(provider, cache);
        if let Some(detector) = create_detector(&config.vision)? {
            resolver = resolver.with_label_detector(detector);
        }
        if let Some(dir) = &config.recipe_archive_dir {
            resolver = resolver.with_archive(
                RecipeArchive::new(dir.clone()).with_timeout(config.store_timeout),
            );
        }

        tracing::info!(
            provider = resolver.provider.provider_name(),
            model = resolver.provider.model_name(),
            conversion_store = resolver.cache.backend_name(),
            labels = resolver.labels.is_some(),
            archive = resolver.archive.is_some(),
            "Resolver ready"
        );
        Ok(resolver)
    }

    pub fn cache(&self) -> &ConversionCache {
        &self.cache
    }

    pub fn archive(&self) -> Option<&RecipeArchive> {
        self.archive.as_ref()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn labels_enabled(&self) -> bool {
        self.labels.is_some()
    }

    /// One model call followed by sanitizing. Validation is left to the caller
    /// since it depends on the task.
    async fn ask(&self, task: &'static str, prompt: &str) -> Result<Candidate, ResolveError> {
        let start = Instant::now();
        let raw = self
            .provider
            .complete(prompt)
            .instrument(tracing::info_span!(
                "llm.call",
                task,
                provider = self.provider.provider_name()
            ))
            .await
            .map_err(|e| {
                tracing::warn!(task, error = %e, "Model call failed");
                ResolveError::model(e)
            })?;
        tracing::debug!(
            task,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model call completed"
        );

        sanitize(&raw).map_err(|e| {
            tracing::warn!(task, raw = %raw.snippet(LOG_SNIPPET_CHARS), "Empty model response");
            ResolveError::output(Stage::Sanitize, e)
        })
    }

    /// Log and wrap a validation failure.
    fn rejected(
        task: &'static str,
        candidate: &Candidate,
        err: crate::validate::ValidationError,
    ) -> ResolveError {
        tracing::warn!(
            task,
            error = %err,
            candidate = %crate::llm::truncate_chars(candidate.as_str(), LOG_SNIPPET_CHARS),
            "Model output failed validation"
        );
        ResolveError::output(Stage::Validate, err)
    }

    /// Structured ingredient list from free recipe text, in source order.
    pub async fn extract_ingredients(
        &self,
        request: &ExtractRequest,
    ) -> Result<Vec<IngredientLine>, ResolveError> {
        if request.text.trim().is_empty() {
            return Err(ResolveError::InvalidInput(
                "Recipe text must not be empty".to_string(),
            ));
        }

        let prompt = render_extract_prompt(&request.text);
        let candidate = self.ask(EXTRACT_PROMPT_NAME, &prompt).await?;
        let lines = validate_extraction(&candidate)
            .map_err(|e| Self::rejected(EXTRACT_PROMPT_NAME, &candidate, e))?;

        tracing::info!(count = lines.len(), "Extracted ingredients");
        Ok(lines)
    }

    /// The recipe rewritten for `new_servings`.
    pub async fn scale_recipe(&self, request: &ScaleRequest) -> Result<ScaledRecipe, ResolveError> {
        if request.new_servings == 0 {
            return Err(ResolveError::InvalidInput(
                "new_servings must be a positive integer".to_string(),
            ));
        }
        if !request.recipe.is_object() {
            return Err(ResolveError::InvalidInput(
                "recipe must be a JSON object".to_string(),
            ));
        }

        let prompt = render_scale_prompt(&request.recipe, request.new_servings);
        let candidate = self.ask(SCALE_PROMPT_NAME, &prompt).await?;
        let scaled = validate_scaling(&candidate)
            .map_err(|e| Self::rejected(SCALE_PROMPT_NAME, &candidate, e))?;

        tracing::info!(
            servings = request.new_servings,
            ingredients = scaled.ingredients.len(),
            steps = scaled.instructions.len(),
            "Scaled recipe"
        );
        Ok(scaled)
    }

    /// Classify the image at `image_url` as an ingredient, a baked product
    /// (with an inferred recipe) or unknown.
    pub async fn classify_image(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassificationResult, ResolveError> {
        let image_url = parse_image_url(&request.image_url)?;

        let detector = self.labels.as_ref().ok_or_else(|| ResolveError::Upstream {
            stage: Stage::Labels,
            source: UpstreamError::NotConfigured("label detection is not configured".to_string()),
        })?;

        let labels = detector
            .detect_labels(&image_url)
            .await
            .map_err(|source| {
                tracing::warn!(error = %source, "Label detection failed");
                ResolveError::Upstream {
                    stage: Stage::Labels,
                    source,
                }
            })?;
        if labels.is_empty() {
            tracing::info!(image_url = %image_url, "No labels detected");
            return Err(ResolveError::NotFound(NO_OBJECTS_MESSAGE.to_string()));
        }
        tracing::debug!(labels = ?labels, "Detected labels");

        let prompt = render_classify_prompt(&image_url, &labels);
        let candidate = self.ask(CLASSIFY_PROMPT_NAME, &prompt).await?;
        let result = validate_classification(&candidate)
            .map_err(|e| Self::rejected(CLASSIFY_PROMPT_NAME, &candidate, e))?;

        tracing::info!(kind = result.kind(), "Classified image");

        if let (ClassificationResult::BakedProduct { recipe }, Some(owner), Some(archive)) =
            (&result, request.owner.as_deref(), &self.archive)
        {
            match archive.save(owner, &image_url, recipe).await {
                Ok(entry) => tracing::info!(owner, id = %entry.id, "Archived baked-product recipe"),
                Err(e) => tracing::warn!(owner, error = %e, "Failed to archive recipe"),
            }
        }

        Ok(result)
    }
}

/// Require an absolute http(s) URL.
fn parse_image_url(raw: &str) -> Result<String, ResolveError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ResolveError::InvalidInput(
            "image_url must not be empty".to_string(),
        ));
    }
    let url = url::Url::parse(raw)
        .map_err(|e| ResolveError::InvalidInput(format!("Invalid image_url: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(ResolveError::InvalidInput(format!(
            "Unsupported image_url scheme: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::llm::FakeProvider;
    use crate::vision::FakeLabelDetector;
    use serde_json::json;
    use std::time::Duration;

    fn resolver(provider: FakeProvider) -> Resolver {
        Resolver::new(
            Arc::new(provider),
            ConversionCache::in_memory(Duration::from_secs(1)),
        )
    }

    #[tokio::test]
    async fn test_extract_rejects_empty_text() {
        let provider = Arc::new(FakeProvider::default());
        let resolver = Resolver::new(
            provider.clone(),
            ConversionCache::in_memory(Duration::from_secs(1)),
        );
        let err = resolver
            .extract_ingredients(&ExtractRequest {
                text: "   ".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_unknown_measure() {
        let resolver = resolver(FakeProvider::with_response(
            "a pinch of salt",
            r#"[{"ingredient": "salt", "measure": ""}]"#,
        ));
        let lines = resolver
            .extract_ingredients(&ExtractRequest {
                text: "a pinch of salt".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_unknown());
    }

    #[tokio::test]
    async fn test_extract_malformed_output() {
        let resolver = resolver(FakeProvider::with_response("flour", "I think you need flour."));
        let err = resolver
            .extract_ingredients(&ExtractRequest {
                text: "2 cups flour".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProcessingFailed);
        assert_eq!(err.stage(), Stage::Validate);
    }

    #[tokio::test]
    async fn test_upstream_failure_maps_to_unavailable() {
        let resolver = resolver(FakeProvider::new());
        let err = resolver
            .extract_ingredients(&ExtractRequest {
                text: "2 cups flour".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
        assert_eq!(err.stage(), Stage::Model);
    }

    #[tokio::test]
    async fn test_scale_input_checks() {
        let provider = Arc::new(FakeProvider::default());
        let resolver = Resolver::new(
            provider.clone(),
            ConversionCache::in_memory(Duration::from_secs(1)),
        );

        let err = resolver
            .scale_recipe(&ScaleRequest {
                recipe: json!({"ingredients": []}),
                new_servings: 0,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let err = resolver
            .scale_recipe(&ScaleRequest {
                recipe: json!("pancakes"),
                new_servings: 4,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scale_recipe() {
        let resolver = resolver(FakeProvider::with_response(
            "8 servings",
            r#"{"ingredients": [{"name": "flour", "quantity": "4 cups"}], "instructions": ["Mix", "Bake"]}"#,
        ));
        let scaled = resolver
            .scale_recipe(&ScaleRequest {
                recipe: json!({"servings": 4, "ingredients": [{"name": "flour", "quantity": "2 cups"}]}),
                new_servings: 8,
            })
            .await
            .unwrap();
        assert_eq!(scaled.ingredients[0].quantity, "4 cups");
        assert_eq!(scaled.instructions, vec!["Mix", "Bake"]);
    }

    #[tokio::test]
    async fn test_classify_requires_detector() {
        let resolver = resolver(FakeProvider::default());
        let err = resolver
            .classify_image(&ClassifyRequest {
                image_url: "https://img/cake.jpg".to_string(),
                owner: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
        assert_eq!(err.stage(), Stage::Labels);
    }

    #[tokio::test]
    async fn test_classify_rejects_bad_url() {
        let detector = Arc::new(FakeLabelDetector::with_labels(&["Cake"]));
        let resolver = resolver(FakeProvider::default()).with_label_detector(detector.clone());

        for url in ["", "not a url", "ftp://img/cake.jpg"] {
            let err = resolver
                .classify_image(&ClassifyRequest {
                    image_url: url.to_string(),
                    owner: None,
                })
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument, "url: {:?}", url);
        }
        assert_eq!(detector.call_count(), 0);
    }

    #[test]
    fn test_parse_image_url() {
        assert_eq!(
            parse_image_url(" https://example.com/a.jpg ").unwrap(),
            "https://example.com/a.jpg"
        );
        assert!(parse_image_url("data:image/png;base64,AAAA").is_err());
    }
}
