//! End-to-end resolver tests against fake and mocked upstreams.

use larder_core::config::{ModelConfig, ProviderKind};
use larder_core::conversion::{ConversionCache, DiskStore};
use larder_core::llm::create_provider;
use larder_core::{
    ClassificationResult, ClassifyRequest, ConversionKey, ConvertRecipeRequest, ConvertRequest,
    ErrorCode, ExtractRequest, FakeLabelDetector, FakeProvider, IngredientLine, RecipeArchive,
    Region, ResolveError, Resolver, Stage, NO_OBJECTS_MESSAGE,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STORE_TIMEOUT: Duration = Duration::from_secs(2);

fn memory_resolver(provider: Arc<FakeProvider>) -> Resolver {
    Resolver::new(provider, ConversionCache::in_memory(STORE_TIMEOUT))
}

fn flour_request() -> ConvertRequest {
    ConvertRequest {
        ingredient: "flour".to_string(),
        quantity: 2.0,
        input_unit: "cups".to_string(),
        output_unit: "grams".to_string(),
        region: "US".to_string(),
    }
}

#[tokio::test]
async fn test_conversion_learned_once_then_answered_locally() {
    let provider = Arc::new(FakeProvider::with_response(
        "Convert 2 cups of flour into grams based on US",
        "240",
    ));
    let resolver = memory_resolver(provider.clone());

    let first = resolver.convert_unit(&flour_request()).await.unwrap();
    assert!(!first.cached);
    assert_eq!(provider.call_count(), 1);

    let record = resolver
        .cache()
        .record(&ConversionKey::new("flour", Region::Us))
        .await
        .unwrap()
        .expect("record should exist after a miss");
    assert!(record.factor("cups").is_some());
    assert!(record.factor("grams").is_some());

    let second = resolver.convert_unit(&flour_request()).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.display(), first.display());
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_zero_labels_is_not_found() {
    let provider = Arc::new(FakeProvider::default());
    let resolver = memory_resolver(provider.clone())
        .with_label_detector(Arc::new(FakeLabelDetector::with_labels(&[])));

    let err = resolver
        .classify_image(&ClassifyRequest {
            image_url: "https://example.com/blank.jpg".to_string(),
            owner: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::NotFound(_)));
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.public_message(), NO_OBJECTS_MESSAGE);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_fenced_extraction_matches_embedded_json() {
    let provider = Arc::new(FakeProvider::with_response(
        "butter",
        "```json\n[{\"ingredient\": \"flour\", \"measure\": \"500 g\"}, {\"ingredient\": \"butter\", \"measure\": \"250 g\"}]\n```",
    ));
    let resolver = memory_resolver(provider.clone());

    let lines = resolver
        .extract_ingredients(&ExtractRequest {
            text: "500g flour and 250g butter".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        lines,
        vec![
            IngredientLine {
                ingredient: "flour".to_string(),
                measure: "500 g".to_string(),
            },
            IngredientLine {
                ingredient: "butter".to_string(),
                measure: "250 g".to_string(),
            },
        ]
    );
    // Glued quantities reach the model separated.
    assert!(provider.prompts()[0].contains("500 g flour and 250 g butter"));
}

#[tokio::test]
async fn test_baked_product_archived_for_owner() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(FakeProvider::with_response(
        "Baked goods",
        &json!({
            "type": "baked_product",
            "recipe": {
                "name": "Banana Bread",
                "description": "Moist loaf",
                "ingredients": [
                    {"ingredient": "banana", "quantity": "3", "unit": "whole"},
                    {"ingredient": "flour", "quantity": 2, "unit": "cups", "notes": null}
                ],
                "steps": ["Mash bananas.", "Mix.", "Bake 60 minutes."]
            }
        })
        .to_string(),
    ));
    let resolver = memory_resolver(provider)
        .with_label_detector(Arc::new(FakeLabelDetector::with_labels(&[
            "Bread",
            "Baked goods",
        ])))
        .with_archive(RecipeArchive::new(temp.path().to_path_buf()));

    let result = resolver
        .classify_image(&ClassifyRequest {
            image_url: "https://example.com/loaf.jpg".to_string(),
            owner: Some("alice".to_string()),
        })
        .await
        .unwrap();

    let ClassificationResult::BakedProduct { recipe } = &result else {
        panic!("expected baked product, got {:?}", result);
    };
    assert_eq!(recipe.name, "Banana Bread");
    assert_eq!(recipe.ingredients[1].quantity, "2");
    assert_eq!(recipe.steps.len(), 3);

    let archived = resolver.archive().unwrap().list("alice").await.unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].recipe, *recipe);
}

#[tokio::test]
async fn test_ingredient_classification_not_archived() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(FakeProvider::with_response(
        "Herb",
        r#"{"type": "ingredient", "name": "basil", "uses": ["pesto", "caprese"]}"#,
    ));
    let resolver = memory_resolver(provider)
        .with_label_detector(Arc::new(FakeLabelDetector::with_labels(&["Herb", "Leaf"])))
        .with_archive(RecipeArchive::new(temp.path().to_path_buf()));

    let result = resolver
        .classify_image(&ClassifyRequest {
            image_url: "https://example.com/basil.jpg".to_string(),
            owner: Some("alice".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(result.kind(), "ingredient");
    assert!(resolver.archive().unwrap().list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_convert_recipe_line_by_line() {
    let provider = Arc::new(FakeProvider::new());
    provider.add_response(
        "Extract all ingredients",
        r#"[
            {"ingredient": "flour", "measure": "2 cups"},
            {"ingredient": "eggs", "measure": "3"},
            {"ingredient": "salt", "measure": "unknown"},
            {"ingredient": "sugar", "measure": "1 cup"}
        ]"#,
    );
    provider.add_response("2 cups of flour into grams", "240");
    // sugar has no configured answer and fails upstream
    let resolver = memory_resolver(provider.clone());

    let lines = resolver
        .convert_recipe(&ConvertRecipeRequest {
            text: "2 cups flour, 3 eggs, salt, 1 cup sugar".to_string(),
            output_unit: "grams".to_string(),
            region: "US".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].measure, "240.00 grams");
    assert!(lines[0].converted);
    assert_eq!(lines[1].measure, "3");
    assert!(!lines[1].converted);
    assert_eq!(lines[2].measure, "unknown");
    assert!(!lines[2].converted);
    assert_eq!(lines[3].measure, "1 cup");
    assert!(!lines[3].converted);
    assert_eq!(
        lines[3].error.as_deref(),
        Some("Service temporarily unavailable, please retry.")
    );
}

#[tokio::test]
async fn test_disk_learned_factors_survive_restart() {
    let temp = TempDir::new().unwrap();
    let cache = || {
        ConversionCache::new(
            Arc::new(DiskStore::new(temp.path().to_path_buf())),
            STORE_TIMEOUT,
        )
    };

    let provider = Arc::new(FakeProvider::with_response("into grams", "240"));
    let resolver = Resolver::new(provider.clone(), cache());
    resolver.convert_unit(&flour_request()).await.unwrap();
    drop(resolver);

    let provider = Arc::new(FakeProvider::new());
    let resolver = Resolver::new(provider.clone(), cache());
    let q = resolver.convert_unit(&flour_request()).await.unwrap();
    assert!(q.cached);
    assert_eq!(q.display(), "240.00");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_gemini_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/models/gemini-test:generateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "```\n{\"ingredients\": [{\"name\": \"rice\", \"quantity\": \"2 cups\"}], \"instructions\": [\"Rinse\", \"Boil\"]}\n```"}]}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = create_provider(&ModelConfig {
        provider: ProviderKind::Gemini,
        api_key: Some("test-key".to_string()),
        model: "gemini-test".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let resolver = Resolver::new(provider, ConversionCache::in_memory(STORE_TIMEOUT));

    let scaled = resolver
        .scale_recipe(&larder_core::ScaleRequest {
            recipe: json!({"servings": 2, "ingredients": [{"name": "rice", "quantity": "1 cup"}]}),
            new_servings: 4,
        })
        .await
        .unwrap();

    assert_eq!(scaled.ingredients[0].quantity, "2 cups");
    assert_eq!(scaled.instructions, vec!["Rinse", "Boil"]);
}

#[tokio::test]
async fn test_gemini_outage_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The model is overloaded."}
        })))
        .mount(&server)
        .await;

    let provider = create_provider(&ModelConfig {
        provider: ProviderKind::Gemini,
        api_key: Some("test-key".to_string()),
        model: "gemini-test".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let resolver = Resolver::new(provider, ConversionCache::in_memory(STORE_TIMEOUT));

    let err = resolver.convert_unit(&flour_request()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unavailable);
    assert_eq!(err.stage(), Stage::Model);
}
