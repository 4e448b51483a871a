//! Unit conversion through the learned-factor cache.
//!
//! A hit is answered with arithmetic alone. A miss asks the model once,
//! answers with the model's number, and records what that answer teaches
//! about the two units. Misses on the same (ingredient, region) are
//! serialized so concurrent callers do not ask twice.

use super::Resolver;
use crate::conversion::{normalize_name, plan_anchored, plan_learning, ConversionKey, LearnPlan};
use crate::error::{ResolveError, Stage};
use crate::prompts::convert::CONVERT_PROMPT_NAME;
use crate::prompts::render_convert_prompt;
use crate::types::{
    ConvertRecipeRequest, ConvertRequest, ConvertedLine, ConvertedQuantity, ExtractRequest, Region,
};
use crate::validate::validate_quantity;

fn parse_region(region: &str) -> Result<Region, ResolveError> {
    region.parse().map_err(ResolveError::InvalidInput)
}

fn require_unit<'a>(unit: &'a str, field: &str) -> Result<&'a str, ResolveError> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Err(ResolveError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(unit)
}

impl Resolver {
    /// Convert `quantity input_unit` of an ingredient into `output_unit`.
    pub async fn convert_unit(
        &self,
        request: &ConvertRequest,
    ) -> Result<ConvertedQuantity, ResolveError> {
        let ingredient = request.ingredient.trim();
        if ingredient.is_empty() {
            return Err(ResolveError::InvalidInput(
                "ingredient must not be empty".to_string(),
            ));
        }
        if !request.quantity.is_finite() || request.quantity <= 0.0 {
            return Err(ResolveError::InvalidInput(format!(
                "quantity must be a positive number, got {}",
                request.quantity
            )));
        }
        let input_unit = require_unit(&request.input_unit, "input_unit")?;
        let output_unit = require_unit(&request.output_unit, "output_unit")?;
        let region = parse_region(&request.region)?;

        let quantity = request.quantity;
        let source = normalize_name(input_unit);
        let target = normalize_name(output_unit);
        if source == target {
            return Ok(ConvertedQuantity {
                value: quantity,
                cached: true,
            });
        }

        let key = ConversionKey::new(ingredient, region);
        let lookup_failed = |source| ResolveError::Store {
            stage: Stage::CacheLookup,
            source,
        };

        if let Some(pair) = self
            .cache
            .lookup(&key, &source, &target)
            .await
            .map_err(lookup_failed)?
        {
            tracing::debug!(key = %key, source = %source, target = %target, "Conversion cache hit");
            return Ok(ConvertedQuantity {
                value: pair.apply(quantity),
                cached: true,
            });
        }

        let _flight = self.cache.single_flight(&key).await;

        // Another request may have learned the pair while we waited.
        let record = self.cache.record(&key).await.map_err(lookup_failed)?;
        if let Some(pair) = record.as_ref().and_then(|r| r.pair(&source, &target)) {
            tracing::debug!(key = %key, "Conversion learned while waiting");
            return Ok(ConvertedQuantity {
                value: pair.apply(quantity),
                cached: true,
            });
        }

        tracing::info!(key = %key, source = %source, target = %target, "Conversion cache miss");
        let answer = self
            .ask_quantity(ingredient, quantity, input_unit, output_unit, region)
            .await?;

        let units = match plan_learning(record.as_ref(), &source, &target, quantity, answer) {
            LearnPlan::Learn(units) => Some(units),
            LearnPlan::NeedsAnchor {
                base_unit,
                base_factor,
            } => {
                // The anchoring call is best-effort: the answer above already stands.
                match self
                    .ask_quantity(ingredient, quantity, input_unit, &base_unit, region)
                    .await
                {
                    Ok(anchor) => Some(plan_anchored(
                        &source,
                        &target,
                        quantity,
                        answer,
                        base_factor,
                        anchor,
                    )),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Could not anchor new units");
                        None
                    }
                }
            }
        };

        if let Some(units) = units {
            if let Err(e) = self.cache.learn_all(&key, &units).await {
                tracing::warn!(key = %key, error = %e, "Failed to record conversion factors");
            }
        }

        Ok(ConvertedQuantity {
            value: answer,
            cached: false,
        })
    }

    async fn ask_quantity(
        &self,
        ingredient: &str,
        quantity: f64,
        source_unit: &str,
        target_unit: &str,
        region: Region,
    ) -> Result<f64, ResolveError> {
        let prompt = render_convert_prompt(ingredient, quantity, source_unit, target_unit, region);
        let candidate = self.ask(CONVERT_PROMPT_NAME, &prompt).await?;
        validate_quantity(&candidate).map_err(|e| Self::rejected(CONVERT_PROMPT_NAME, &candidate, e))
    }

    /// Extract a recipe's ingredients and convert every measured line into
    /// `output_unit`. Lines that cannot be converted keep their original
    /// measure; one failing line does not fail the recipe.
    pub async fn convert_recipe(
        &self,
        request: &ConvertRecipeRequest,
    ) -> Result<Vec<ConvertedLine>, ResolveError> {
        let output_unit = require_unit(&request.output_unit, "output_unit")?;
        parse_region(&request.region)?;

        let lines = self
            .extract_ingredients(&ExtractRequest {
                text: request.text.clone(),
            })
            .await?;

        let mut converted = Vec::with_capacity(lines.len());
        for line in lines {
            let Some((quantity, unit)) = line.quantity_and_unit() else {
                converted.push(ConvertedLine {
                    ingredient: line.ingredient,
                    measure: line.measure,
                    converted: false,
                    error: None,
                });
                continue;
            };

            let result = self
                .convert_unit(&ConvertRequest {
                    ingredient: line.ingredient.clone(),
                    quantity,
                    input_unit: unit.to_string(),
                    output_unit: output_unit.to_string(),
                    region: request.region.clone(),
                })
                .await;

            converted.push(match result {
                Ok(q) => ConvertedLine {
                    measure: format!("{} {}", q.display(), output_unit),
                    ingredient: line.ingredient,
                    converted: true,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(ingredient = %line.ingredient, error = %e, "Line conversion failed");
                    ConvertedLine {
                        error: Some(e.public_message()),
                        ingredient: line.ingredient,
                        measure: line.measure,
                        converted: false,
                    }
                }
            });
        }

        Ok(converted)
    }
}
