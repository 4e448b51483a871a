//! Turn a sanitized candidate into a typed result, or say precisely why not.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

use crate::llm::truncate_chars;
use crate::sanitize::Candidate;
use crate::types::{
    BakedRecipe, ClassificationResult, IngredientLine, RecipeIngredient, ScaledIngredient,
    ScaledRecipe, UNKNOWN_MEASURE,
};

/// How much of an unparseable candidate is kept for diagnostics.
pub const SNIPPET_CHARS: usize = 120;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Malformed JSON ({message}) in: {snippet}")]
    MalformedJson { snippet: String, message: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Incomplete result: {0}")]
    IncompleteResult(String),
}

fn parse_json(candidate: &Candidate) -> Result<Value, ValidationError> {
    serde_json::from_str(candidate.as_str()).map_err(|e| ValidationError::MalformedJson {
        snippet: truncate_chars(candidate.as_str(), SNIPPET_CHARS),
        message: e.to_string(),
    })
}

/// Expect an array of `{ingredient, measure}`. An empty array is valid.
pub fn validate_extraction(candidate: &Candidate) -> Result<Vec<IngredientLine>, ValidationError> {
    let Value::Array(items) = parse_json(candidate)? else {
        return Err(ValidationError::SchemaMismatch(
            "expected an array of ingredients".to_string(),
        ));
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| -> Result<IngredientLine, ValidationError> {
            let obj = as_object(item, &format!("ingredients[{}]", idx))?;
            let ingredient = required_string(obj, "ingredient", &format!("ingredients[{}]", idx))?;
            let measure = match obj.get("measure") {
                None | Some(Value::Null) => UNKNOWN_MEASURE.to_string(),
                Some(value) => {
                    let measure = scalar_string(value, &format!("ingredients[{}].measure", idx))?;
                    if measure.trim().is_empty() {
                        UNKNOWN_MEASURE.to_string()
                    } else {
                        measure
                    }
                }
            };
            Ok(IngredientLine {
                ingredient,
                measure,
            })
        })
        .collect()
}

/// Expect `{ingredients: [{name, quantity}], instructions: [string]}`.
pub fn validate_scaling(candidate: &Candidate) -> Result<ScaledRecipe, ValidationError> {
    let value = parse_json(candidate)?;
    let obj = as_object(&value, "scaled recipe")?;

    let ingredients = required_array(obj, "ingredients", "scaled recipe")?
        .iter()
        .enumerate()
        .map(|(idx, item)| -> Result<ScaledIngredient, ValidationError> {
            let path = format!("ingredients[{}]", idx);
            let obj = as_object(item, &path)?;
            Ok(ScaledIngredient {
                name: required_string(obj, "name", &path)?,
                quantity: optional_scalar(obj, "quantity", &path)?.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let instructions = string_items(
        required_array(obj, "instructions", "scaled recipe")?,
        "instructions",
    )?;

    Ok(ScaledRecipe {
        ingredients,
        instructions,
    })
}

/// Expect a `type`-tagged object: ingredient, baked_product or unknown.
pub fn validate_classification(
    candidate: &Candidate,
) -> Result<ClassificationResult, ValidationError> {
    let value = parse_json(candidate)?;
    let obj = as_object(&value, "classification")?;

    let kind = match obj.get("type") {
        Some(Value::String(kind)) => kind.as_str(),
        Some(_) => {
            return Err(ValidationError::SchemaMismatch(
                "classification.type must be a string".to_string(),
            ))
        }
        None => {
            return Err(ValidationError::SchemaMismatch(
                "classification.type is missing".to_string(),
            ))
        }
    };

    match kind {
        "unknown" => Ok(ClassificationResult::unknown()),
        "ingredient" => {
            let name = non_empty_string(obj.get("name")).ok_or_else(|| {
                ValidationError::IncompleteResult("ingredient.name is missing".to_string())
            })?;
            let uses = match obj.get("uses") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => string_items(items, "uses")?,
                Some(_) => {
                    return Err(ValidationError::SchemaMismatch(
                        "ingredient.uses must be an array".to_string(),
                    ))
                }
            };
            Ok(ClassificationResult::Ingredient { name, uses })
        }
        "baked_product" => {
            let recipe = match obj.get("recipe") {
                Some(Value::Object(recipe)) => recipe,
                _ => {
                    return Err(ValidationError::IncompleteResult(
                        "baked_product.recipe is missing".to_string(),
                    ))
                }
            };
            let name = non_empty_string(recipe.get("name")).ok_or_else(|| {
                ValidationError::IncompleteResult("recipe.name is missing".to_string())
            })?;
            Ok(ClassificationResult::BakedProduct {
                recipe: baked_recipe(recipe, name)?,
            })
        }
        other => Err(ValidationError::SchemaMismatch(format!(
            "classification.type '{}' is not one of ingredient, baked_product, unknown",
            truncate_chars(other, 40)
        ))),
    }
}

fn baked_recipe(recipe: &Map<String, Value>, name: String) -> Result<BakedRecipe, ValidationError> {
    let description = optional_scalar(recipe, "description", "recipe")?.filter(|d| !d.is_empty());

    let ingredients = match recipe.get("ingredients") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| -> Result<RecipeIngredient, ValidationError> {
                let path = format!("recipe.ingredients[{}]", idx);
                let obj = as_object(item, &path)?;
                Ok(RecipeIngredient {
                    ingredient: required_string(obj, "ingredient", &path)?,
                    quantity: optional_scalar(obj, "quantity", &path)?.unwrap_or_default(),
                    unit: optional_scalar(obj, "unit", &path)?.unwrap_or_default(),
                    notes: optional_scalar(obj, "notes", &path)?.filter(|n| !n.is_empty()),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?,
        Some(_) => {
            return Err(ValidationError::SchemaMismatch(
                "recipe.ingredients must be an array".to_string(),
            ))
        }
    };

    let steps = match recipe.get("steps") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => string_items(items, "recipe.steps")?,
        Some(_) => {
            return Err(ValidationError::SchemaMismatch(
                "recipe.steps must be an array".to_string(),
            ))
        }
    };

    Ok(BakedRecipe {
        name,
        description,
        ingredients,
        steps,
    })
}

/// Leading number of a bare numeric answer ("240", "240.5 grams", "\"1e2\"").
static LEADING_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").expect("Invalid number regex")
});

/// Expect a finite, positive number at the start of the text.
pub fn validate_quantity(candidate: &Candidate) -> Result<f64, ValidationError> {
    let text = candidate.as_str().trim().trim_matches('"').trim();

    let value = LEADING_NUMBER_REGEX
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| {
            ValidationError::SchemaMismatch(format!(
                "expected a number, got: {}",
                truncate_chars(text, 40)
            ))
        })?;

    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::SchemaMismatch(format!(
            "conversion value must be a positive finite number, got {}",
            value
        )));
    }

    Ok(value)
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::SchemaMismatch(format!("{} must be an object", path)))
}

fn required_array<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ValidationError> {
    match obj.get(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ValidationError::SchemaMismatch(format!(
            "{}.{} must be an array",
            path, field
        ))),
        None => Err(ValidationError::SchemaMismatch(format!(
            "{}.{} is missing",
            path, field
        ))),
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<String, ValidationError> {
    non_empty_string(obj.get(field)).ok_or_else(|| {
        ValidationError::SchemaMismatch(format!("{}.{} must be a non-empty string", path, field))
    })
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Strings pass through, numbers are rendered; anything else is a mismatch.
fn scalar_string(value: &Value, path: &str) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ValidationError::SchemaMismatch(format!(
            "{} must be a string",
            path
        ))),
    }
}

fn optional_scalar(
    obj: &Map<String, Value>,
    field: &str,
    path: &str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(value, &format!("{}.{}", path, field)).map(Some),
    }
}

fn string_items(items: &[Value], path: &str) -> Result<Vec<String>, ValidationError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ValidationError::SchemaMismatch(format!(
                "{}[{}] must be a string",
                path, idx
            ))),
        })
        .collect()
}
