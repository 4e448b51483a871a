//! Unit conversion prompt (direct numeric answer).

use super::normalize_quantities;
use crate::types::Region;

/// Prompt name used in logs.
pub const CONVERT_PROMPT_NAME: &str = "convert_unit";

/// Render a prompt asking for `quantity source_unit` of `ingredient` in `target_unit`.
pub fn render_convert_prompt(
    ingredient: &str,
    quantity: f64,
    source_unit: &str,
    target_unit: &str,
    region: Region,
) -> String {
    let ingredient = normalize_quantities(ingredient);

    format!(
        r#"Convert {quantity} {source_unit} of {ingredient} into {target_unit} based on {region} measurement standards.
Provide only the numerical conversion value, with no units and no other text."#
    )
}
