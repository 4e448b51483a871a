//! Ingredient extraction prompt.

use super::normalize_quantities;
use crate::types::UNKNOWN_MEASURE;

/// Prompt name used in logs.
pub const EXTRACT_PROMPT_NAME: &str = "extract_ingredients";

/// Render the extraction prompt for free recipe text.
pub fn render_extract_prompt(text: &str) -> String {
    let text = normalize_quantities(text);

    format!(
        r#"Extract all ingredients and their measurements from the following recipe text:
{text}

Rules:
- Only return structured JSON.
- Preserve numbers and units exactly as written.
- If an ingredient has no measurement, set measure as "{unknown}".
- Return JSON in this exact format:

[
  {{"ingredient": "flour", "measure": "500 grams"}},
  {{"ingredient": "sugar", "measure": "100 grams"}}
]"#,
        text = text,
        unknown = UNKNOWN_MEASURE
    )
}
