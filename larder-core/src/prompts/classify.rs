//! Image classification prompt.

/// Prompt name used in logs.
pub const CLASSIFY_PROMPT_NAME: &str = "classify_image";

/// Render the classification prompt for an image and its detected labels.
pub fn render_classify_prompt(image_url: &str, labels: &[String]) -> String {
    let labels = labels.join(", ");

    format!(
        r#"Analyze the image from this URL: {image_url}

Detected Features from Vision API: {labels}

Rules for Analysis:
- If the image contains a single ingredient, return JSON:
  {{"type": "ingredient", "name": "ingredient name", "uses": ["common use 1", "common use 2"]}}.
- If the image is a baked product, return JSON:
  {{"type": "baked_product", "recipe": {{
    "name": "recipe name",
    "description": "short description",
    "ingredients": [
      {{"ingredient": "ingredient name", "quantity": "quantity", "unit": "unit", "notes": "optional notes"}}
    ],
    "steps": ["step 1", "step 2", "..."]
  }}}}.
- If unsure, return JSON: {{"type": "unknown"}}.
- Always return only JSON output. No extra text, explanations, or formatting.

Ensure ingredient names are concise and accurate."#
    )
}
