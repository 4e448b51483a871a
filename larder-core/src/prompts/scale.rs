//! Recipe scaling prompt.

/// Prompt name used in logs.
pub const SCALE_PROMPT_NAME: &str = "scale_recipe";

/// Render the scaling prompt for a recipe object and a target serving count.
pub fn render_scale_prompt(recipe: &serde_json::Value, new_servings: u32) -> String {
    let recipe_json = serde_json::to_string_pretty(recipe).unwrap_or_else(|_| recipe.to_string());

    format!(
        r#"Scale this recipe for {new_servings} servings.

Original Recipe:
{recipe_json}

Rules:
- Scale all ingredient amounts accurately.
- Keep temperature, resting, proofing, and refrigeration times unchanged.
- Round whole-number items like eggs and folds properly.
- Ensure instructions remain natural and readable.
- Keep the instructions in their original order.
- Return the output in structured JSON format.

Example Output JSON:
{{
  "ingredients": [
    {{"name": "flour", "quantity": "750g"}},
    {{"name": "sugar", "quantity": "200g"}}
  ],
  "instructions": [
    "Preheat oven to 180°C.",
    "Mix flour and sugar.",
    "Bake for 25 minutes."
  ]
}}"#
    )
}
