//! Prompt templates.
//!
//! Every renderer is a pure function of its input. Each template embeds the
//! raw input, the exact JSON shape expected back, and the task's rules.

pub mod classify;
pub mod convert;
pub mod extract;
pub mod scale;

pub use classify::render_classify_prompt;
pub use convert::render_convert_prompt;
pub use extract::render_extract_prompt;
pub use scale::render_scale_prompt;

use regex::Regex;
use std::sync::LazyLock;

/// A digit run immediately followed by a letter run ("250g").
static QUANTITY_UNIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([a-zA-Z]+)").expect("Invalid quantity/unit regex"));

/// Insert a space between a number and a glued-on unit: "250g" -> "250 g".
pub fn normalize_quantities(text: &str) -> String {
    QUANTITY_UNIT_REGEX.replace_all(text, "$1 $2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quantities() {
        assert!(normalize_quantities("250g sugar").contains("250 g sugar"));
        assert!(normalize_quantities("7ml vanilla").contains("7 ml vanilla"));
        assert_eq!(
            normalize_quantities("2 cups flour, 1.5kg apples"),
            "2 cups flour, 1.5 kg apples"
        );
    }

    #[test]
    fn test_normalize_quantities_leaves_spaced_text_alone() {
        let text = "3 eggs and 100 g butter";
        assert_eq!(normalize_quantities(text), text);
    }
}
