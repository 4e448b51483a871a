use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel measure for ingredients the text gives no quantity for.
pub const UNKNOWN_MEASURE: &str = "unknown";

/// Measurement region a conversion is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    Us,
    Uk,
    India,
    Australia,
    Germany,
    France,
    China,
}

impl Region {
    pub const ALL: &'static [Region] = &[
        Region::Us,
        Region::Uk,
        Region::India,
        Region::Australia,
        Region::Germany,
        Region::France,
        Region::China,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::Uk => "UK",
            Region::India => "India",
            Region::Australia => "Australia",
            Region::Germany => "Germany",
            Region::France => "France",
            Region::China => "China",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unsupported region: {}", wanted))
    }
}

impl TryFrom<String> for Region {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.as_str().to_string()
    }
}

/// One ingredient extracted from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient: String,
    /// Either "<quantity> <unit>" or [`UNKNOWN_MEASURE`].
    pub measure: String,
}

impl IngredientLine {
    pub fn is_unknown(&self) -> bool {
        self.measure.eq_ignore_ascii_case(UNKNOWN_MEASURE)
    }

    /// Split the measure into a numeric quantity and its unit.
    ///
    /// Accepts decimals, fractions ("1/2") and mixed numbers ("1 1/2 cups").
    pub fn quantity_and_unit(&self) -> Option<(f64, &str)> {
        if self.is_unknown() {
            return None;
        }

        let measure = self.measure.trim();
        let unit_start = measure
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| i)?;
        let (amount, unit) = measure.split_at(unit_start);
        let unit = unit.trim();
        if unit.is_empty() {
            return None;
        }

        parse_amount(amount).map(|q| (q, unit))
    }
}

/// Parse "2", "2.5", "1/2" or "1 1/2".
pub fn parse_amount(amount: &str) -> Option<f64> {
    let amount = amount.trim();
    if amount.is_empty() {
        return None;
    }

    let parts: Vec<&str> = amount.split_whitespace().collect();
    if parts.len() == 2 {
        let whole: f64 = parts[0].parse().ok()?;
        return Some(whole + parse_fraction(parts[1])?);
    }

    if amount.contains('/') {
        return parse_fraction(amount);
    }

    amount.parse().ok()
}

fn parse_fraction(s: &str) -> Option<f64> {
    let (num, denom) = s.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let denom: f64 = denom.trim().parse().ok()?;
    if denom == 0.0 {
        return None;
    }
    Some(num / denom)
}

/// An ingredient in a scaled recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledIngredient {
    pub name: String,
    pub quantity: String,
}

/// Recipe rewritten for a new number of servings. Instruction order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledRecipe {
    pub ingredients: Vec<ScaledIngredient>,
    pub instructions: Vec<String>,
}

/// Ingredient entry of a recipe inferred from a photo of a baked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub ingredient: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedRecipe {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub steps: Vec<String>,
}

/// Message attached to [`ClassificationResult::Unknown`].
pub const UNKNOWN_CLASSIFICATION_MESSAGE: &str =
    "could not determine the ingredient or baked product";

/// What an image shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassificationResult {
    Ingredient { name: String, uses: Vec<String> },
    BakedProduct { recipe: BakedRecipe },
    Unknown { message: String },
}

impl ClassificationResult {
    pub fn unknown() -> Self {
        ClassificationResult::Unknown {
            message: UNKNOWN_CLASSIFICATION_MESSAGE.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationResult::Ingredient { .. } => "ingredient",
            ClassificationResult::BakedProduct { .. } => "baked_product",
            ClassificationResult::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleRequest {
    /// The recipe as the caller stores it; must be a JSON object.
    pub recipe: serde_json::Value,
    pub new_servings: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    pub ingredient: String,
    pub quantity: f64,
    pub input_unit: String,
    pub output_unit: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub image_url: String,
    /// Owner to archive baked-product recipes under, if any.
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRecipeRequest {
    pub text: String,
    pub output_unit: String,
    pub region: String,
}

/// Result of a unit conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertedQuantity {
    /// Full-precision value.
    pub value: f64,
    /// True if answered from learned factors without consulting the model.
    pub cached: bool,
}

impl ConvertedQuantity {
    /// Two-decimal rendering used at the response boundary.
    pub fn display(&self) -> String {
        format!("{:.2}", self.value)
    }
}

/// One line of a converted recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedLine {
    pub ingredient: String,
    pub measure: String,
    pub converted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
