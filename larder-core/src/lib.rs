pub mod archive;
pub mod config;
pub mod conversion;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod resolver;
pub mod sanitize;
pub mod types;
pub mod validate;
pub mod vision;

pub use archive::{ArchivedRecipe, RecipeArchive};
pub use config::{ConfigError, LarderConfig};
pub use conversion::{ConversionCache, ConversionKey, ConversionRecord, ConversionStore};
pub use error::{ErrorCode, ResolveError, Stage, UpstreamError};
pub use llm::{FakeProvider, LlmProvider};
pub use resolver::{Resolver, NO_OBJECTS_MESSAGE};
pub use types::{
    BakedRecipe, ClassificationResult, ClassifyRequest, ConvertRecipeRequest, ConvertRequest,
    ConvertedLine, ConvertedQuantity, ExtractRequest, IngredientLine, Region, ScaleRequest,
    ScaledIngredient, ScaledRecipe,
};
pub use vision::{FakeLabelDetector, LabelDetector};
