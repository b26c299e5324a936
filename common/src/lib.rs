//! Aura Common Library
//!
//! CLIと対話セッションで共有される型・プロンプト・パーサー・状態機械

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod session;

pub use types::{AnalysisInput, CoPilotAnalysis, InferredIntent, IngredientInsight, UncertaintyLevel};
pub use error::{Error, Result};
pub use prompts::{build_parts, split_data_url, PromptPart, CLOSING_DIRECTIVE, SYSTEM_INSTRUCTION};
pub use parser::{extract_json_object, parse_analysis_response, validate_analysis};
pub use session::{update, Effect, Event, SessionState, View};
