pub mod json;
pub mod text;

pub use json::{JsonConfig, JsonFormatter, products_to_json, ranking_to_json, report_to_json, to_json};
pub use text::{TextConfig, TextFormatter, products_to_text, ranking_to_text, report_to_text};
