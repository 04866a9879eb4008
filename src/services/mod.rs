pub mod language_model;
pub mod token_counter;
pub mod version_control;

pub use language_model::{GenerationOptions, LanguageModelService};
pub use token_counter::TokenCountService;
pub use version_control::VersionControlService;
