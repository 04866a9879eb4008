pub mod git;
pub mod openai;
pub mod tokenizer;
