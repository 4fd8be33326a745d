pub mod file_type;
pub mod llm_instructions;
pub mod text_extraction;
