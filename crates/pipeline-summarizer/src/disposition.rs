use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerReason {
    SchemaMismatch,
    LlmTimeout,
    JsonParse,
    Unknown,
}

impl fmt::Display for SummarizerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SummarizerReason::SchemaMismatch => "SCHEMA_MISMATCH",
            SummarizerReason::LlmTimeout => "LLM_TIMEOUT",
            SummarizerReason::JsonParse => "JSON_PARSE",
            SummarizerReason::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl From<&crate::llm::LlmError> for SummarizerReason {
    fn from(err: &crate::llm::LlmError) -> Self {
        match err {
            crate::llm::LlmError::Timeout => SummarizerReason::LlmTimeout,
            crate::llm::LlmError::JsonParse(_) => SummarizerReason::JsonParse,
            crate::llm::LlmError::Unknown(_) => SummarizerReason::Unknown,
        }
    }
}
