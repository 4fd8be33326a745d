use serde_json::{json, Value};

pub static CONSULTATION_SYSTEM_MESSAGE: &str = "You assist a public consultation team. \
You read feedback submitted by citizens, organisations and businesses and answer strictly \
with JSON that conforms to the supplied schema. Do not invent feedback that is not present \
in the input.";

pub const ANONYMOUS_DEFAULT_HINT: &str = "If no specific stakeholder information is available, \
use \"Anonymous\" and \"individual\" as defaults.";

/// Prompt asking for sentiment, confidence and keywords of a single comment.
pub fn comment_analysis_prompt(comment_text: &str) -> String {
    format!(
        "Analyze this consultation comment for sentiment and extract key topics/keywords:\n\n\
         Comment: \"{comment_text}\"\n\n\
         Please provide:\n\
         1. Sentiment classification (positive, negative, or neutral)\n\
         2. Confidence score (0-1)\n\
         3. Key topics/keywords (5-10 most important terms)"
    )
}

pub fn comment_analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sentiment": {
                "type": "string",
                "enum": ["positive", "negative", "neutral"]
            },
            "confidence": { "type": "number" },
            "keywords": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["sentiment", "confidence", "keywords"],
        "additionalProperties": false
    })
}

/// Prompt splitting a free-text document into individual comments.
pub fn segmentation_prompt(full_text: &str) -> String {
    format!(
        "Parse this consultation document text and extract individual comments/feedback. \
         Each comment should include the comment text and try to identify stakeholder \
         information if available:\n\n\
         Text: \"{full_text}\"\n\n\
         Please extract individual comments, feedback, or submissions. For each comment, \
         try to identify:\n\
         1. The actual comment/feedback text\n\
         2. Stakeholder name (if mentioned)\n\
         3. Stakeholder type (individual, organization, business, ngo, other - best guess \
         if not explicit)\n\n\
         {ANONYMOUS_DEFAULT_HINT}"
    )
}

pub fn segmented_comments_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "comments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "comment_text": { "type": "string" },
                        "stakeholder_name": { "type": "string" },
                        "stakeholder_type": {
                            "type": "string",
                            "enum": ["individual", "organization", "business", "ngo", "other"]
                        }
                    },
                    "required": ["comment_text", "stakeholder_name", "stakeholder_type"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["comments"],
        "additionalProperties": false
    })
}

/// Schema for tabular files whose rows already are comments.
pub fn structured_comments_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "comments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "comment_text": { "type": "string" },
                        "stakeholder_name": { "type": "string" },
                        "stakeholder_type": { "type": "string" },
                        "submission_date": { "type": "string" }
                    },
                    "required": [
                        "comment_text",
                        "stakeholder_name",
                        "stakeholder_type",
                        "submission_date"
                    ],
                    "additionalProperties": false
                }
            }
        },
        "required": ["comments"],
        "additionalProperties": false
    })
}

pub fn full_text_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "full_text": {
                "type": "string",
                "description": "The complete text content of the document"
            }
        },
        "required": ["full_text"],
        "additionalProperties": false
    })
}

/// True when a schema asks for nothing but the document's raw text.
pub fn requests_only_full_text(schema: &Value) -> bool {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| props.len() == 1 && props.contains_key("full_text"))
}

/// Prompt used to fill an arbitrary extraction schema from a document.
pub fn schema_extraction_prompt(document_text: &str) -> String {
    format!(
        "Extract the requested data from the document below. For tabular input every row \
         that contains feedback is one comment; leave fields you cannot find as empty \
         strings.\n\nDocument:\n{document_text}"
    )
}
