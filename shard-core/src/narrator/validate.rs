//! Turn schema validation and normalization.
//!
//! A turn object carries six required keys. Validation accumulates every
//! applicable error rather than stopping at the first, so a repair
//! request (and the log) can name everything that was wrong at once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Candidate choices considered before normalization; anything past this
/// is ignored.
pub const MAX_CHOICES: usize = 4;

/// Minimum normalized choices for a playable turn.
pub const MIN_CHOICES: usize = 2;

/// Required keys with the type each must carry.
const REQUIRED_KEYS: [(&str, &str); 6] = [
    ("narrator", "a string"),
    ("speaker", "a string"),
    ("reply", "a string"),
    ("choices", "an array"),
    ("state_updates", "an object"),
    ("memory_summary", "a string"),
];

/// A validated, normalized model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    pub narrator: String,
    pub speaker: String,
    pub reply: String,
    pub choices: Vec<String>,
    pub state_updates: Map<String, Value>,
    pub memory_summary: String,
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Output is not a JSON object")]
    NotAnObject,

    #[error("Missing required key: {0}")]
    MissingKey(&'static str),

    #[error("Key '{key}' must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Unexpected key: {0}")]
    UnexpectedKey(String),

    #[error("choices[{0}] must be a string or an object with a 'text' field")]
    BadChoiceShape(usize),

    #[error("choices must contain 2-4 non-empty items")]
    ChoiceCount,
}

/// One accepted shape per choice entry; anything else is an error rather
/// than a stringified guess.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChoiceCandidate {
    Text(String),
    Labeled { text: String },
}

/// Validates candidate turn objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnValidator {
    reject_unknown_keys: bool,
}

impl TurnValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A validator that also rejects keys outside the schema. Used by the
    /// single-field protocol variant; the turn schema tolerates extras.
    pub fn strict() -> Self {
        Self {
            reject_unknown_keys: true,
        }
    }

    /// Check `candidate` against the turn schema.
    ///
    /// On success the returned reply has its choice list normalized:
    /// clamped to the first [`MAX_CHOICES`] entries, each trimmed, empties
    /// dropped, and the result required to hold between [`MIN_CHOICES`]
    /// and [`MAX_CHOICES`] entries. Validating an already-normalized
    /// reply returns it unchanged.
    pub fn validate(&self, candidate: &Value) -> Result<TurnReply, Vec<ValidationError>> {
        let Some(object) = candidate.as_object() else {
            return Err(vec![ValidationError::NotAnObject]);
        };

        let mut errors = Vec::new();

        let narrator = require_string(object, "narrator", &mut errors);
        let speaker = require_string(object, "speaker", &mut errors);
        let reply = require_string(object, "reply", &mut errors);
        let raw_choices = require_array(object, "choices", &mut errors);
        let state_updates = require_map(object, "state_updates", &mut errors);
        let memory_summary = require_string(object, "memory_summary", &mut errors);

        if self.reject_unknown_keys {
            for key in object.keys() {
                if !REQUIRED_KEYS.iter().any(|(name, _)| name == key) {
                    errors.push(ValidationError::UnexpectedKey(key.clone()));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let choices = clean_choices(&raw_choices, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(TurnReply {
            narrator,
            speaker,
            reply,
            choices,
            state_updates,
            memory_summary,
        })
    }
}

/// Validate with the default (non-strict) turn validator.
pub fn validate_turn(candidate: &Value) -> Result<TurnReply, Vec<ValidationError>> {
    TurnValidator::new().validate(candidate)
}

fn require_string(
    object: &Map<String, Value>,
    key: &'static str,
    errors: &mut Vec<ValidationError>,
) -> String {
    match object.get(key) {
        None => {
            errors.push(ValidationError::MissingKey(key));
            String::new()
        }
        Some(Value::String(text)) => text.clone(),
        Some(_) => {
            errors.push(wrong_type(key));
            String::new()
        }
    }
}

fn require_array(
    object: &Map<String, Value>,
    key: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Vec<Value> {
    match object.get(key) {
        None => {
            errors.push(ValidationError::MissingKey(key));
            Vec::new()
        }
        Some(Value::Array(entries)) => entries.clone(),
        Some(_) => {
            errors.push(wrong_type(key));
            Vec::new()
        }
    }
}

fn require_map(
    object: &Map<String, Value>,
    key: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Map<String, Value> {
    match object.get(key) {
        None => {
            errors.push(ValidationError::MissingKey(key));
            Map::new()
        }
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            errors.push(wrong_type(key));
            Map::new()
        }
    }
}

fn wrong_type(key: &'static str) -> ValidationError {
    let expected = REQUIRED_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, expected)| *expected)
        .unwrap_or("a different type");
    ValidationError::WrongType { key, expected }
}

/// Normalize the candidate choice list.
fn clean_choices(raw: &[Value], errors: &mut Vec<ValidationError>) -> Vec<String> {
    let mut cleaned = Vec::new();
    for (index, entry) in raw.iter().take(MAX_CHOICES).enumerate() {
        match serde_json::from_value::<ChoiceCandidate>(entry.clone()) {
            Ok(ChoiceCandidate::Text(text)) | Ok(ChoiceCandidate::Labeled { text }) => {
                let text = text.trim();
                if !text.is_empty() {
                    cleaned.push(text.to_string());
                }
            }
            Err(_) => errors.push(ValidationError::BadChoiceShape(index)),
        }
    }

    if !(MIN_CHOICES..=MAX_CHOICES).contains(&cleaned.len()) {
        errors.push(ValidationError::ChoiceCount);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn well_formed() -> Value {
        json!({
            "narrator": "Rain thins over the market stalls.",
            "speaker": "Eli",
            "reply": "Shipments? Ask the ledger, not me.",
            "choices": ["Press him about the ledger", "Walk away"],
            "state_updates": {},
            "memory_summary": "Eli deflected questions about the shipment."
        })
    }

    #[test]
    fn test_valid_object_passes() {
        let reply = validate_turn(&well_formed()).expect("valid");
        assert_eq!(reply.speaker, "Eli");
        assert_eq!(reply.choices.len(), 2);
    }

    #[test]
    fn test_non_object_fails_immediately() {
        let errors = validate_turn(&json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NotAnObject]);
    }

    #[test]
    fn test_missing_keys_all_reported() {
        let errors = validate_turn(&json!({"narrator": "only this"})).unwrap_err();
        for key in ["speaker", "reply", "choices", "state_updates", "memory_summary"] {
            assert!(
                errors.contains(&ValidationError::MissingKey(key)),
                "expected missing-key error for {key}"
            );
        }
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_wrong_types_reported_per_key() {
        let mut candidate = well_formed();
        candidate["reply"] = json!(7);
        candidate["state_updates"] = json!([]);
        let errors = validate_turn(&candidate).unwrap_err();
        assert!(errors.contains(&ValidationError::WrongType {
            key: "reply",
            expected: "a string"
        }));
        assert!(errors.contains(&ValidationError::WrongType {
            key: "state_updates",
            expected: "an object"
        }));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_extra_keys_tolerated_by_default() {
        let mut candidate = well_formed();
        candidate["mood"] = json!("wary");
        assert!(validate_turn(&candidate).is_ok());
    }

    #[test]
    fn test_strict_rejects_extra_keys() {
        let mut candidate = well_formed();
        candidate["mood"] = json!("wary");
        let errors = TurnValidator::strict().validate(&candidate).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnexpectedKey("mood".to_string())]
        );
    }

    #[test]
    fn test_choices_clamped_to_first_four() {
        let mut candidate = well_formed();
        candidate["choices"] = json!(["a", "b", "c", "d", "e", "f"]);
        let reply = validate_turn(&candidate).expect("valid");
        assert_eq!(reply.choices, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_too_few_choices_fail() {
        for choices in [json!([]), json!(["only one"]), json!(["  ", "\t", "one"])] {
            let mut candidate = well_formed();
            candidate["choices"] = choices;
            let errors = validate_turn(&candidate).unwrap_err();
            assert!(errors.contains(&ValidationError::ChoiceCount));
        }
    }

    #[test]
    fn test_choice_objects_with_text_accepted() {
        let mut candidate = well_formed();
        candidate["choices"] = json!([
            {"text": "  Press him  "},
            {"text": "Leave", "tone": "cold"}
        ]);
        let reply = validate_turn(&candidate).expect("valid");
        assert_eq!(reply.choices, vec!["Press him", "Leave"]);
    }

    #[test]
    fn test_unacceptable_choice_shape_rejected() {
        let mut candidate = well_formed();
        candidate["choices"] = json!(["fine", 7, {"label": "no text key"}]);
        let errors = validate_turn(&candidate).unwrap_err();
        assert!(errors.contains(&ValidationError::BadChoiceShape(1)));
        assert!(errors.contains(&ValidationError::BadChoiceShape(2)));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let reply = validate_turn(&well_formed()).expect("valid");
        let revalidated =
            validate_turn(&serde_json::to_value(&reply).expect("serialize")).expect("valid");
        assert_eq!(reply, revalidated);
    }

    #[test]
    fn test_error_messages_are_actionable() {
        let errors = validate_turn(&json!({})).unwrap_err();
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        assert!(rendered.contains(&"Missing required key: narrator".to_string()));
    }
}
