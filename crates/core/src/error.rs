use std::collections::BTreeMap;

use crate::types::DbId;

/// Field path -> list of human-readable messages, mirroring what a client
/// form needs to highlight individual inputs.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: FieldErrors,
    },

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Quota exceeded, next refill in {ms_before_next_refill} ms")]
    QuotaExceeded { ms_before_next_refill: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// A validation failure that is not tied to a single field.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    /// A validation failure for one named field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.clone()]);
        Self::Validation {
            message: format!("{field}: {message}"),
            fields,
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        collect_field_errors(&errors, "", &mut fields);

        let message = fields
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        CoreError::Validation {
            message: format!("invalid fields: {message}"),
            fields,
        }
    }
}

/// Flatten nested validator errors into dotted field paths.
pub(crate) fn collect_field_errors(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut FieldErrors,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                let messages = out.entry(path).or_default();
                for err in list {
                    let msg = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    messages.push(msg);
                }
            }
            validator::ValidationErrorsKind::Struct(inner) => {
                collect_field_errors(inner, &path, out);
            }
            validator::ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
