//! Declarative input schemas.
//!
//! A [`Schema`] is an ordered list of [`Field`] rules checked against raw
//! JSON. Checking never stops at the first problem: every violated
//! constraint is reported as a [`FieldError`]. Omitted fields that declare a
//! default are filled in; omitted optional fields stay absent; unknown keys
//! are dropped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a field rule found wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Violation {
    Required,
    InvalidType,
    TooShort,
    TooLong,
    InvalidFormat,
}

/// One violated constraint. `field` is empty when the input as a whole is
/// rejected (for example, a non-object payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: Violation,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: Violation, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

/// Every constraint violated by one input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Errors reported for `field`, in check order.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.0.iter().filter(move |e| e.field == field)
    }

    /// Messages grouped per field, for form-style presentation.
    pub fn by_field(&self) -> indexmap::IndexMap<&str, Vec<&str>> {
        let mut grouped: indexmap::IndexMap<&str, Vec<&str>> = indexmap::IndexMap::new();
        for err in &self.0 {
            grouped
                .entry(err.field.as_str())
                .or_default()
                .push(err.message.as_str());
        }
        grouped
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid input")?;
        for (i, err) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            if err.field.is_empty() {
                write!(f, "{sep}{}", err.message)?;
            } else {
                write!(f, "{sep}{}: {}", err.field, err.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    String,
    Uuid,
}

/// Constraint set for one named field.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    min_len: Option<usize>,
    max_len: Option<usize>,
    pattern: Option<(&'static Regex, &'static str)>,
    default: Option<Value>,
}

impl Field {
    fn with_kind(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            min_len: None,
            max_len: None,
            pattern: None,
            default: None,
        }
    }

    /// A required string field.
    pub fn string(name: &'static str) -> Self {
        Self::with_kind(name, FieldKind::String)
    }

    /// A required string field that must parse as a UUID.
    pub fn uuid(name: &'static str) -> Self {
        Self::with_kind(name, FieldKind::Uuid)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Minimum length in characters.
    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    /// Maximum length in characters.
    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    /// Require a full-string regex match; `describe` is used in the message.
    pub fn pattern(mut self, re: &'static Regex, describe: &'static str) -> Self {
        self.pattern = Some((re, describe));
        self
    }

    /// Substitute `value` when the field is omitted. Implies optional.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    fn check(&self, value: &Value, errors: &mut ValidationErrors) -> Option<Value> {
        let Some(s) = value.as_str() else {
            errors.push(FieldError::new(
                self.name,
                Violation::InvalidType,
                "expected a string",
            ));
            return None;
        };
        let before = errors.len();
        self.check_str(s, errors);
        (errors.len() == before).then(|| value.clone())
    }

    fn check_str(&self, s: &str, errors: &mut ValidationErrors) {
        let len = s.chars().count();
        if let Some(min) = self.min_len
            && len < min
        {
            let message = if min == 1 {
                "must not be empty".to_string()
            } else {
                format!("must be at least {min} characters")
            };
            errors.push(FieldError::new(self.name, Violation::TooShort, message));
        }
        if let Some(max) = self.max_len
            && len > max
        {
            errors.push(FieldError::new(
                self.name,
                Violation::TooLong,
                format!("must be at most {max} characters"),
            ));
        }
        if let Some((re, describe)) = self.pattern
            && !re.is_match(s)
        {
            errors.push(FieldError::new(
                self.name,
                Violation::InvalidFormat,
                format!("must be {describe}"),
            ));
        }
        if self.kind == FieldKind::Uuid && uuid::Uuid::parse_str(s).is_err() {
            errors.push(FieldError::new(
                self.name,
                Violation::InvalidFormat,
                "must be a UUID",
            ));
        }
    }
}

/// Ordered object schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Schema with no fields; accepts `null` or any object.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Check `input` and return the cleaned object.
    ///
    /// `null` is read as an empty object, and a `null` field as an omitted
    /// one.
    pub fn check(&self, input: &Value) -> Result<Checked, ValidationErrors> {
        let empty = Map::new();
        let object = match input {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ValidationErrors::single(FieldError::new(
                    "",
                    Violation::InvalidType,
                    "expected an object",
                )));
            }
        };

        let mut errors = ValidationErrors::default();
        let mut out = Map::new();
        for field in &self.fields {
            match object.get(field.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    if let Some(clean) = field.check(value, &mut errors) {
                        out.insert(field.name.to_string(), clean);
                    }
                }
                None => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        errors.push(FieldError::new(
                            field.name,
                            Violation::Required,
                            "is required",
                        ));
                    }
                }
            }
        }
        errors.into_result(Checked(out))
    }
}

/// Output of a successful [`Schema::check`].
#[derive(Debug, Clone, Default)]
pub struct Checked(Map<String, Value>);

impl Checked {
    /// Remove a string field, if present.
    pub fn take_string(&mut self, name: &str) -> Option<String> {
        match self.0.remove(name) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Remove a string field that the schema marked required.
    pub fn require_string(&mut self, name: &'static str) -> Result<String, ValidationErrors> {
        self.take_string(name).ok_or_else(|| {
            ValidationErrors::single(FieldError::new(name, Violation::Required, "is required"))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

/// Types that can only be obtained by validating raw input.
pub trait Validate: Sized {
    fn parse(input: &Value) -> Result<Self, ValidationErrors>;
}
