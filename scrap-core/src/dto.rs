//! Validated procedure inputs.
//!
//! Every type here has private fields and is only obtainable through
//! [`Validate::parse`].

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::schema::{Field, Schema, Validate, ValidationErrors};
use crate::types::{CategoryId, ScrapBookId};

/// Color assigned to a new category when none is supplied.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

/// Maximum category name length, in characters.
pub const CATEGORY_NAME_MAX: usize = 50;

/// `#RGB` or `#RRGGBB`, case-insensitive.
pub fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"^#([0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})$") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

const HEX_COLOR: &str = "a hex color like #3B82F6 or #38F";

fn category_name() -> Field {
    Field::string("name").min_len(1).max_len(CATEGORY_NAME_MAX)
}

fn category_color() -> Field {
    Field::string("color").pattern(hex_color_regex(), HEX_COLOR)
}

fn create_category_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::empty()
            .field(category_name())
            .field(category_color().default_value(DEFAULT_CATEGORY_COLOR))
    })
}

fn update_category_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::empty()
            .field(Field::uuid("id"))
            .field(category_name().optional())
            .field(category_color().optional())
    })
}

fn id_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| Schema::empty().field(Field::uuid("id")))
}

/// Input of `todoCategory.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCategory {
    name: String,
    color: String,
}

impl CreateCategory {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

impl Validate for CreateCategory {
    fn parse(input: &Value) -> Result<Self, ValidationErrors> {
        let mut checked = create_category_schema().check(input)?;
        Ok(Self {
            name: checked.require_string("name")?,
            color: checked.require_string("color")?,
        })
    }
}

/// Partial category change. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

impl UpdateCategory {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

/// Input of `todoCategory.update`: the target id plus the change set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCategoryInput {
    id: CategoryId,
    #[serde(flatten)]
    changes: UpdateCategory,
}

impl UpdateCategoryInput {
    pub fn id(&self) -> CategoryId {
        self.id
    }

    pub fn changes(&self) -> &UpdateCategory {
        &self.changes
    }
}

impl Validate for UpdateCategoryInput {
    fn parse(input: &Value) -> Result<Self, ValidationErrors> {
        let mut checked = update_category_schema().check(input)?;
        let id = parse_checked_uuid(checked.require_string("id")?)?;
        Ok(Self {
            id: CategoryId::from_uuid(id),
            changes: UpdateCategory {
                name: checked.take_string("name"),
                color: checked.take_string("color"),
            },
        })
    }
}

/// `{ id }` addressing a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    id: CategoryId,
}

impl CategoryRef {
    pub fn id(&self) -> CategoryId {
        self.id
    }
}

impl Validate for CategoryRef {
    fn parse(input: &Value) -> Result<Self, ValidationErrors> {
        let mut checked = id_schema().check(input)?;
        let id = parse_checked_uuid(checked.require_string("id")?)?;
        Ok(Self {
            id: CategoryId::from_uuid(id),
        })
    }
}

/// `{ id }` addressing a scrap book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrapBookRef {
    id: ScrapBookId,
}

impl ScrapBookRef {
    pub fn id(&self) -> ScrapBookId {
        self.id
    }
}

impl Validate for ScrapBookRef {
    fn parse(input: &Value) -> Result<Self, ValidationErrors> {
        let mut checked = id_schema().check(input)?;
        let id = parse_checked_uuid(checked.require_string("id")?)?;
        Ok(Self {
            id: ScrapBookId::from_uuid(id),
        })
    }
}

/// Input of procedures that take nothing. Accepts `null` or any object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoInput;

impl Validate for NoInput {
    fn parse(input: &Value) -> Result<Self, ValidationErrors> {
        Schema::empty().check(input).map(|_| NoInput)
    }
}

// The schema already format-checked the value; this only converts it.
fn parse_checked_uuid(s: String) -> Result<uuid::Uuid, ValidationErrors> {
    uuid::Uuid::parse_str(&s).map_err(|_| {
        ValidationErrors::single(crate::schema::FieldError::new(
            "id",
            crate::schema::Violation::InvalidFormat,
            "must be a UUID",
        ))
    })
}
