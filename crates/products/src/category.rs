use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{DomainResult, Entity, entity_id, error::{optional_text, required_text}};

entity_id! {
    pub struct CategoryId; "category id"
}

/// Product category (e.g. "Semen", "Besi", "Alat Tulis").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    pub fn create(input: CategoryInput, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CategoryId::new(),
            name: required_text("category name", &input.name, 60)?,
            description: optional_text(input.description),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, input: CategoryInput, now: DateTime<Utc>) -> DomainResult<()> {
        self.name = required_text("category name", &input.name, 60)?;
        self.description = optional_text(input.description);
        self.updated_at = now;
        Ok(())
    }

    /// Case-insensitive name comparison used for the uniqueness check.
    pub fn same_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trims_and_drops_blank_description() {
        let c = Category::create(
            CategoryInput { name: "  Semen ".into(), description: Some("  ".into()) },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(c.name, "Semen");
        assert_eq!(c.description, None);
        assert!(c.same_name("SEMEN"));
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(Category::create(CategoryInput { name: " ".into(), description: None }, Utc::now()).is_err());
    }
}
