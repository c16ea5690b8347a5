use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kopontren_core::{
    DomainError, DomainResult, Entity, entity_id,
    error::{optional_text, required_text},
};

entity_id! {
    /// Supplier identifier.
    pub struct SupplierId; "supplier id"
}

/// A material supplier (toko bangunan, distributor, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}

/// Create/update payload. Updates replace every field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

fn validate_phone(phone: Option<String>) -> DomainResult<Option<String>> {
    let Some(phone) = optional_text(phone) else {
        return Ok(None);
    };
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-');
    if !phone.chars().all(allowed) || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(
            "phone may only contain digits, spaces, '+' and '-'",
        ));
    }
    Ok(Some(phone))
}

fn validate_email(email: Option<String>) -> DomainResult<Option<String>> {
    let Some(email) = optional_text(email) else {
        return Ok(None);
    };
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(Some(email.to_lowercase()))
        }
        _ => Err(DomainError::validation("email must look like name@domain")),
    }
}

struct Checked {
    name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    notes: Option<String>,
}

impl SupplierInput {
    fn check(self) -> DomainResult<Checked> {
        Ok(Checked {
            name: required_text("supplier name", &self.name, 120)?,
            contact_person: optional_text(self.contact_person),
            phone: validate_phone(self.phone)?,
            email: validate_email(self.email)?,
            address: optional_text(self.address),
            notes: optional_text(self.notes),
        })
    }
}

impl Supplier {
    pub fn create(input: SupplierInput, now: DateTime<Utc>) -> DomainResult<Self> {
        let c = input.check()?;
        Ok(Self {
            id: SupplierId::new(),
            name: c.name,
            contact_person: c.contact_person,
            phone: c.phone,
            email: c.email,
            address: c.address,
            notes: c.notes,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, input: SupplierInput, now: DateTime<Utc>) -> DomainResult<()> {
        let c = input.check()?;
        self.name = c.name;
        self.contact_person = c.contact_person;
        self.phone = c.phone;
        self.email = c.email;
        self.address = c.address;
        self.notes = c.notes;
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = now;
    }

    /// Inactive suppliers cannot receive new purchase orders.
    pub fn ensure_can_order(&self) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::invalid_state(format!(
                "supplier {} is inactive",
                self.name
            )));
        }
        Ok(())
    }

    pub fn matches_search(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.name.to_lowercase().contains(&q)
            || self
                .contact_person
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&q))
            || self.phone.as_deref().is_some_and(|p| p.contains(&q))
    }
}
