// people.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::DomainError;

/// Voluntario que solicita, es seleccionado y asiste a programas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sewadar {
    pub id: Uuid,
    pub name: String,
    /// Dirección de contacto (teléfono/correo) para avisos de selección.
    pub contact: Option<String>,
    pub joined_on: NaiveDate,
}

impl Sewadar {
    pub fn new(name: impl Into<String>, contact: Option<String>, joined_on: NaiveDate) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               contact,
               joined_on }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Incharge,
    Admin,
    Sewadar,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Incharge => "incharge",
            Role::Admin => "admin",
            Role::Sewadar => "sewadar",
        }
    }

    /// Capacidad "incharge": crear programas, seleccionar participantes y
    /// conducir el workflow.
    pub fn has_incharge_capability(self) -> bool {
        matches!(self, Role::Incharge | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incharge" => Ok(Role::Incharge),
            "admin" => Ok(Role::Admin),
            "sewadar" => Ok(Role::Sewadar),
            other => Err(DomainError::UnknownStatus { kind: "role",
                                                      value: other.to_string() }),
        }
    }
}

/// Cuenta de operador del sistema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub contact: Option<String>,
}

impl Account {
    pub fn new(name: impl Into<String>, role: Role, contact: Option<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               role,
               contact }
    }

    /// Contacto utilizable para avisos de etapa: cuenta incharge con
    /// dirección no vacía.
    pub fn incharge_contact(&self) -> Option<&str> {
        if !self.role.has_incharge_capability() {
            return None;
        }
        self.contact.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Identidad explícita de quien invoca una operación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub account_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(account_id: Uuid, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn is_incharge(&self) -> bool {
        self.role.has_incharge_capability()
    }
}

impl From<&Account> for Caller {
    fn from(a: &Account) -> Self {
        Caller::new(a.id, a.role)
    }
}
