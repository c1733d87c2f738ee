use std::fmt;

use chrono::NaiveDate;

use super::super::domain::{EntityType, FieldName, Municipality};
use super::ParsedFields;

/// Whole-record rule evaluated after per-field checks.
///
/// A refinement only runs once every field in `depends_on` has passed its own checks, and it
/// never overwrites a message already recorded against `target`.
#[derive(Clone, Copy)]
pub struct Refinement {
    pub name: &'static str,
    pub depends_on: &'static [FieldName],
    pub target: FieldName,
    pub message: &'static str,
    pub holds: fn(&ParsedFields, NaiveDate) -> bool,
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("name", &self.name)
            .field("depends_on", &self.depends_on)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

pub(crate) static REFINEMENTS: [Refinement; 5] = [
    Refinement {
        name: "organization_name_required",
        depends_on: &[FieldName::EntityType, FieldName::OrganizationName],
        target: FieldName::OrganizationName,
        message: "Organization name is required for organizations",
        holds: organization_named,
    },
    Refinement {
        name: "other_municipality_required",
        depends_on: &[FieldName::Municipality, FieldName::OtherMunicipality],
        target: FieldName::OtherMunicipality,
        message: "Please specify the municipality",
        holds: other_municipality_named,
    },
    Refinement {
        name: "expiration_after_start",
        depends_on: &[FieldName::StartDate, FieldName::ExpirationDate],
        target: FieldName::ExpirationDate,
        message: "Expiration date must be after the start date",
        holds: expiration_after_start,
    },
    Refinement {
        name: "start_not_in_past",
        depends_on: &[FieldName::StartDate],
        target: FieldName::StartDate,
        message: "Start date cannot be in the past",
        holds: start_not_in_past,
    },
    Refinement {
        name: "agreement_accepted",
        depends_on: &[FieldName::AgreeToRules],
        target: FieldName::AgreeToRules,
        message: "You must agree to the Franklin County bingo regulations",
        holds: agreement_accepted,
    },
];

fn organization_named(fields: &ParsedFields, _today: NaiveDate) -> bool {
    let is_organization = fields
        .choice(FieldName::EntityType)
        .and_then(EntityType::from_label)
        == Some(EntityType::Organization);
    !is_organization || fields.text(FieldName::OrganizationName).is_some()
}

fn other_municipality_named(fields: &ParsedFields, _today: NaiveDate) -> bool {
    let is_other = fields
        .choice(FieldName::Municipality)
        .and_then(Municipality::from_label)
        == Some(Municipality::Other);
    !is_other || fields.text(FieldName::OtherMunicipality).is_some()
}

fn expiration_after_start(fields: &ParsedFields, _today: NaiveDate) -> bool {
    match (
        fields.date(FieldName::StartDate),
        fields.date(FieldName::ExpirationDate),
    ) {
        (Some(start), Some(expiration)) => expiration > start,
        _ => true,
    }
}

fn start_not_in_past(fields: &ParsedFields, today: NaiveDate) -> bool {
    fields
        .date(FieldName::StartDate)
        .map_or(true, |start| start >= today)
}

fn agreement_accepted(fields: &ParsedFields, _today: NaiveDate) -> bool {
    fields.flag(FieldName::AgreeToRules) == Some(true)
}
