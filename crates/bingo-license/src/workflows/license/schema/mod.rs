mod coerce;
mod fields;
mod refinements;

pub use coerce::Pattern;
pub use fields::{Bound, FieldKind, FieldSpec, Requirement};
pub use refinements::Refinement;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::domain::{
    ApplicationDraft, EntityType, FieldName, LicenseApplication, LicenseType, Municipality,
    UsState,
};
use fields::FIELD_SPECS;
use refinements::REFINEMENTS;

/// Source of "today" for the start-date rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calendar {
    /// The local calendar date at validation time.
    #[default]
    Local,
    Fixed(NaiveDate),
}

impl Calendar {
    pub fn today(self) -> NaiveDate {
        match self {
            Calendar::Local => Local::now().date_naive(),
            Calendar::Fixed(date) => date,
        }
    }
}

/// Stateless validator built from the static field table and refinement list.
#[derive(Debug, Clone, Copy)]
pub struct ApplicationSchema {
    fields: &'static [FieldSpec],
    refinements: &'static [Refinement],
}

impl Default for ApplicationSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl ApplicationSchema {
    pub fn standard() -> Self {
        Self {
            fields: &FIELD_SPECS,
            refinements: &REFINEMENTS,
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        self.fields
    }

    pub fn refinements(&self) -> &[Refinement] {
        self.refinements
    }

    pub fn field_spec(&self, name: FieldName) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Check only the named fields, plus refinements whose dependencies are all named.
    /// Names the schema does not know are ignored.
    pub fn validate_fields<I, S>(&self, draft: &ApplicationDraft, names: I) -> Result<(), FieldErrors>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.validate_fields_as_of(draft, names, Calendar::Local.today())
    }

    pub fn validate_fields_as_of<I, S>(
        &self,
        draft: &ApplicationDraft,
        names: I,
        today: NaiveDate,
    ) -> Result<(), FieldErrors>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: BTreeSet<FieldName> = names
            .into_iter()
            .filter_map(|name| name.as_ref().parse::<FieldName>().ok())
            .collect();

        let (_, errors) = self.evaluate(draft, &selected, today);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Check every field and every refinement, collecting all violations.
    pub fn validate_all(&self, draft: &ApplicationDraft) -> Result<LicenseApplication, FieldErrors> {
        self.validate_all_as_of(draft, Calendar::Local.today())
    }

    pub fn validate_all_as_of(
        &self,
        draft: &ApplicationDraft,
        today: NaiveDate,
    ) -> Result<LicenseApplication, FieldErrors> {
        let selected: BTreeSet<FieldName> = self.fields.iter().map(|spec| spec.name).collect();
        let (parsed, errors) = self.evaluate(draft, &selected, today);
        if !errors.is_empty() {
            return Err(errors);
        }

        assemble(&parsed).map_err(|field| {
            let mut errors = FieldErrors::new();
            errors.record(field, self.missing_message(field));
            errors
        })
    }

    fn evaluate(
        &self,
        draft: &ApplicationDraft,
        selected: &BTreeSet<FieldName>,
        today: NaiveDate,
    ) -> (ParsedFields, FieldErrors) {
        let mut parsed = ParsedFields::default();
        let mut errors = FieldErrors::new();

        for spec in self.fields.iter().filter(|spec| selected.contains(&spec.name)) {
            match spec.check(draft.get(spec.name)) {
                Ok(value) => parsed.accept(spec.name, value),
                Err(message) => {
                    errors.record(spec.name, message);
                }
            }
        }

        for refinement in self.refinements {
            let applicable = refinement
                .depends_on
                .iter()
                .all(|field| selected.contains(field) && parsed.passed(*field));
            if !applicable || errors.contains(refinement.target) {
                continue;
            }
            if !(refinement.holds)(&parsed, today) {
                errors.record(refinement.target, refinement.message);
            }
        }

        (parsed, errors)
    }

    fn missing_message(&self, field: FieldName) -> String {
        match self.field_spec(field) {
            Some(FieldSpec {
                requirement: Requirement::Required { message },
                ..
            }) => (*message).to_string(),
            Some(spec) => format!("{} is invalid", spec.label),
            None => format!("{field} is invalid"),
        }
    }
}

/// A value that passed its field's own checks, already coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedValue {
    Text(String),
    Choice(&'static str),
    Integer(i64),
    Date(NaiveDate),
    Flag(bool),
}

/// Typed view of the fields that passed per-field validation, consumed by refinements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    values: BTreeMap<FieldName, ParsedValue>,
    passed: BTreeSet<FieldName>,
}

impl ParsedFields {
    fn accept(&mut self, field: FieldName, value: Option<ParsedValue>) {
        self.passed.insert(field);
        if let Some(value) = value {
            self.values.insert(field, value);
        }
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, field: FieldName, value: ParsedValue) {
        self.accept(field, Some(value));
    }

    /// True when the field passed its own checks, including optional fields left blank.
    pub fn passed(&self, field: FieldName) -> bool {
        self.passed.contains(&field)
    }

    pub fn get(&self, field: FieldName) -> Option<&ParsedValue> {
        self.values.get(&field)
    }

    pub fn text(&self, field: FieldName) -> Option<&str> {
        match self.values.get(&field) {
            Some(ParsedValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn choice(&self, field: FieldName) -> Option<&'static str> {
        match self.values.get(&field) {
            Some(ParsedValue::Choice(choice)) => Some(*choice),
            _ => None,
        }
    }

    pub fn integer(&self, field: FieldName) -> Option<i64> {
        match self.values.get(&field) {
            Some(ParsedValue::Integer(number)) => Some(*number),
            _ => None,
        }
    }

    pub fn date(&self, field: FieldName) -> Option<NaiveDate> {
        match self.values.get(&field) {
            Some(ParsedValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn flag(&self, field: FieldName) -> Option<bool> {
        match self.values.get(&field) {
            Some(ParsedValue::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }
}

fn assemble(parsed: &ParsedFields) -> Result<LicenseApplication, FieldName> {
    let text = |field: FieldName| parsed.text(field).map(str::to_string).ok_or(field);
    let optional_text = |field: FieldName| parsed.text(field).map(str::to_string);
    let choice = |field: FieldName| parsed.choice(field).ok_or(field);
    let date = |field: FieldName| parsed.date(field).ok_or(field);
    let flag = |field: FieldName| parsed.flag(field).ok_or(field);

    let sessions_per_year = parsed
        .integer(FieldName::SessionsPerYear)
        .and_then(|sessions| u16::try_from(sessions).ok())
        .ok_or(FieldName::SessionsPerYear)?;

    Ok(LicenseApplication {
        applicant_name: text(FieldName::ApplicantName)?,
        entity_type: EntityType::from_label(choice(FieldName::EntityType)?)
            .ok_or(FieldName::EntityType)?,
        organization_name: optional_text(FieldName::OrganizationName),
        email: text(FieldName::Email)?,
        phone: text(FieldName::Phone)?,
        address_street: text(FieldName::AddressStreet)?,
        city: text(FieldName::City)?,
        state: UsState::from_label(choice(FieldName::State)?).ok_or(FieldName::State)?,
        zip: text(FieldName::Zip)?,
        municipality: Municipality::from_label(choice(FieldName::Municipality)?)
            .ok_or(FieldName::Municipality)?,
        other_municipality: optional_text(FieldName::OtherMunicipality),
        license_type: LicenseType::from_label(choice(FieldName::LicenseType)?)
            .ok_or(FieldName::LicenseType)?,
        sessions_per_year,
        start_date: date(FieldName::StartDate)?,
        expiration_date: date(FieldName::ExpirationDate)?,
        is_non_profit: flag(FieldName::IsNonProfit)?,
        ein: optional_text(FieldName::Ein),
        agree_to_rules: flag(FieldName::AgreeToRules)?,
    })
}

/// One display message per field; the first message recorded for a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FieldName, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message unless the field already has one. Returns whether it was recorded.
    pub fn record(&mut self, field: FieldName, message: impl Into<String>) -> bool {
        if self.0.contains_key(&field) {
            return false;
        }
        self.0.insert(field, message.into());
        true
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.0.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.0
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(FieldName) -> bool) {
        self.0.retain(|field, _| keep(*field));
    }

    pub(crate) fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.record(field, message);
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}
