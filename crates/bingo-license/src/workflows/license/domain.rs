use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Every field collected by the license application, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    ApplicantName,
    EntityType,
    OrganizationName,
    Email,
    Phone,
    AddressStreet,
    City,
    State,
    Zip,
    Municipality,
    OtherMunicipality,
    LicenseType,
    SessionsPerYear,
    StartDate,
    ExpirationDate,
    IsNonProfit,
    Ein,
    AgreeToRules,
}

impl FieldName {
    pub const ALL: [Self; 18] = [
        Self::ApplicantName,
        Self::EntityType,
        Self::OrganizationName,
        Self::Email,
        Self::Phone,
        Self::AddressStreet,
        Self::City,
        Self::State,
        Self::Zip,
        Self::Municipality,
        Self::OtherMunicipality,
        Self::LicenseType,
        Self::SessionsPerYear,
        Self::StartDate,
        Self::ExpirationDate,
        Self::IsNonProfit,
        Self::Ein,
        Self::AgreeToRules,
    ];

    /// Wire name used by the presentation layer and the submission payload.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApplicantName => "applicantName",
            Self::EntityType => "entityType",
            Self::OrganizationName => "organizationName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::AddressStreet => "addressStreet",
            Self::City => "city",
            Self::State => "state",
            Self::Zip => "zip",
            Self::Municipality => "municipality",
            Self::OtherMunicipality => "otherMunicipality",
            Self::LicenseType => "licenseType",
            Self::SessionsPerYear => "sessionsPerYear",
            Self::StartDate => "startDate",
            Self::ExpirationDate => "expirationDate",
            Self::IsNonProfit => "isNonProfit",
            Self::Ein => "ein",
            Self::AgreeToRules => "agreeToRules",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for FieldName {
    type Err = UnknownField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == raw)
            .ok_or_else(|| UnknownField(raw.to_string()))
    }
}

/// Raised when the presentation layer names a field the application does not collect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Individual,
    Organization,
}

impl EntityType {
    pub const LABELS: &'static [&'static str] = &["Individual", "Organization"];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Organization => "Organization",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "Individual" => Some(Self::Individual),
            "Organization" => Some(Self::Organization),
            _ => None,
        }
    }
}

/// States the county accepts applications from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsState {
    #[serde(rename = "PA")]
    Pennsylvania,
}

impl UsState {
    pub const LABELS: &'static [&'static str] = &["PA"];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pennsylvania => "PA",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "PA" => Some(Self::Pennsylvania),
            _ => None,
        }
    }
}

/// Franklin County municipalities offered by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Municipality {
    Chambersburg,
    Waynesboro,
    Shippensburg,
    Greencastle,
    Mercersburg,
    Other,
}

impl Municipality {
    pub const LABELS: &'static [&'static str] = &[
        "Chambersburg",
        "Waynesboro",
        "Shippensburg",
        "Greencastle",
        "Mercersburg",
        "Other",
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Chambersburg => "Chambersburg",
            Self::Waynesboro => "Waynesboro",
            Self::Shippensburg => "Shippensburg",
            Self::Greencastle => "Greencastle",
            Self::Mercersburg => "Mercersburg",
            Self::Other => "Other",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "Chambersburg" => Some(Self::Chambersburg),
            "Waynesboro" => Some(Self::Waynesboro),
            "Shippensburg" => Some(Self::Shippensburg),
            "Greencastle" => Some(Self::Greencastle),
            "Mercersburg" => Some(Self::Mercersburg),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    #[serde(rename = "Charitable Bingo")]
    CharitableBingo,
    #[serde(rename = "Commercial Bingo")]
    CommercialBingo,
}

impl LicenseType {
    pub const LABELS: &'static [&'static str] = &["Charitable Bingo", "Commercial Bingo"];

    pub const fn label(self) -> &'static str {
        match self {
            Self::CharitableBingo => "Charitable Bingo",
            Self::CommercialBingo => "Commercial Bingo",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "Charitable Bingo" => Some(Self::CharitableBingo),
            "Commercial Bingo" => Some(Self::CommercialBingo),
            _ => None,
        }
    }
}

/// In-progress application built field by field from raw presentation-layer input.
///
/// Values are kept exactly as supplied; coercion happens during validation. Setting a field to
/// `null` removes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationDraft {
    values: BTreeMap<FieldName, Value>,
}

impl ApplicationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a draft from arbitrary JSON. Keys the application does not collect are dropped and
    /// anything other than an object yields an empty draft, so malformed payloads surface as
    /// missing-field messages instead of errors.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from(map),
            _ => Self::default(),
        }
    }

    pub fn with(mut self, field: FieldName, value: impl Into<Value>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn set(&mut self, field: FieldName, value: Value) {
        if value.is_null() {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value);
        }
    }

    pub fn remove(&mut self, field: FieldName) -> Option<Value> {
        self.values.remove(&field)
    }

    pub fn get(&self, field: FieldName) -> Option<&Value> {
        self.values.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &Value)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl From<Map<String, Value>> for ApplicationDraft {
    fn from(map: Map<String, Value>) -> Self {
        let mut draft = Self::default();
        for (key, value) in map {
            if let Ok(field) = key.parse::<FieldName>() {
                draft.set(field, value);
            }
        }
        draft
    }
}

impl Serialize for ApplicationDraft {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.values.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ApplicationDraft {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(value))
    }
}

/// Fully validated, coerced application handed to the submission collaborator.
///
/// Field names, enum spellings, `YYYY-MM-DD` dates and the integer session count form the
/// payload contract with downstream systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseApplication {
    pub applicant_name: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    pub email: String,
    pub phone: String,
    pub address_street: String,
    pub city: String,
    pub state: UsState,
    pub zip: String,
    pub municipality: Municipality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_municipality: Option<String>,
    pub license_type: LicenseType,
    pub sessions_per_year: u16,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub is_non_profit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ein: Option<String>,
    pub agree_to_rules: bool,
}

impl LicenseApplication {
    /// Display name used on receipts: the organization for organizations, else the applicant.
    pub fn display_name(&self) -> &str {
        match (self.entity_type, self.organization_name.as_deref()) {
            (EntityType::Organization, Some(name)) => name,
            _ => &self.applicant_name,
        }
    }

    /// Municipality as entered, resolving "Other" to the free-text value.
    pub fn municipality_name(&self) -> &str {
        match (self.municipality, self.other_municipality.as_deref()) {
            (Municipality::Other, Some(name)) => name,
            (municipality, _) => municipality.label(),
        }
    }

    pub fn term_days(&self) -> i64 {
        (self.expiration_date - self.start_date).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_names_parse_from_their_wire_names() {
        for field in FieldName::ALL {
            assert_eq!(field.as_str().parse::<FieldName>(), Ok(field));
            assert_eq!(
                serde_json::to_value(field).expect("serializable"),
                json!(field.as_str())
            );
        }
        assert_eq!(
            "county".parse::<FieldName>(),
            Err(UnknownField("county".to_string()))
        );
    }

    #[test]
    fn setting_null_removes_a_value() {
        let mut draft = ApplicationDraft::new().with(FieldName::City, "Waynesboro");
        assert_eq!(draft.len(), 1);
        draft.set(FieldName::City, Value::Null);
        assert!(draft.is_empty());
        assert!(ApplicationDraft::from_json(json!(["not", "an", "object"])).is_empty());
    }
}
