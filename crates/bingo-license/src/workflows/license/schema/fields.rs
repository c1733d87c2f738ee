use serde_json::Value;

use super::super::domain::{EntityType, FieldName, LicenseType, Municipality, UsState};
use super::coerce::{self, Pattern};
use super::ParsedValue;

/// Declarative constraints for a single field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: FieldName,
    pub label: &'static str,
    pub requirement: Requirement,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required { message: &'static str },
    Optional,
}

/// A limit paired with the message reported when it is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound<T> {
    pub limit: T,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Text {
        trim: bool,
        min: Option<Bound<usize>>,
        max: Option<Bound<usize>>,
        pattern: Option<(Pattern, &'static str)>,
    },
    Choice {
        options: &'static [&'static str],
    },
    Integer {
        invalid: &'static str,
        fractional: &'static str,
        min: Bound<i64>,
        max: Bound<i64>,
    },
    Date {
        invalid: &'static str,
    },
    Flag {
        invalid: &'static str,
    },
}

const fn bound<T>(limit: T, message: &'static str) -> Option<Bound<T>> {
    Some(Bound { limit, message })
}

const fn required(message: &'static str) -> Requirement {
    Requirement::Required { message }
}

pub(crate) static FIELD_SPECS: [FieldSpec; 18] = [
    FieldSpec {
        name: FieldName::ApplicantName,
        label: "Applicant name",
        requirement: required("Applicant name is required"),
        kind: FieldKind::Text {
            trim: true,
            min: bound(2, "Applicant name must be at least 2 characters"),
            max: bound(100, "Applicant name must be at most 100 characters"),
            pattern: None,
        },
    },
    FieldSpec {
        name: FieldName::EntityType,
        label: "Entity type",
        requirement: required("Entity type is required"),
        kind: FieldKind::Choice {
            options: EntityType::LABELS,
        },
    },
    FieldSpec {
        name: FieldName::OrganizationName,
        label: "Organization name",
        requirement: Requirement::Optional,
        kind: FieldKind::Text {
            trim: true,
            min: bound(2, "Organization name must be at least 2 characters"),
            max: bound(150, "Organization name must be at most 150 characters"),
            pattern: None,
        },
    },
    FieldSpec {
        name: FieldName::Email,
        label: "Email",
        requirement: required("Email is required"),
        kind: FieldKind::Text {
            trim: false,
            min: None,
            max: None,
            pattern: Some((Pattern::Email, "Please enter a valid email address")),
        },
    },
    FieldSpec {
        name: FieldName::Phone,
        label: "Phone number",
        requirement: required("Phone number is required"),
        kind: FieldKind::Text {
            trim: true,
            min: None,
            max: None,
            pattern: Some((Pattern::UsPhone, "Please enter a valid US phone number")),
        },
    },
    FieldSpec {
        name: FieldName::AddressStreet,
        label: "Street address",
        requirement: required("Street address is required"),
        kind: FieldKind::Text {
            trim: true,
            min: bound(5, "Street address must be at least 5 characters"),
            max: bound(200, "Street address must be at most 200 characters"),
            pattern: None,
        },
    },
    FieldSpec {
        name: FieldName::City,
        label: "City",
        requirement: required("City is required"),
        kind: FieldKind::Text {
            trim: true,
            min: bound(2, "City must be at least 2 characters"),
            max: bound(100, "City must be at most 100 characters"),
            pattern: None,
        },
    },
    FieldSpec {
        name: FieldName::State,
        label: "State",
        requirement: required("State is required"),
        kind: FieldKind::Choice {
            options: UsState::LABELS,
        },
    },
    FieldSpec {
        name: FieldName::Zip,
        label: "ZIP code",
        requirement: required("ZIP code is required"),
        kind: FieldKind::Text {
            trim: true,
            min: None,
            max: None,
            pattern: Some((Pattern::ZipCode, "ZIP code must be 5 digits")),
        },
    },
    FieldSpec {
        name: FieldName::Municipality,
        label: "Municipality",
        requirement: required("Municipality is required"),
        kind: FieldKind::Choice {
            options: Municipality::LABELS,
        },
    },
    FieldSpec {
        name: FieldName::OtherMunicipality,
        label: "Other municipality",
        requirement: Requirement::Optional,
        kind: FieldKind::Text {
            trim: true,
            min: bound(2, "Please specify the municipality"),
            max: bound(100, "Municipality must be at most 100 characters"),
            pattern: None,
        },
    },
    FieldSpec {
        name: FieldName::LicenseType,
        label: "License type",
        requirement: required("License type is required"),
        kind: FieldKind::Choice {
            options: LicenseType::LABELS,
        },
    },
    FieldSpec {
        name: FieldName::SessionsPerYear,
        label: "Sessions per year",
        requirement: required("Number of sessions is required"),
        kind: FieldKind::Integer {
            invalid: "Sessions must be a number",
            fractional: "Sessions per year must be an integer",
            min: Bound {
                limit: 1,
                message: "At least 1 session per year is required",
            },
            max: Bound {
                limit: 365,
                message: "Sessions per year cannot exceed 365",
            },
        },
    },
    FieldSpec {
        name: FieldName::StartDate,
        label: "Start date",
        requirement: required("License start date is required"),
        kind: FieldKind::Date {
            invalid: "Start date is invalid",
        },
    },
    FieldSpec {
        name: FieldName::ExpirationDate,
        label: "Expiration date",
        requirement: required("License expiration date is required"),
        kind: FieldKind::Date {
            invalid: "Expiration date is invalid",
        },
    },
    FieldSpec {
        name: FieldName::IsNonProfit,
        label: "Non-profit status",
        requirement: required("Non-profit status is required"),
        kind: FieldKind::Flag {
            invalid: "Non-profit status must be true or false",
        },
    },
    FieldSpec {
        name: FieldName::Ein,
        label: "EIN",
        requirement: Requirement::Optional,
        kind: FieldKind::Text {
            trim: true,
            min: None,
            max: None,
            pattern: Some((Pattern::Ein, "EIN must be in the format 12-3456789")),
        },
    },
    FieldSpec {
        name: FieldName::AgreeToRules,
        label: "Agreement",
        requirement: required("Agreement is required"),
        kind: FieldKind::Flag {
            invalid: "Agreement must be true or false",
        },
    },
];

impl FieldSpec {
    /// Run this field's own checks. `Ok(None)` means an optional field was left blank.
    pub fn check(&self, raw: Option<&Value>) -> Result<Option<ParsedValue>, String> {
        let Some(raw) = raw.filter(|value| !coerce::is_blank(value)) else {
            return match self.requirement {
                Requirement::Required { message } => Err(message.to_string()),
                Requirement::Optional => Ok(None),
            };
        };

        match self.kind {
            FieldKind::Text {
                trim,
                min,
                max,
                pattern,
            } => {
                let Some(text) = raw.as_str() else {
                    return Err(format!("{} must be text", self.label));
                };
                let text = if trim { text.trim() } else { text };
                let length = text.chars().count();

                if let Some(min) = min.filter(|min| length < min.limit) {
                    return Err(min.message.to_string());
                }
                if let Some(max) = max.filter(|max| length > max.limit) {
                    return Err(max.message.to_string());
                }
                if let Some((pattern, message)) = pattern {
                    if !pattern.matches(text) {
                        return Err(message.to_string());
                    }
                }
                Ok(Some(ParsedValue::Text(text.to_string())))
            }
            FieldKind::Choice { options } => raw
                .as_str()
                .and_then(|text| options.iter().copied().find(|option| *option == text))
                .map(|option| Some(ParsedValue::Choice(option)))
                .ok_or_else(|| format!("{} must be one of: {}", self.label, options.join(", "))),
            FieldKind::Integer {
                invalid,
                fractional,
                min,
                max,
            } => {
                let number = coerce::number(raw).ok_or_else(|| invalid.to_string())?;
                if number.fract() != 0.0 {
                    return Err(fractional.to_string());
                }
                if number < min.limit as f64 {
                    return Err(min.message.to_string());
                }
                if number > max.limit as f64 {
                    return Err(max.message.to_string());
                }
                Ok(Some(ParsedValue::Integer(number as i64)))
            }
            FieldKind::Date { invalid } => coerce::date(raw)
                .map(|date| Some(ParsedValue::Date(date)))
                .ok_or_else(|| invalid.to_string()),
            FieldKind::Flag { invalid } => raw
                .as_bool()
                .map(|flag| Some(ParsedValue::Flag(flag)))
                .ok_or_else(|| invalid.to_string()),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.requirement, Requirement::Required { .. })
    }
}
