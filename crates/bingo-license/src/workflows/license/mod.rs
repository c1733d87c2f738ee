//! Bingo license application intake: field schema, cross-field refinements, and the
//! step-wise wizard that gates progress and dispatches accepted applications.

pub mod domain;
pub mod router;
pub mod schema;
pub mod service;
pub mod submission;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationDraft, EntityType, FieldName, LicenseApplication, LicenseType, Municipality,
    UnknownField, UsState,
};
pub use router::license_router;
pub use schema::{ApplicationSchema, Calendar, FieldErrors, ParsedFields, ParsedValue};
pub use service::{LicenseApplicationService, ServiceError, SessionId, SessionView};
pub use submission::{SubmissionCollaborator, SubmissionError, SubmissionReceipt};
pub use wizard::{
    PendingSubmission, SubmissionTicket, WizardController, WizardError, WizardState, WizardStep,
    WizardView,
};
