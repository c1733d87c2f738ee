use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{ApplicationDraft, FieldName, LicenseApplication};
use super::schema::{ApplicationSchema, Calendar, FieldErrors};
use super::submission::{SubmissionCollaborator, SubmissionError, SubmissionReceipt};

const APPLICANT_FIELDS: [FieldName; 11] = [
    FieldName::ApplicantName,
    FieldName::EntityType,
    FieldName::OrganizationName,
    FieldName::Email,
    FieldName::Phone,
    FieldName::AddressStreet,
    FieldName::City,
    FieldName::State,
    FieldName::Zip,
    FieldName::Municipality,
    FieldName::OtherMunicipality,
];

const LICENSE_TERMS_FIELDS: [FieldName; 7] = [
    FieldName::LicenseType,
    FieldName::SessionsPerYear,
    FieldName::StartDate,
    FieldName::ExpirationDate,
    FieldName::IsNonProfit,
    FieldName::Ein,
    FieldName::AgreeToRules,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Applicant,
    LicenseTerms,
    Review,
}

impl WizardStep {
    pub const fn ordered() -> [Self; 3] {
        [Self::Applicant, Self::LicenseTerms, Self::Review]
    }

    pub const fn index(self) -> u8 {
        match self {
            Self::Applicant => 0,
            Self::LicenseTerms => 1,
            Self::Review => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Applicant => "Applicant & Location",
            Self::LicenseTerms => "License Terms",
            Self::Review => "Review & Submit",
        }
    }

    /// Fields that must validate before leaving this step. Review has none of its own.
    pub fn fields(self) -> &'static [FieldName] {
        match self {
            Self::Applicant => &APPLICANT_FIELDS,
            Self::LicenseTerms => &LICENSE_TERMS_FIELDS,
            Self::Review => &[],
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Applicant => Self::LicenseTerms,
            Self::LicenseTerms | Self::Review => Self::Review,
        }
    }

    pub const fn previous(self) -> Self {
        match self {
            Self::Applicant | Self::LicenseTerms => Self::Applicant,
            Self::Review => Self::LicenseTerms,
        }
    }
}

/// Identifies one dispatched submission so late completions can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubmissionTicket(u64);

/// Validated application handed out by [`WizardController::begin_submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub ticket: SubmissionTicket,
    pub application: LicenseApplication,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    Editing {
        step: WizardStep,
    },
    Submitting {
        step: WizardStep,
        ticket: SubmissionTicket,
    },
    /// Terminal until [`WizardController::reset`].
    Submitted {
        application: LicenseApplication,
        receipt: SubmissionReceipt,
    },
}

/// Step-wise controller over one in-progress application.
///
/// The state enum is only mutated by `advance`, `retreat`, `begin_submit`/`complete_submit`
/// and `reset`; field updates touch the draft alone.
#[derive(Debug, Clone)]
pub struct WizardController {
    schema: Arc<ApplicationSchema>,
    calendar: Calendar,
    state: WizardState,
    draft: ApplicationDraft,
    messages: FieldErrors,
    last_failure: Option<SubmissionError>,
    tickets_issued: u64,
}

impl WizardController {
    pub fn new(schema: Arc<ApplicationSchema>) -> Self {
        Self {
            schema,
            calendar: Calendar::Local,
            state: WizardState::Editing {
                step: WizardStep::Applicant,
            },
            draft: ApplicationDraft::new(),
            messages: FieldErrors::new(),
            last_failure: None,
            tickets_issued: 0,
        }
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> WizardStep {
        match &self.state {
            WizardState::Editing { step } | WizardState::Submitting { step, .. } => *step,
            WizardState::Submitted { .. } => WizardStep::Review,
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, WizardState::Submitting { .. })
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.state, WizardState::Submitted { .. })
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    pub fn messages(&self) -> &FieldErrors {
        &self.messages
    }

    /// Message to display next to `field` after the latest validation pass.
    pub fn field_message(&self, field: &str) -> Option<&str> {
        field
            .parse::<FieldName>()
            .ok()
            .and_then(|field| self.messages.get(field))
    }

    pub fn last_failure(&self) -> Option<&SubmissionError> {
        self.last_failure.as_ref()
    }

    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        let field = field
            .parse::<FieldName>()
            .map_err(|err| WizardError::UnknownField(err.0))?;
        self.draft.set(field, value);
        Ok(())
    }

    /// Validate the current step's fields and move forward when they pass. Only `retreat`
    /// and `reset` navigate while a submission is pending.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        let step = match self.state {
            WizardState::Editing { step } => step,
            WizardState::Submitting { .. } => return Err(WizardError::SubmissionInFlight),
            WizardState::Submitted { .. } => return Err(WizardError::AlreadySubmitted),
        };

        let fields = step.fields();
        let outcome =
            self.schema
                .validate_fields_as_of(&self.draft, fields, self.calendar.today());
        self.messages.retain(|field| !fields.contains(&field));

        match outcome {
            Ok(()) => {
                let next = step.next();
                self.move_to(next);
                debug!(from = ?step, to = ?next, "wizard advanced");
                Ok(next)
            }
            Err(errors) => {
                debug!(step = ?step, violations = errors.len(), "wizard step incomplete");
                self.messages.merge(errors.clone());
                Err(WizardError::Validation(errors))
            }
        }
    }

    /// Step back without validating. A no-op once submitted.
    pub fn retreat(&mut self) -> WizardStep {
        if self.is_submitted() {
            return WizardStep::Review;
        }
        let previous = self.current_step().previous();
        self.move_to(previous);
        previous
    }

    /// Discard the draft and return to the first step from any state.
    pub fn reset(&mut self) {
        if let WizardState::Submitting { ticket, .. } = self.state {
            info!(ticket = ticket.0, "wizard reset abandons pending submission");
        }
        self.state = WizardState::Editing {
            step: WizardStep::Applicant,
        };
        self.draft.clear();
        self.messages.clear();
        self.last_failure = None;
    }

    /// Validate the whole application and mark it as in flight.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, WizardError> {
        let step = match self.state {
            WizardState::Editing { step } => step,
            WizardState::Submitting { .. } => return Err(WizardError::SubmissionInFlight),
            WizardState::Submitted { .. } => return Err(WizardError::AlreadySubmitted),
        };

        match self.schema.validate_all_as_of(&self.draft, self.calendar.today()) {
            Ok(application) => {
                self.tickets_issued += 1;
                let ticket = SubmissionTicket(self.tickets_issued);
                self.messages.clear();
                self.last_failure = None;
                self.state = WizardState::Submitting { step, ticket };
                info!(ticket = ticket.0, "license application dispatched");
                Ok(PendingSubmission {
                    ticket,
                    application,
                })
            }
            Err(errors) => {
                debug!(violations = errors.len(), "submission blocked by validation");
                self.messages = errors.clone();
                Err(WizardError::Validation(errors))
            }
        }
    }

    /// Apply the collaborator's outcome for a submission started by `begin_submit`.
    pub fn complete_submit(
        &mut self,
        pending: PendingSubmission,
        outcome: Result<SubmissionReceipt, SubmissionError>,
    ) -> Result<SubmissionReceipt, WizardError> {
        let step = match self.state {
            WizardState::Submitting { step, ticket } if ticket == pending.ticket => step,
            _ => {
                let receipt = outcome.ok();
                match &receipt {
                    Some(receipt) => warn!(
                        ticket = pending.ticket.0,
                        reference = %receipt.reference,
                        "collaborator accepted a submission the wizard no longer tracks"
                    ),
                    None => debug!(ticket = pending.ticket.0, "stale submission failed"),
                }
                return Err(WizardError::StaleSubmission { receipt });
            }
        };

        match outcome {
            Ok(receipt) => {
                info!(reference = %receipt.reference, "license application submitted");
                self.state = WizardState::Submitted {
                    application: pending.application,
                    receipt: receipt.clone(),
                };
                self.draft.clear();
                self.messages.clear();
                Ok(receipt)
            }
            Err(error) => {
                warn!(%error, "license application submission failed");
                self.state = WizardState::Editing { step };
                self.last_failure = Some(error.clone());
                Err(WizardError::Submission(error))
            }
        }
    }

    /// Validate, dispatch to `collaborator`, and record the outcome.
    pub async fn submit<C>(&mut self, collaborator: &C) -> Result<SubmissionReceipt, WizardError>
    where
        C: SubmissionCollaborator + ?Sized,
    {
        let pending = self.begin_submit()?;
        let outcome = collaborator
            .submit_record(pending.application.clone())
            .await;
        self.complete_submit(pending, outcome)
    }

    pub fn view(&self) -> WizardView {
        let step = self.current_step();
        let (application, receipt) = match &self.state {
            WizardState::Submitted {
                application,
                receipt,
            } => (Some(application.clone()), Some(receipt.clone())),
            _ => (None, None),
        };

        WizardView {
            current_step: step.index(),
            step,
            step_label: step.label(),
            is_submitting: self.is_submitting(),
            submitted: self.is_submitted(),
            values: self.draft.clone(),
            messages: self.messages.clone(),
            last_failure: self.last_failure.as_ref().map(ToString::to_string),
            application,
            receipt,
        }
    }

    fn move_to(&mut self, target: WizardStep) {
        match &mut self.state {
            WizardState::Editing { step } | WizardState::Submitting { step, .. } => *step = target,
            WizardState::Submitted { .. } => {}
        }
    }
}

/// Serializable snapshot for rendering step content and enabling controls.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub current_step: u8,
    pub step: WizardStep,
    pub step_label: &'static str,
    pub is_submitting: bool,
    pub submitted: bool,
    pub values: ApplicationDraft,
    pub messages: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<LicenseApplication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<SubmissionReceipt>,
}

/// Error raised by wizard transitions.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    #[error("application has already been submitted")]
    AlreadySubmitted,
    /// The wizard was reset while the collaborator ran. A dispatched application cannot be
    /// recalled, so an accepted one still hands back its receipt.
    #[error("submission is no longer pending")]
    StaleSubmission { receipt: Option<SubmissionReceipt> },
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
