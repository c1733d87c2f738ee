use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::domain::{ApplicationDraft, FieldName, LicenseApplication};
use super::schema::{ApplicationSchema, Calendar, FieldErrors};
use super::submission::{SubmissionCollaborator, SubmissionReceipt};
use super::wizard::{WizardController, WizardError, WizardView};

/// Identifier wrapper for hosted wizard sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

/// Service hosting one wizard per session and forwarding accepted applications to the
/// submission collaborator.
///
/// Sessions are only dropped by [`close`](Self::close). A submitted session keeps its receipt
/// and can still be reset for another application, so clients send `DELETE` once they are done
/// with it.
pub struct LicenseApplicationService<C> {
    schema: Arc<ApplicationSchema>,
    collaborator: Arc<C>,
    calendar: Calendar,
    sessions: Mutex<HashMap<SessionId, WizardController>>,
}

impl<C> LicenseApplicationService<C>
where
    C: SubmissionCollaborator + 'static,
{
    pub fn new(collaborator: Arc<C>) -> Self {
        Self {
            schema: Arc::new(ApplicationSchema::standard()),
            collaborator,
            calendar: Calendar::Local,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Pin "today" for every session this service opens.
    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn schema(&self) -> &ApplicationSchema {
        &self.schema
    }

    /// Start a new wizard at the first step with an empty draft.
    pub fn open(&self) -> SessionView {
        let session_id = next_session_id();
        let wizard = WizardController::new(self.schema.clone()).with_calendar(self.calendar);
        let view = SessionView::new(&session_id, &wizard);
        self.sessions().insert(session_id.clone(), wizard);
        info!(session = %session_id.0, "license application session opened");
        view
    }

    pub fn view(&self, session_id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, |_| Ok(()))
            .map(|((), view)| view)
    }

    /// Apply raw field updates. Every name is checked before any value is written.
    pub fn set_fields(
        &self,
        session_id: &SessionId,
        updates: Map<String, Value>,
    ) -> Result<SessionView, ServiceError> {
        if let Some(unknown) = updates
            .keys()
            .find(|name| name.parse::<FieldName>().is_err())
        {
            return Err(ServiceError::Wizard(WizardError::UnknownField(
                unknown.clone(),
            )));
        }

        self.with_session(session_id, |wizard| {
            for (name, value) in updates {
                wizard.set_field(&name, value)?;
            }
            Ok(())
        })
        .map(|((), view)| view)
    }

    pub fn advance(&self, session_id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, WizardController::advance)
            .map(|(_, view)| view)
    }

    pub fn retreat(&self, session_id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, |wizard| Ok(wizard.retreat()))
            .map(|(_, view)| view)
    }

    pub fn reset(&self, session_id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, |wizard| {
            wizard.reset();
            Ok(())
        })
        .map(|((), view)| view)
    }

    /// Validate and dispatch the session's application.
    ///
    /// The session lock is released while the collaborator runs, so other requests against the
    /// same session (including a second submit, which is rejected) proceed meanwhile.
    pub async fn submit(
        &self,
        session_id: &SessionId,
    ) -> Result<(SubmissionReceipt, SessionView), ServiceError> {
        let (pending, _) = self.with_session(session_id, WizardController::begin_submit)?;
        let outcome = self
            .collaborator
            .submit_record(pending.application.clone())
            .await;
        self.with_session(session_id, move |wizard| {
            wizard.complete_submit(pending, outcome)
        })
    }

    pub fn close(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        self.sessions()
            .remove(session_id)
            .map(|_| ())
            .ok_or(ServiceError::SessionNotFound)
    }

    /// Stateless whole-record validation, independent of any session.
    pub fn validate(&self, draft: &ApplicationDraft) -> Result<LicenseApplication, FieldErrors> {
        self.schema.validate_all_as_of(draft, self.calendar.today())
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, WizardController>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `operation` against a session. The view reflects the wizard after the operation,
    /// whether it succeeded or not, and is attached to validation errors.
    fn with_session<T>(
        &self,
        session_id: &SessionId,
        operation: impl FnOnce(&mut WizardController) -> Result<T, WizardError>,
    ) -> Result<(T, SessionView), ServiceError> {
        let mut sessions = self.sessions();
        let wizard = sessions
            .get_mut(session_id)
            .ok_or(ServiceError::SessionNotFound)?;
        let outcome = operation(wizard);
        let view = SessionView::new(session_id, wizard);
        match outcome {
            Ok(value) => Ok((value, view)),
            Err(WizardError::Validation(errors)) => Err(ServiceError::Invalid {
                errors,
                session: Box::new(view),
            }),
            Err(other) => Err(ServiceError::Wizard(other)),
        }
    }
}

/// Wizard snapshot tagged with its session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub wizard: WizardView,
}

impl SessionView {
    fn new(session_id: &SessionId, wizard: &WizardController) -> Self {
        Self {
            session_id: session_id.clone(),
            wizard: wizard.view(),
        }
    }
}

/// Error raised by the session service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("session not found")]
    SessionNotFound,
    #[error("validation failed: {errors}")]
    Invalid {
        errors: FieldErrors,
        session: Box<SessionView>,
    },
    #[error(transparent)]
    Wizard(#[from] WizardError),
}
