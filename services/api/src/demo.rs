use crate::infra::{load_draft, LoggingSubmissionCollaborator};
use bingo_license::config::SubmissionConfig;
use bingo_license::error::AppError;
use bingo_license::workflows::license::{
    ApplicationSchema, Calendar, FieldErrors, LicenseApplication, WizardController, WizardError,
    WizardStep,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Application JSON file (camelCase field names)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Date used for the start-date rule (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the demo treats as today (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Simulated dispatch latency of the in-process clerk inbox, in milliseconds.
    #[arg(long, default_value_t = SubmissionConfig::DEFAULT_LATENCY_MS)]
    pub(crate) latency_ms: u64,
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let ValidateArgs { input, today } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let draft = load_draft(&input)?;

    match ApplicationSchema::standard().validate_all_as_of(&draft, today) {
        Ok(application) => {
            println!("Application in {} is valid", input.display());
            render_application(&application);
            println!("{}", serde_json::to_string_pretty(&application)?);
            Ok(())
        }
        Err(errors) => {
            println!(
                "Application in {} has {} invalid field(s) as of {}",
                input.display(),
                errors.len(),
                today
            );
            render_messages(&errors);
            Err(AppError::Validation(errors))
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, latency_ms } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let collaborator =
        LoggingSubmissionCollaborator::new(std::time::Duration::from_millis(latency_ms));
    let mut wizard = WizardController::new(Arc::new(ApplicationSchema::standard()))
        .with_calendar(Calendar::Fixed(today));

    println!("Bingo license wizard demo (today = {today})");
    render_step(&wizard);

    println!("\nAttempting to continue with an empty form");
    report_advance(&mut wizard);

    apply(&mut wizard, demo_applicant_step())?;
    println!("\nApplicant details entered");
    report_advance(&mut wizard);

    let mut terms = demo_license_terms_step(today);
    terms["sessionsPerYear"] = json!("400");
    apply(&mut wizard, terms)?;
    println!("\nLicense terms entered with 400 sessions per year");
    report_advance(&mut wizard);

    wizard.set_field("sessionsPerYear", json!("52"))?;
    println!("\nSessions corrected to 52");
    report_advance(&mut wizard);

    println!("\nSubmitting to the clerk inbox ({latency_ms} ms dispatch latency)");
    match wizard.submit(&collaborator).await {
        Ok(receipt) => {
            println!(
                "- Accepted as {} at {}",
                receipt.reference,
                receipt.received_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            if let Some(application) = wizard.view().application {
                render_application(&application);
            }
        }
        Err(WizardError::Validation(errors)) => {
            println!("- Submission blocked");
            render_messages(&errors);
        }
        Err(err) => println!("- Submission failed: {err}"),
    }

    wizard.reset();
    println!("\nWizard reset for the next applicant");
    render_step(&wizard);
    Ok(())
}

fn apply(wizard: &mut WizardController, values: Value) -> Result<(), WizardError> {
    if let Value::Object(map) = values {
        for (field, value) in map {
            wizard.set_field(&field, value)?;
        }
    }
    Ok(())
}

fn report_advance(wizard: &mut WizardController) {
    match wizard.advance() {
        Ok(step) => println!("- Advanced to step {} ({})", step.index() + 1, step.label()),
        Err(WizardError::Validation(errors)) => {
            println!("- Still on {}:", wizard.current_step().label());
            render_messages(&errors);
        }
        Err(err) => println!("- Unable to advance: {err}"),
    }
}

fn render_step(wizard: &WizardController) {
    let step = wizard.current_step();
    let total = WizardStep::ordered().len();
    println!("- Step {} of {}: {}", step.index() + 1, total, step.label());
}

fn render_messages(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        println!("    - {field}: {message}");
    }
}

fn render_application(application: &LicenseApplication) {
    println!(
        "  {} | {} | {}",
        application.display_name(),
        application.license_type.label(),
        application.municipality_name()
    );
    println!(
        "  {} sessions/year | {} to {} ({} days)",
        application.sessions_per_year,
        application.start_date,
        application.expiration_date,
        application.term_days()
    );
}

fn demo_applicant_step() -> Value {
    json!({
        "applicantName": "Eleanor Brandt",
        "entityType": "Organization",
        "organizationName": "Waynesboro Rotary Club",
        "email": "e.brandt@waynesbororotary.org",
        "phone": "(717)555-0148",
        "addressStreet": "45 West Main Street",
        "city": "Waynesboro",
        "state": "PA",
        "zip": "17268",
        "municipality": "Waynesboro",
    })
}

fn demo_license_terms_step(today: NaiveDate) -> Value {
    let start = today + Duration::days(14);
    let expiration = start + Duration::days(364);
    json!({
        "licenseType": "Charitable Bingo",
        "sessionsPerYear": 52,
        "startDate": start.format("%Y-%m-%d").to_string(),
        "expirationDate": expiration.format("%Y-%m-%d").to_string(),
        "isNonProfit": true,
        "ein": "25-1029384",
        "agreeToRules": true,
    })
}
