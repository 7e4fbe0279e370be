pub mod ask;
pub mod config;
pub mod doctor;
pub mod engine;
pub mod migrate;
pub mod recommend;
pub mod seed;

use dukaan_core::config::{AppConfig, LoadOptions};
use dukaan_core::errors::InterfaceError;
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_SEED_VERIFICATION: u8 = 6;
pub const EXIT_BAD_REQUEST: u8 = 7;
pub const EXIT_NOT_FOUND: u8 = 8;
pub const EXIT_UNAVAILABLE: u8 = 9;
pub const EXIT_INTERNAL: u8 = 10;

/// Error class, message and exit code of a failed command step.
pub type StepError = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::outcome(
            0,
            CommandOutcome {
                command: command.to_string(),
                status: "ok".to_string(),
                error_class: None,
                message: message.into(),
                correlation_id: None,
                data: None,
            },
        )
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        correlation_id: &str,
        data: Value,
    ) -> Self {
        Self::outcome(
            0,
            CommandOutcome {
                command: command.to_string(),
                status: "ok".to_string(),
                error_class: None,
                message: message.into(),
                correlation_id: Some(correlation_id.to_string()),
                data: Some(data),
            },
        )
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::outcome(
            exit_code,
            CommandOutcome {
                command: command.to_string(),
                status: "error".to_string(),
                error_class: Some(error_class.to_string()),
                message: message.into(),
                correlation_id: None,
                data: None,
            },
        )
    }

    /// Engine failures carry the user-safe message; the detail goes to the log.
    pub fn interface_failure(command: &str, error: &InterfaceError) -> Self {
        let (error_class, exit_code) = match error {
            InterfaceError::BadRequest { .. } => ("bad_request", EXIT_BAD_REQUEST),
            InterfaceError::NotFound { .. } => ("not_found", EXIT_NOT_FOUND),
            InterfaceError::ServiceUnavailable { .. } => {
                ("service_unavailable", EXIT_UNAVAILABLE)
            }
            InterfaceError::Internal { .. } => ("internal", EXIT_INTERNAL),
        };
        let message = match error {
            InterfaceError::BadRequest { message, .. } => {
                format!("{} ({message})", error.user_message())
            }
            _ => error.user_message().to_string(),
        };
        Self::outcome(
            exit_code,
            CommandOutcome {
                command: command.to_string(),
                status: "error".to_string(),
                error_class: Some(error_class.to_string()),
                message,
                correlation_id: Some(error.correlation_id().to_string()),
                data: None,
            },
        )
    }

    pub fn step_failure(command: &str, (error_class, message, exit_code): StepError) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    fn outcome(exit_code: u8, payload: CommandOutcome) -> Self {
        Self { exit_code, output: serialize_payload(payload) }
    }
}

pub(crate) fn load_config(options: &LoadOptions) -> Result<AppConfig, StepError> {
    AppConfig::load(options.clone()).map_err(|error| {
        ("config_validation", format!("configuration issue: {error}"), EXIT_CONFIG)
    })
}

pub(crate) fn current_thread_runtime() -> Result<tokio::runtime::Runtime, StepError> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ("runtime_init", format!("failed to initialize async runtime: {error}"), EXIT_RUNTIME)
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\
             \"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
