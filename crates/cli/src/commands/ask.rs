use chrono::{DateTime, Utc};
use dukaan_core::config::LoadOptions;
use dukaan_core::domain::profile::UserId;

use crate::commands::engine::run_request;
use crate::commands::CommandResult;

/// Answers a free-text question; the rendered answer becomes the envelope
/// message and the structured response its data.
pub fn run(
    options: &LoadOptions,
    user_id: u64,
    query: String,
    at: Option<DateTime<Utc>>,
) -> CommandResult {
    run_request("ask", options, at, move |engine, now| async move {
        let response =
            engine.assistant.resolve_assistant_query(UserId(user_id), &query, now).await?;
        Ok((response.message.clone(), response))
    })
}
