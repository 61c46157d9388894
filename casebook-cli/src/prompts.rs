use anyhow::Result;
use inquire::{Select, Text};

use casebook_core::{SubmissionKind, SubmissionRequest};

/// Prompts the user for a generation request
pub fn prompt_submission() -> Result<SubmissionRequest> {
    let os = Text::new("OS:").prompt()?;
    let ticket_id = Text::new("Ticket ID:").prompt()?;
    let module = Text::new("Module:").prompt()?;
    let summary = Text::new("Summary:").prompt()?;

    // Use the Editor type for multiline input
    let ac = inquire::Editor::new("Acceptance Criteria:").prompt()?;

    let kind = Select::new("Type:", SubmissionKind::all().to_vec()).prompt()?;

    Ok(SubmissionRequest {
        os,
        ticket_id,
        module,
        summary,
        ac: ac.trim().to_string(),
        kind,
        ..Default::default()
    })
}
