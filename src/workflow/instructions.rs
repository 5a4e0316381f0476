//! Instruction texts sent as `input_as_text`, one per stage.

/// Identify stage instruction.
pub const IDENTIFY_INSTRUCTION: &str = "Identify breaks between nbim and custody files";

/// Base Fix stage instruction; raw file texts are appended below it.
pub const FIX_INSTRUCTION: &str = "can u fix the breaks based on the breaks provided below? \
the original csv files are also provided as context";

/// Report stage instruction.
pub const REPORT_INSTRUCTION: &str = "Generate a reconciliation report based on the current state";

/// Build the Fix instruction, framing each available raw text between
/// start/end markers. NBIM always precedes custody; empty texts are skipped.
pub fn build_fix_instruction(nbim_text: Option<&str>, custody_text: Option<&str>) -> String {
    let mut text = FIX_INSTRUCTION.to_string();

    if let Some(nbim) = nbim_text.filter(|t| !t.is_empty()) {
        text.push_str(&frame("NBIM CSV", nbim));
    }
    if let Some(custody) = custody_text.filter(|t| !t.is_empty()) {
        text.push_str(&frame("CUSTODY CSV", custody));
    }
    text
}

fn frame(label: &str, body: &str) -> String {
    format!("\n\n--- {label} START ---\n{body}\n--- {label} END ---\n")
}
