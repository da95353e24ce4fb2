//! Turning agent results into chat replies.

use relay_domain::Error;

use super::envelope::OutboundAction;

pub const EMPTY_PROMPT: &str = "Please provide a prompt.";
pub const NO_RESPONSE: &str = "The agent returned no response.";
pub const LONG_OUTPUT_NOTICE: &str = "The output is long, so it is attached as a file.";
pub const OUTPUT_FILE_NAME: &str = "agent-output.txt";

/// User-facing text for a failed prompt.
pub fn failure_text(err: &Error) -> String {
    match err {
        Error::Timeout { timeout_secs } => {
            format!("The agent did not respond within {timeout_secs:.1} seconds.")
        }
        other => format!("Error while running the agent: {other}"),
    }
}

/// Plain text reply.
pub fn notice(text: impl Into<String>, ephemeral: bool) -> OutboundAction {
    OutboundAction::SendText {
        text: text.into(),
        ephemeral,
    }
}

/// Reply carrying the agent's output: inline when it fits within `limit`
/// characters, otherwise as a file attachment.
pub fn output_action(output: &str, limit: usize, ephemeral: bool) -> OutboundAction {
    let content = output.trim();
    if content.is_empty() {
        return notice(NO_RESPONSE, ephemeral);
    }
    if content.chars().count() <= limit {
        return notice(content, ephemeral);
    }
    OutboundAction::SendFile {
        text: LONG_OUTPUT_NOTICE.to_owned(),
        file_name: OUTPUT_FILE_NAME.to_owned(),
        content: content.to_owned(),
        ephemeral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_sent_inline_trimmed() {
        assert_eq!(
            output_action("  done\n", 1900, false),
            OutboundAction::SendText {
                text: "done".into(),
                ephemeral: false
            }
        );
    }

    #[test]
    fn blank_output_gets_no_response_notice() {
        assert_eq!(output_action(" \n ", 1900, true).text(), NO_RESPONSE);
    }

    #[test]
    fn long_output_becomes_file() {
        let long = "x".repeat(11);
        match output_action(&long, 10, false) {
            OutboundAction::SendFile {
                text,
                file_name,
                content,
                ..
            } => {
                assert_eq!(text, LONG_OUTPUT_NOTICE);
                assert_eq!(file_name, OUTPUT_FILE_NAME);
                assert_eq!(content, long);
            }
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 10 multi-byte characters fit a limit of 10.
        let text = "é".repeat(10);
        assert!(matches!(output_action(&text, 10, false), OutboundAction::SendText { .. }));
    }

    #[test]
    fn failure_texts() {
        assert_eq!(
            failure_text(&Error::Timeout { timeout_secs: 120.0 }),
            "The agent did not respond within 120.0 seconds."
        );
        assert_eq!(
            failure_text(&Error::SessionClosed("abc".into())),
            "Error while running the agent: session closed: abc"
        );
    }
}
