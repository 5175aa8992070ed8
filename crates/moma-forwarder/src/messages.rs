// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message normalization and user-text extraction.

use moma_core::MomaError;
use moma_core::types::{ChatMessage, ContentPart, NormalizedMessage, Role};

/// Reduces UI messages to role plus flattened text.
///
/// Text parts are joined with `\n`; file and unknown parts are dropped.
pub fn normalize_messages(messages: &[ChatMessage]) -> Vec<NormalizedMessage> {
    messages
        .iter()
        .map(|message| NormalizedMessage {
            role: message.role,
            text: flatten_text(&message.parts),
        })
        .collect()
}

fn flatten_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns the text of the last message, which must be a user message with
/// non-empty text.
pub fn extract_user_text(messages: &[NormalizedMessage]) -> Result<&str, MomaError> {
    let last = messages
        .last()
        .ok_or_else(|| MomaError::Input("message list is empty".into()))?;
    if last.role != Role::User {
        return Err(MomaError::Input(format!(
            "last message must come from the user, got {}",
            last.role
        )));
    }
    if last.text.trim().is_empty() {
        return Err(MomaError::Input("last user message has no text content".into()));
    }
    Ok(&last.text)
}

/// Appends the policy suffix to the user's text.
pub fn agent_input(text: &str, policy_suffix: &str) -> String {
    if policy_suffix.is_empty() {
        text.to_string()
    } else {
        format!("{text} {policy_suffix}")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn normalized(role: Role, text: &str) -> NormalizedMessage {
        NormalizedMessage {
            role,
            text: text.into(),
        }
    }

    #[test]
    fn text_parts_are_joined_and_others_dropped() {
        let message = ChatMessage {
            id: None,
            role: Role::User,
            parts: vec![
                ContentPart::text("first"),
                ContentPart::File {
                    media_type: Some("application/pdf".into()),
                    filename: Some("a.pdf".into()),
                    url: None,
                },
                ContentPart::Unsupported,
                ContentPart::text("second"),
            ],
        };
        let out = normalize_messages(&[message]);
        assert_eq!(out, vec![normalized(Role::User, "first\nsecond")]);
    }

    #[test]
    fn empty_list_is_input_error() {
        assert!(matches!(extract_user_text(&[]), Err(MomaError::Input(_))));
    }

    #[test]
    fn trailing_assistant_message_is_input_error() {
        let messages = [
            normalized(Role::User, "hi"),
            normalized(Role::Assistant, "hello"),
        ];
        assert!(matches!(
            extract_user_text(&messages),
            Err(MomaError::Input(_))
        ));
    }

    #[test]
    fn text_less_user_message_is_input_error() {
        let messages = [normalized(Role::User, "  \n")];
        assert!(matches!(
            extract_user_text(&messages),
            Err(MomaError::Input(_))
        ));
    }

    #[test]
    fn agent_input_appends_suffix() {
        assert_eq!(
            agent_input(
                "What hospitals are covered?",
                "Assume that all hospitals in the knowledge base are covered."
            ),
            "What hospitals are covered? Assume that all hospitals in the knowledge base are covered."
        );
        assert_eq!(agent_input("hi", ""), "hi");
    }

    proptest! {
        #[test]
        fn extraction_depends_only_on_last_message(
            history in proptest::collection::vec(("[a-z ]{0,12}", any::<bool>()), 0..8),
            last in "[a-zA-Z?]{1,20}",
        ) {
            let mut messages: Vec<NormalizedMessage> = history
                .into_iter()
                .map(|(text, is_user)| {
                    normalized(if is_user { Role::User } else { Role::Assistant }, &text)
                })
                .collect();
            messages.push(normalized(Role::User, &last));
            prop_assert_eq!(extract_user_text(&messages).unwrap(), last.as_str());
        }
    }
}
