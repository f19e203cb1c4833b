//! Inbound message interpretation.
//!
//! Upstream webhook payloads have accumulated several shapes over time (flat
//! fields, `data`-nested fields, and a structured business-messaging
//! envelope). This module reduces any of them to an [`InboundMessage`] through
//! ordered lists of extraction strategies; the first strategy that yields a
//! value wins.

use serde_json::Value;

/// Accept/decline decision carried by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The player accepts the invitation.
    Yes,
    /// The player declines the invitation.
    No,
}

/// Normalized inbound message derived from a webhook payload. Ephemeral; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender phone as extracted (normalization happens at player lookup).
    pub sender_phone: String,
    /// Classified decision, when the reply maps to one.
    pub decision: Option<Decision>,
    /// Raw message text, empty when the reply was button-only.
    pub raw_text: String,
    /// Button or interactive reply id, when present.
    pub button_id: Option<String>,
}

/// Result of interpreting one webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretOutcome {
    /// A player message was normalized successfully.
    Message(InboundMessage),
    /// The message was sent by the system itself; acknowledged, never actioned.
    OwnMessage,
    /// A non-message event type; acknowledged and ignored.
    IgnoredEvent(String),
    /// No sender phone could be resolved from any known shape.
    MissingSender,
    /// Neither message text nor a button id was present.
    MissingContent,
}

/// Button ids produced by the current interactive message format.
pub const BUTTON_CONFIRM_YES: &str = "CONFIRM_YES";
/// Decline counterpart of [`BUTTON_CONFIRM_YES`].
pub const BUTTON_CONFIRM_NO: &str = "CONFIRM_NO";

const YES_KEYWORDS: &[&str] = &[
    "YES", "Y", "SI", "OK", "CONFIRM", "ACCEPT", "نعم", "ايوه", "اكيد", "موافق", "تمام", "✅",
];
const NO_KEYWORDS: &[&str] = &[
    "NO", "N", "DECLINE", "REJECT", "CANCEL", "لا", "اعتذر", "مرفوض", "الغاء", "❌",
];

/// Interpret a raw webhook payload into a normalized outcome.
pub fn interpret(payload: &Value) -> InterpretOutcome {
    if is_own_message(payload) {
        return InterpretOutcome::OwnMessage;
    }

    if let Some(event) = non_message_event(payload) {
        return InterpretOutcome::IgnoredEvent(event);
    }

    let Some(sender_phone) = extract_phone(payload) else {
        return InterpretOutcome::MissingSender;
    };

    let text = extract_text(payload);
    let button_id = extract_button_id(payload);

    if text.is_none() && button_id.is_none() {
        return InterpretOutcome::MissingContent;
    }

    let decision = button_id
        .as_deref()
        .and_then(map_button_decision)
        .or_else(|| text.as_deref().and_then(classify_text));

    InterpretOutcome::Message(InboundMessage {
        sender_phone,
        decision,
        raw_text: text.unwrap_or_default(),
        button_id,
    })
}

/// Extract the sender phone number, trying the historical payload shapes in
/// order: chat-id (`<digits>@<domain>`), flat field names, then `data.from`.
pub fn extract_phone(payload: &Value) -> Option<String> {
    let strategies: &[fn(&Value) -> Option<String>] = &[
        phone_from_chat_id,
        phone_from_flat_fields,
        phone_from_nested_data,
    ];

    strategies.iter().find_map(|strategy| strategy(payload))
}

fn phone_from_chat_id(payload: &Value) -> Option<String> {
    ["chat_id", "chatId"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .or_else(|| {
            payload
                .get("data")
                .and_then(|data| data.get("chat_id"))
                .and_then(Value::as_str)
        })
        .and_then(digits_before_at)
}

fn phone_from_flat_fields(payload: &Value) -> Option<String> {
    ["from", "phone", "phone_number", "sender", "wa_id"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .and_then(clean_phone_value)
}

fn phone_from_nested_data(payload: &Value) -> Option<String> {
    payload
        .get("data")
        .and_then(|data| data.get("from"))
        .and_then(Value::as_str)
        .and_then(clean_phone_value)
}

/// `<digits>@<domain>` chat ids carry the phone before the `@`.
fn digits_before_at(value: &str) -> Option<String> {
    let (prefix, _domain) = value.split_once('@')?;
    let digits: String = prefix.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

fn clean_phone_value(value: &str) -> Option<String> {
    // Some providers put a chat-id into `from`; tolerate both.
    if value.contains('@') {
        return digits_before_at(value);
    }
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Extract the message body, trying flat fields, `data`-nested fields, and the
/// business-messaging envelope in order.
pub fn extract_text(payload: &Value) -> Option<String> {
    let strategies: &[fn(&Value) -> Option<String>] =
        &[text_from_flat_fields, text_from_nested_data, text_from_business_envelope];

    strategies.iter().find_map(|strategy| strategy(payload))
}

fn text_from_flat_fields(payload: &Value) -> Option<String> {
    ["body", "text", "message", "caption"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .and_then(non_empty)
}

fn text_from_nested_data(payload: &Value) -> Option<String> {
    let data = payload.get("data")?;
    ["body", "text", "message"]
        .iter()
        .find_map(|key| data.get(key).and_then(Value::as_str))
        .and_then(non_empty)
}

fn text_from_business_envelope(payload: &Value) -> Option<String> {
    business_message(payload)?
        .get("text")
        .and_then(|text| text.get("body"))
        .and_then(Value::as_str)
        .and_then(non_empty)
}

/// Extract a button or interactive reply id, trying flat fields, `data`-nested
/// fields, interactive shapes, and the business-messaging envelope in order.
pub fn extract_button_id(payload: &Value) -> Option<String> {
    let strategies: &[fn(&Value) -> Option<String>] = &[
        button_from_flat_fields,
        button_from_nested_data,
        button_from_interactive,
        button_from_business_envelope,
    ];

    strategies.iter().find_map(|strategy| strategy(payload))
}

fn button_from_flat_fields(payload: &Value) -> Option<String> {
    ["button_id", "buttonId"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .and_then(non_empty)
}

fn button_from_nested_data(payload: &Value) -> Option<String> {
    let data = payload.get("data")?;
    ["button_id", "buttonId"]
        .iter()
        .find_map(|key| data.get(key).and_then(Value::as_str))
        .and_then(non_empty)
}

fn button_from_interactive(payload: &Value) -> Option<String> {
    [payload, payload.get("data").unwrap_or(&Value::Null)]
        .iter()
        .find_map(|root| {
            let interactive = root.get("interactive")?;
            interactive
                .get("button_reply")
                .and_then(|reply| reply.get("id"))
                .and_then(Value::as_str)
                .or_else(|| interactive.get("id").and_then(Value::as_str))
                .and_then(non_empty)
        })
}

fn button_from_business_envelope(payload: &Value) -> Option<String> {
    let message = business_message(payload)?;
    message
        .get("interactive")
        .and_then(|interactive| {
            interactive
                .get("button_reply")
                .and_then(|reply| reply.get("id"))
                .or_else(|| interactive.get("id"))
        })
        .and_then(Value::as_str)
        .or_else(|| {
            message
                .get("button")
                .and_then(|button| button.get("payload"))
                .and_then(Value::as_str)
        })
        .and_then(non_empty)
}

/// Deep path into the structured business-messaging envelope:
/// `entry[0].changes[0].value.messages[0]`.
fn business_message(payload: &Value) -> Option<&Value> {
    payload
        .get("entry")?
        .get(0)?
        .get("changes")?
        .get(0)?
        .get("value")?
        .get("messages")?
        .get(0)
}

/// Map a button id to a decision. `CONFIRM_YES`/`CONFIRM_NO` are the current
/// format; ids carrying `yes_`/`no_` survive from the legacy format where the
/// invitation id was appended to the prefix.
pub fn map_button_decision(button_id: &str) -> Option<Decision> {
    if button_id == BUTTON_CONFIRM_YES {
        return Some(Decision::Yes);
    }
    if button_id == BUTTON_CONFIRM_NO {
        return Some(Decision::No);
    }
    if button_id.contains("yes_") {
        return Some(Decision::Yes);
    }
    if button_id.contains("no_") {
        return Some(Decision::No);
    }
    None
}

/// Classify free text into a decision using a deliberately permissive keyword
/// matcher tuned for terse chat replies.
///
/// The YES set is checked before the NO set, so text containing both tokens
/// classifies YES. This precedence is intentional and pinned by tests.
pub fn classify_text(text: &str) -> Option<Decision> {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return None;
    }

    if YES_KEYWORDS
        .iter()
        .any(|keyword| matches_keyword(&normalized, keyword))
    {
        return Some(Decision::Yes);
    }
    if NO_KEYWORDS
        .iter()
        .any(|keyword| matches_keyword(&normalized, keyword))
    {
        return Some(Decision::No);
    }
    None
}

/// Trim, collapse internal whitespace, uppercase, and strip `.,!?;:`.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | '!' | '?' | ';' | ':'))
        .collect()
}

/// Containment match: exact equality, keyword-prefix followed by a space, or
/// substring. Single-character keywords only match as standalone tokens so
/// "MAYBE" does not classify via `Y`.
fn matches_keyword(text: &str, keyword: &str) -> bool {
    if text == keyword {
        return true;
    }
    let mut prefix = String::with_capacity(keyword.len() + 1);
    prefix.push_str(keyword);
    prefix.push(' ');
    if text.starts_with(&prefix) {
        return true;
    }
    keyword.chars().count() >= 2 && text.contains(keyword)
}

fn is_own_message(payload: &Value) -> bool {
    [payload, payload.get("data").unwrap_or(&Value::Null)]
        .iter()
        .any(|root| {
            root.get("fromMe")
                .or_else(|| root.get("from_me"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
}

/// Return the event name when the payload announces something other than a
/// received message.
fn non_message_event(payload: &Value) -> Option<String> {
    let event = ["event", "event_type"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))?;

    match event {
        "message" | "message_received" | "messages.received" => None,
        other => Some(other.to_owned()),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
