//! The `Agent` interface `GameLogic` plays against, plus the two
//! bindings: `NetworkAgent` (a claimed `Session`) and `LocalAgent` (an
//! in-memory test double), grounded on `core/agent.py`'s `Agent` ABC and
//! `agents/network_agent.py`'s `NetworkAgent`.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::chat::ChatStream;
use super::errors::AskError;
use super::frame::{ChoiceFrame, ServerFrame};
use super::session::Session;
use super::spectator::CLIENT_LOST_TRACK;

/// An ordered view diff; opaque to the transport, meaningful only to the
/// client-side renderer.
pub type ViewDiff = serde_json::Value;

/// A failed `Ask.*` validation. Carries the message sent back to the client
/// in the resulting `error` frame.
#[derive(Debug, Clone)]
pub struct InvalidAnswer(pub String);

impl InvalidAnswer {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The interface `GameLogic` plays against. `NetworkAgent` and `LocalAgent`
/// are the two bindings; nothing in `GameLogic` depends on which one it has.
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Enqueue a message frame; returns immediately.
    fn tell(&self, message: &str);

    /// Enqueue a view-update frame.
    fn update(&self, diffs: Vec<ViewDiff>);

    fn int_choice(&self, min: Option<i64>, max: Option<i64>) -> Result<i64, AskError>;

    fn text_choice(&self, options: &[String]) -> Result<String, AskError>;

    /// Offers `slots` (by address) plus `specials`. `indices` runs parallel
    /// to `slots`; the matched slot's answer is `indices[position]`, not
    /// its position, so a caller whose addresses don't double as the
    /// identifier it actually wants (a board cell, a card id, ...) can
    /// still get that identifier back directly. Callers with no such
    /// mapping pass `0..slots.len()`.
    fn slot_choice(
        &self,
        slots: &[String],
        indices: &[usize],
        specials: &[String],
    ) -> Result<SlotAnswer, AskError>;

    /// `Tell` + `TextChoice("yes"/"no")`.
    fn boolean_choice(&self, prompt: &str) -> Result<bool, AskError> {
        self.tell(prompt);
        let yes_no = ["yes".to_string(), "no".to_string()];
        Ok(self.text_choice(&yes_no)? == "yes")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotAnswer {
    Index(usize),
    Special(String),
}

/// Binds `Agent` to a claimed, CONNECTED `Session`. All blocking operations
/// follow the same question/answer protocol: send exactly one question
/// frame, then loop on `Session::get_sync`, resending on the `"?"` sentinel
/// and retrying with an `error` frame on `InvalidAnswer`.
pub struct NetworkAgent {
    name: String,
    session: Arc<Session>,
}

impl NetworkAgent {
    pub fn new(session: Arc<Session>) -> Self {
        let name = session.username().unwrap_or_default();
        Self { name, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Opens a chat stream bound to this agent's session.
    pub fn open_chat(&self) -> Result<ChatStream, ()> {
        ChatStream::open(Arc::clone(&self.session))
    }

    fn question_with_validation<T>(
        &self,
        question: ServerFrame,
        validate: impl Fn(&str) -> Result<T, InvalidAnswer>,
    ) -> Result<T, AskError> {
        loop {
            self.session.spectator().send_sync(question.clone());
            let answer = self.session.get_sync()?;
            if answer == CLIENT_LOST_TRACK {
                continue;
            }
            match validate(&answer) {
                Ok(value) => return Ok(value),
                Err(InvalidAnswer(message)) => {
                    self.session
                        .spectator()
                        .send_sync(ServerFrame::Error { message });
                }
            }
        }
    }
}

impl Agent for NetworkAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn tell(&self, message: &str) {
        self.session.spectator().send_sync(ServerFrame::Message {
            text: message.to_string(),
            sender: None,
            highlight: None,
        });
    }

    fn update(&self, diffs: Vec<ViewDiff>) {
        let diffs = diffs
            .into_iter()
            .map(|value| super::frame::ViewDiff {
                op: super::frame::DiffOp::Replace,
                key: value
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                value: value
                    .get("newHTML")
                    .or_else(|| value.get("append"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            })
            .collect();
        self.session
            .spectator()
            .send_sync(ServerFrame::ViewUpdate(diffs));
    }

    fn int_choice(&self, min: Option<i64>, max: Option<i64>) -> Result<i64, AskError> {
        let mut schema = json!({ "type": "integer" });
        if let Some(min) = min {
            schema["minimum"] = json!(min);
        }
        if let Some(max) = max {
            schema["maximum"] = json!(max);
        }
        loop {
            self.session
                .spectator()
                .send_sync(ServerFrame::Choice(ChoiceFrame::Schema {
                    schema: schema.clone(),
                }));
            let answer = self.session.get_sync()?;
            if answer == CLIENT_LOST_TRACK {
                continue;
            }
            match answer.parse::<i64>() {
                Ok(value) if min.is_none_or(|m| value >= m) && max.is_none_or(|m| value <= m) => {
                    return Ok(value);
                }
                _ => {
                    self.session.spectator().send_sync(ServerFrame::Error {
                        message: format!("{answer:?} is not a valid choice"),
                    });
                }
            }
        }
    }

    fn text_choice(&self, options: &[String]) -> Result<String, AskError> {
        let schema = json!({ "type": "string", "enum": options });
        self.question_with_validation(
            ServerFrame::Choice(ChoiceFrame::Schema { schema }),
            |answer| {
                if options.iter().any(|opt| opt == answer) {
                    Ok(answer.to_string())
                } else {
                    Err(InvalidAnswer::new(format!("value {answer} not allowed")))
                }
            },
        )
    }

    fn slot_choice(
        &self,
        slots: &[String],
        indices: &[usize],
        specials: &[String],
    ) -> Result<SlotAnswer, AskError> {
        let question = ServerFrame::Choice(ChoiceFrame::Slots {
            slots: slots.to_vec(),
            special_options: specials.to_vec(),
        });
        self.question_with_validation(question, |answer| {
            if let Some(position) = slots.iter().position(|slot| slot == answer) {
                Ok(SlotAnswer::Index(indices[position]))
            } else if specials.iter().any(|s| s == answer) {
                Ok(SlotAnswer::Special(answer.to_string()))
            } else {
                Err(InvalidAnswer::new("Invalid choice, please try again!"))
            }
        })
    }
}

/// In-memory `Agent` used by tests; a purely scripted test double, grounded
/// on `LocalAgent`-shaped test doubles used throughout the original's test
/// suite.
pub struct LocalAgent {
    name: String,
    scripted_answers: Mutex<std::collections::VecDeque<String>>,
    told: Mutex<Vec<String>>,
    updates: Mutex<Vec<Vec<ViewDiff>>>,
}

impl LocalAgent {
    pub fn new(name: impl Into<String>, scripted_answers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            scripted_answers: Mutex::new(scripted_answers.into()),
            told: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn told_messages(&self) -> Vec<String> {
        self.told.lock().unwrap().clone()
    }

    pub fn received_updates(&self) -> Vec<Vec<ViewDiff>> {
        self.updates.lock().unwrap().clone()
    }

    fn next_answer(&self) -> String {
        self.scripted_answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("LocalAgent ran out of scripted answers")
    }
}

impl Agent for LocalAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn tell(&self, message: &str) {
        self.told.lock().unwrap().push(message.to_string());
    }

    fn update(&self, diffs: Vec<ViewDiff>) {
        self.updates.lock().unwrap().push(diffs);
    }

    fn int_choice(&self, min: Option<i64>, max: Option<i64>) -> Result<i64, AskError> {
        loop {
            let answer = self.next_answer();
            if let Ok(value) = answer.parse::<i64>()
                && min.is_none_or(|m| value >= m)
                && max.is_none_or(|m| value <= m)
            {
                return Ok(value);
            }
        }
    }

    fn text_choice(&self, options: &[String]) -> Result<String, AskError> {
        loop {
            let answer = self.next_answer();
            if options.iter().any(|opt| opt == &answer) {
                return Ok(answer);
            }
        }
    }

    fn slot_choice(
        &self,
        slots: &[String],
        indices: &[usize],
        specials: &[String],
    ) -> Result<SlotAnswer, AskError> {
        loop {
            let answer = self.next_answer();
            if let Some(position) = slots.iter().position(|slot| slot == &answer) {
                return Ok(SlotAnswer::Index(indices[position]));
            }
            if specials.iter().any(|s| s == &answer) {
                return Ok(SlotAnswer::Special(answer));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_agent_validates_int_choice_range() {
        let agent = LocalAgent::new("alice", vec!["7".to_string(), "3".to_string()]);
        assert_eq!(agent.int_choice(Some(0), Some(5)).unwrap(), 3);
    }

    #[test]
    fn local_agent_records_tell_and_update() {
        let agent = LocalAgent::new("alice", vec![]);
        agent.tell("hello");
        agent.update(vec![json!({"id": "cell-0", "newHTML": "X"})]);
        assert_eq!(agent.told_messages(), vec!["hello".to_string()]);
        assert_eq!(agent.received_updates().len(), 1);
    }

    #[test]
    fn local_agent_boolean_choice_maps_yes_no() {
        let agent = LocalAgent::new("alice", vec!["yes".to_string()]);
        assert!(agent.boolean_choice("play again?").unwrap());
    }
}
