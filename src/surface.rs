//! Display surfaces: where chat turns are shown
//!
//! The session and the stream renderer only talk to the [`DisplaySurface`]
//! trait. Embedders implement it for their own UI; [`Transcript`] keeps the
//! turns in memory and is what the terminal surface and the tests build on.

use crate::turn::{ChatTurn, Role, TurnId};

/// A chat box that turns can be rendered into
pub trait DisplaySurface {
    /// Append a new turn and return its id
    fn push_turn(&mut self, turn: ChatTurn) -> TurnId;

    /// Replace the whole text of a turn (drops any placeholder)
    fn replace_text(&mut self, id: TurnId, text: &str);

    /// Append streamed text to a turn
    fn append_text(&mut self, id: TurnId, text: &str);

    /// Replace a turn's text with `message` and render it as an error
    fn mark_error(&mut self, id: TurnId, message: &str);

    /// The response for `id` has finished streaming
    fn finish_turn(&mut self, _id: TurnId) {}
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for &mut S {
    fn push_turn(&mut self, turn: ChatTurn) -> TurnId {
        (**self).push_turn(turn)
    }

    fn replace_text(&mut self, id: TurnId, text: &str) {
        (**self).replace_text(id, text)
    }

    fn append_text(&mut self, id: TurnId, text: &str) {
        (**self).append_text(id, text)
    }

    fn mark_error(&mut self, id: TurnId, message: &str) {
        (**self).mark_error(id, message)
    }

    fn finish_turn(&mut self, id: TurnId) {
        (**self).finish_turn(id)
    }
}

/// In-memory list of the session's turns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    /// Empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns in display order
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Look up one turn
    pub fn get(&self, id: TurnId) -> Option<&ChatTurn> {
        self.turns.get(id.0)
    }

    /// Most recent turn
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been rendered yet
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns sent by the user
    pub fn outgoing(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter().filter(|t| t.role == Role::Outgoing)
    }

    fn turn_mut(&mut self, id: TurnId) -> Option<&mut ChatTurn> {
        let turn = self.turns.get_mut(id.0);
        if turn.is_none() {
            tracing::warn!(turn = id.0, "update for unknown turn ignored");
        }
        turn
    }
}

impl DisplaySurface for Transcript {
    fn push_turn(&mut self, turn: ChatTurn) -> TurnId {
        self.turns.push(turn);
        TurnId(self.turns.len() - 1)
    }

    fn replace_text(&mut self, id: TurnId, text: &str) {
        if let Some(turn) = self.turn_mut(id) {
            turn.text = text.to_string();
        }
    }

    fn append_text(&mut self, id: TurnId, text: &str) {
        if let Some(turn) = self.turn_mut(id) {
            turn.text.push_str(text);
        }
    }

    fn mark_error(&mut self, id: TurnId, message: &str) {
        if let Some(turn) = self.turn_mut(id) {
            turn.text = message.to_string();
            turn.is_error = true;
        }
    }
}
