use std::fmt::Debug;

use crate::{CardId, DraftSession, Res, SessionState};

pub mod ydk;

pub use ydk::DeckExporter;

/// Final deck, split into the three deck sections in commit order.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
pub struct DeckList {
    name: String,
    main: Vec<CardId>,
    extra: Vec<CardId>,
    side: Vec<CardId>,
}

impl DeckList {
    pub fn new<S: ToString>(
        name: S,
        main: Vec<CardId>,
        extra: Vec<CardId>,
        side: Vec<CardId>,
    ) -> Self {
        Self {
            name: name.to_string(),
            main,
            extra,
            side,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn main(&self) -> &[CardId] {
        &self.main
    }

    pub fn extra(&self) -> &[CardId] {
        &self.extra
    }

    pub fn side(&self) -> &[CardId] {
        &self.side
    }
}

impl Debug for DeckList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DeckList {{ name: {}, main: {}, extra: {}, side: {} }}",
            self.name,
            self.main.len(),
            self.extra.len(),
            self.side.len()
        )
    }
}

pub struct DeckAssembler;

impl DeckAssembler {
    /// Finalized deck of a completed session.
    pub fn assemble(session: &DraftSession) -> Res<DeckList> {
        match session.state() {
            SessionState::Completed | SessionState::Exported => Ok(Self::snapshot(session)),
            state => Err(crate::DraftError::InvalidState {
                action: "assemble the deck",
                state,
            }),
        }
    }

    /// Deck as committed so far, at any point in the session.
    pub fn snapshot(session: &DraftSession) -> DeckList {
        DeckList::new(
            session.name(),
            session.main_deck().to_vec(),
            session.extra_deck().to_vec(),
            session.side_deck().to_vec(),
        )
    }
}
