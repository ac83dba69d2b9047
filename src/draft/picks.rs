use crate::{CardCatalog, CardId, DeckType, DraftConfig, DraftError, PackId, Res};

use super::session::{DraftSession, SessionState, StagePhase};

/// Progress through a single opened pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum PackState {
    AwaitingPick,
    Picked(usize),
    PackResolved,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PickRecord {
    pub card: CardId,
    pub pack: PackId,
    pub stage: usize,

    /// Pick made beyond the base quota of the pack.
    pub bonus: bool,

    /// Main deck card picked after the stage's main eligible pool was full.
    /// Can be sided or discarded, never committed to the main deck.
    pub over_cap: bool,

    pub deck_type: DeckType,
}

impl PickRecord {
    /// Whether this pick can be committed to the main deck.
    pub fn main_eligible(&self) -> bool {
        self.deck_type == DeckType::Main && !self.over_cap
    }
}

/// A pack which has been opened in the current stage, with the cards still
/// available to pick from it.
#[derive(Clone, Debug, serde::Serialize)]
pub struct OpenedPack {
    pack: PackId,
    stage: usize,
    candidates: Vec<CardId>,
    picked: Vec<CardId>,
    allowance: usize,
    state: PackState,
}

impl OpenedPack {
    pub(crate) fn new(
        pack: PackId,
        stage: usize,
        candidates: Vec<CardId>,
        allowance: usize,
    ) -> Self {
        let state = if candidates.is_empty() {
            PackState::PackResolved
        } else {
            PackState::AwaitingPick
        };

        Self {
            pack,
            stage,
            candidates,
            picked: Vec::new(),
            allowance,
            state,
        }
    }

    pub fn pack(&self) -> &PackId {
        &self.pack
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    /// Cards which may still be picked.
    pub fn candidates(&self) -> &[CardId] {
        &self.candidates
    }

    pub fn picked(&self) -> &[CardId] {
        &self.picked
    }

    /// Total picks allowed from this pack, base quota plus bonuses so far.
    pub fn allowance(&self) -> usize {
        self.allowance
    }

    pub fn remaining_picks(&self) -> usize {
        self.allowance.saturating_sub(self.picked.len())
    }

    pub fn state(&self) -> PackState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.state == PackState::PackResolved
    }

    fn update_state(&mut self) {
        self.state = if self.picked.len() >= self.allowance || self.candidates.is_empty() {
            PackState::PackResolved
        } else if self.picked.is_empty() {
            PackState::AwaitingPick
        } else {
            PackState::Picked(self.picked.len())
        };
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PickOutcome {
    pub record: PickRecord,

    /// Extra picks this pick added to the pack's allowance.
    pub bonus_granted: usize,

    /// Associated cards missing from the card catalog.
    pub skipped_associations: Vec<CardId>,

    pub state: PackState,
}

/// Applies picks from the open pack to the stage's pending pool. Driven by
/// the session, which moves on to the next pack once this one resolves.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PickResolver {
    base_picks: usize,
    bonus_cap: usize,
    main_per_stage: usize,
}

impl PickResolver {
    pub fn new(config: &DraftConfig) -> Self {
        Self {
            base_picks: config.base_picks,
            bonus_cap: config.bonus_cap,
            main_per_stage: config.main_per_stage,
        }
    }

    /// Pick one card from the session's open pack. Rejected picks leave the
    /// session untouched.
    pub fn pick<C: CardCatalog>(
        &self,
        session: &mut DraftSession,
        catalog: &C,
        card: CardId,
    ) -> Res<PickOutcome> {
        if !matches!(
            session.state,
            SessionState::Stage {
                phase: StagePhase::Picking,
                ..
            }
        ) {
            return Err(DraftError::InvalidState {
                action: "pick a card",
                state: session.state,
            });
        }
        let Some(opened) = session.current.as_mut() else {
            return Err(DraftError::InvalidPick("No pack is open.".to_string()));
        };
        if opened.is_resolved() {
            return Err(DraftError::InvalidPick(format!(
                "Pack {} has no picks remaining.",
                opened.pack
            )));
        }
        let Some(position) = opened.candidates.iter().position(|c| *c == card) else {
            return Err(DraftError::InvalidPick(format!(
                "Card {card} is not available in pack {}.",
                opened.pack
            )));
        };
        let Some(metadata) = catalog.lookup(card) else {
            return Err(DraftError::UnknownCard(card));
        };

        let deck_type = metadata.deck_type();
        let over_cap = deck_type == DeckType::Main && {
            let pending = session.pending.iter().filter(|r| r.main_eligible()).count();
            pending + 1 > self.main_per_stage * opened.stage
        };

        let mut associated = 0;
        let mut skipped_associations = Vec::new();
        for id in metadata.associated() {
            if catalog.lookup(*id).is_none() {
                skipped_associations.push(*id);
                continue;
            }

            let available = opened
                .candidates
                .iter()
                .enumerate()
                .any(|(i, c)| i != position && c == id);
            if available || opened.picked.contains(id) {
                associated += 1;
            }
        }
        let bonus_granted = associated.min(self.bonus_cap);

        let index = opened.picked.len();
        opened.candidates.remove(position);
        opened.picked.push(card);
        opened.allowance += bonus_granted;
        opened.update_state();

        let record = PickRecord {
            card,
            pack: opened.pack.clone(),
            stage: opened.stage,
            bonus: index >= self.base_picks,
            over_cap,
            deck_type,
        };
        tracing::debug!(
            "Picked {card} from {} (bonus: {}, over cap: {over_cap}, granted: {bonus_granted}).",
            record.pack,
            record.bonus
        );
        let state = opened.state;
        session.pending.push(record.clone());

        Ok(PickOutcome {
            record,
            bonus_granted,
            skipped_associations,
            state,
        })
    }

    /// Apply a batch of picks to the open pack. Either every pick is applied
    /// or, on the first rejected pick, none are.
    pub fn resolve_picks<C: CardCatalog>(
        &self,
        session: &mut DraftSession,
        catalog: &C,
        cards: &[CardId],
    ) -> Res<Vec<PickOutcome>> {
        let opened = session.current.clone();
        let pending = session.pending.len();

        let mut outcomes = Vec::with_capacity(cards.len());
        for card in cards {
            match self.pick(session, catalog, *card) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    session.current = opened;
                    session.pending.truncate(pending);
                    return Err(e);
                }
            }
        }

        Ok(outcomes)
    }
}
