use std::collections::HashSet;

use crate::{CardId, DeckType, DraftConfig, DraftError, Res};

use super::session::{DiscardRecord, DraftSession, SessionState, StagePhase};

/// Enforces the end of stage discard-down. Only the session drives it, so the
/// stage transition always follows a commit.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DiscardResolver {
    main_per_stage: usize,
    side_per_stage: usize,
}

impl DiscardResolver {
    pub fn new(config: &DraftConfig) -> Self {
        Self {
            main_per_stage: config.main_per_stage,
            side_per_stage: config.side_per_stage,
        }
    }

    /// Partition the session's pending pool. `main` and `side` must meet the
    /// stage quotas exactly and be drawn from the pending main deck picks,
    /// with no card in both or twice in either. Over cap picks can't go to
    /// the main deck. Extra deck picks all move to the extra deck and the
    /// remainder is discarded.
    ///
    /// The selection is fully checked before anything moves, so a
    /// `QuotaViolation` leaves the session as it was. Only valid once every
    /// pack of the stage is resolved.
    pub fn commit(&self, session: &mut DraftSession, main: &[CardId], side: &[CardId]) -> Res<()> {
        let SessionState::Stage {
            stage,
            phase: StagePhase::Discarding,
        } = session.state()
        else {
            return Err(DraftError::InvalidState {
                action: "commit a discard",
                state: session.state(),
            });
        };

        if main.len() != self.main_per_stage {
            return Err(DraftError::QuotaViolation(format!(
                "Selected {} main deck cards, {} required.",
                main.len(),
                self.main_per_stage
            )));
        }
        if side.len() != self.side_per_stage {
            return Err(DraftError::QuotaViolation(format!(
                "Selected {} side deck cards, {} required.",
                side.len(),
                self.side_per_stage
            )));
        }

        let mut seen = HashSet::new();
        if let Some(card) = main.iter().chain(side).find(|c| !seen.insert(**c)) {
            return Err(DraftError::QuotaViolation(format!(
                "Card {card} selected more than once."
            )));
        }

        let mut taken = vec![false; session.pending.len()];
        let mut assign = |card: CardId, to_main: bool| -> Res<usize> {
            let found = session.pending.iter().enumerate().position(|(i, r)| {
                !taken[i] && r.card == card && (!to_main || !r.over_cap)
            });
            let Some(index) = found else {
                let deck = if to_main { "main" } else { "side" };
                return Err(DraftError::QuotaViolation(format!(
                    "Card {card} is not available for the {deck} deck this stage."
                )));
            };
            if session.pending[index].deck_type == DeckType::Extra {
                return Err(DraftError::QuotaViolation(format!(
                    "Card {card} belongs in the extra deck."
                )));
            }

            taken[index] = true;
            Ok(index)
        };

        let main_slots = main
            .iter()
            .map(|c| assign(*c, true))
            .collect::<Res<Vec<usize>>>()?;
        let side_slots = side
            .iter()
            .map(|c| assign(*c, false))
            .collect::<Res<Vec<usize>>>()?;

        // Checks passed, nothing below can fail.
        let pending = std::mem::take(&mut session.pending);
        session.main_deck.extend(main_slots.iter().map(|&i| pending[i].card));
        session.side_deck.extend(side_slots.iter().map(|&i| pending[i].card));

        let kept: HashSet<usize> = main_slots.into_iter().chain(side_slots).collect();
        for (i, record) in pending.into_iter().enumerate() {
            if kept.contains(&i) {
                continue;
            }

            if record.deck_type == DeckType::Extra {
                session.extra_deck.push(record.card);
            } else {
                session.discards.push(DiscardRecord {
                    card: record.card,
                    pack: record.pack,
                    stage,
                });
            }
        }

        tracing::debug!(
            "Discard for stage {stage} committed, {} cards discarded in total.",
            session.discards.len()
        );
        Ok(())
    }
}
