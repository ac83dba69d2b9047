use std::{
    fmt::{Debug, Display},
    path::{Path, PathBuf},
};

use rand::Rng;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::{
    deck::{ydk::sanitize_file_name, DeckAssembler, DeckExporter},
    BoosterOpener, CardCatalog, CardId, Draw, DraftError, PackCatalog, PackId, Res, SessionConfig,
};

use super::{
    discard::DiscardResolver,
    events::{SessionEvent, Subscribers},
    picks::{OpenedPack, PickOutcome, PickRecord, PickResolver},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum StagePhase {
    Opening,
    Picking,
    Discarding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum SessionState {
    Created,
    PackSelectionPending,
    Stage { stage: usize, phase: StagePhase },
    Completed,
    Exported,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::PackSelectionPending => write!(f, "awaiting pack selection"),
            SessionState::Stage { stage, phase } => {
                let phase = match phase {
                    StagePhase::Opening => "opening",
                    StagePhase::Picking => "picking",
                    StagePhase::Discarding => "discarding",
                };
                write!(f, "{phase} in stage {stage}")
            }
            SessionState::Completed => write!(f, "completed"),
            SessionState::Exported => write!(f, "exported"),
        }
    }
}

/// A pending card dropped at the end of a stage.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DiscardRecord {
    pub card: CardId,
    pub pack: PackId,
    pub stage: usize,
}

/// State of a single drafting run, from pack selection through to the
/// exported deck. Every transition is an explicit method call; observers
/// follow along through [`DraftSession::subscribe`].
pub struct DraftSession {
    pub(crate) id: Uuid,
    pub(crate) config: SessionConfig,
    pub(crate) state: SessionState,

    /// Packs opened so far, in order.
    pub(crate) opened: Vec<PackId>,

    /// Packs opened in the current stage.
    pub(crate) stage_opened: usize,

    pub(crate) current: Option<OpenedPack>,

    /// Picks made this stage, waiting on the discard.
    pub(crate) pending: Vec<PickRecord>,

    pub(crate) main_deck: Vec<CardId>,
    pub(crate) side_deck: Vec<CardId>,
    pub(crate) extra_deck: Vec<CardId>,
    pub(crate) discards: Vec<DiscardRecord>,

    subscribers: Subscribers,
}

impl DraftSession {
    pub fn new(config: SessionConfig) -> Res<Self> {
        config.validate()?;

        let session = Self {
            id: Uuid::new_v4(),
            config,
            state: SessionState::Created,
            opened: Vec::new(),
            stage_opened: 0,
            current: None,
            pending: Vec::new(),
            main_deck: Vec::new(),
            side_deck: Vec::new(),
            extra_deck: Vec::new(),
            discards: Vec::new(),
            subscribers: Subscribers::default(),
        };
        tracing::info!("Created session {} for deck {}.", session.id, session.config.name);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current stage, if the draft is underway.
    pub fn stage(&self) -> Option<usize> {
        match self.state {
            SessionState::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn opened_packs(&self) -> &[PackId] {
        &self.opened
    }

    /// The most recently opened pack.
    pub fn current_pack(&self) -> Option<&OpenedPack> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> &[PickRecord] {
        &self.pending
    }

    pub fn main_deck(&self) -> &[CardId] {
        &self.main_deck
    }

    pub fn side_deck(&self) -> &[CardId] {
        &self.side_deck
    }

    pub fn extra_deck(&self) -> &[CardId] {
        &self.extra_deck
    }

    pub fn discards(&self) -> &[DiscardRecord] {
        &self.discards
    }

    /// Receive every event from this point on. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        self.subscribers.subscribe()
    }

    /// Choose the packs to draft, in opening order. May be repeated until the
    /// session starts.
    pub fn select_packs(&mut self, packs: Vec<PackId>) -> Res<()> {
        if !matches!(
            self.state,
            SessionState::Created | SessionState::PackSelectionPending
        ) {
            return Err(self.invalid_state("select packs"));
        }

        self.config.packs = packs;
        if self.state == SessionState::Created {
            self.transition(SessionState::PackSelectionPending);
        }
        Ok(())
    }

    /// Check the pack selection against the catalog and begin the first
    /// stage. A rejected selection can be replaced and started again.
    pub fn start<P: PackCatalog>(&mut self, packs: &P) -> Res<()> {
        if self.state != SessionState::PackSelectionPending {
            return Err(self.invalid_state("start the draft"));
        }

        self.config.validate_packs()?;
        if let Some(unknown) = self.config.packs.iter().find(|id| packs.lookup(id).is_none()) {
            return Err(DraftError::InvalidConfiguration(format!(
                "Pack {unknown} not found in catalog."
            )));
        }

        self.transition(SessionState::Stage {
            stage: 1,
            phase: StagePhase::Opening,
        });
        Ok(())
    }

    /// Open the next selected pack, drawing its candidates with `rng`. A pack
    /// which runs short still opens, with a warning.
    pub fn open_next_pack<P: PackCatalog, R: Rng>(&mut self, packs: &P, rng: &mut R) -> Res<Draw> {
        let SessionState::Stage {
            stage,
            phase: StagePhase::Opening,
        } = self.state
        else {
            return Err(self.invalid_state("open a pack"));
        };
        let Some(id) = self.config.packs.get(self.opened.len()) else {
            return Err(self.invalid_state("open a pack"));
        };
        let Some(pack) = packs.lookup(id) else {
            return Err(DraftError::UnknownPack(id.clone()));
        };

        let rules = &self.config.rules;
        let base_picks = rules.base_picks;
        let draw = BoosterOpener::new(rules.rare_slot).open_pack(pack, rules.draw_size, rng);
        tracing::debug!(
            "Session {}: opened {} ({} cards) in stage {stage}.",
            self.id,
            draw.pack,
            draw.cards.len()
        );

        let insufficient = draw.insufficient_pool();
        if let Some(e) = &insufficient {
            self.warn(e);
        }

        self.opened.push(draw.pack.clone());
        self.stage_opened += 1;
        self.current = Some(OpenedPack::new(
            draw.pack.clone(),
            stage,
            draw.cards.clone(),
            base_picks,
        ));
        self.subscribers.send(SessionEvent::PackOpened {
            pack: draw.pack.clone(),
            cards: draw.cards.clone(),
            insufficient: insufficient.is_some(),
        });

        if self.current.as_ref().is_some_and(OpenedPack::is_resolved) {
            self.finish_pack(stage);
        } else {
            self.transition(SessionState::Stage {
                stage,
                phase: StagePhase::Picking,
            });
        }
        Ok(draw)
    }

    /// Pick a single card from the open pack.
    pub fn pick<C: CardCatalog>(&mut self, catalog: &C, card: CardId) -> Res<PickOutcome> {
        let stage = self.picking_stage("pick a card")?;
        let outcome = PickResolver::new(&self.config.rules).pick(self, catalog, card)?;
        self.record_picks(stage, std::slice::from_ref(&outcome));
        Ok(outcome)
    }

    /// Pick several cards from the open pack. Nothing is picked if any one of
    /// the picks is rejected.
    pub fn resolve_picks<C: CardCatalog>(
        &mut self,
        catalog: &C,
        cards: &[CardId],
    ) -> Res<Vec<PickOutcome>> {
        let stage = self.picking_stage("pick cards")?;
        let outcomes = PickResolver::new(&self.config.rules).resolve_picks(self, catalog, cards)?;
        self.record_picks(stage, &outcomes);
        Ok(outcomes)
    }

    /// Commit the end of stage discard, keeping `main` and `side` and moving
    /// extra deck picks to the extra deck. Everything else pending is
    /// discarded. A rejected selection changes nothing.
    pub fn commit_discard(&mut self, main: &[CardId], side: &[CardId]) -> Res<()> {
        let SessionState::Stage {
            stage,
            phase: StagePhase::Discarding,
        } = self.state
        else {
            return Err(self.invalid_state("commit a discard"));
        };

        DiscardResolver::new(&self.config.rules).commit(self, main, side)?;
        tracing::info!(
            "Session {}: stage {stage} committed, main {} side {} extra {}.",
            self.id,
            self.main_deck.len(),
            self.side_deck.len(),
            self.extra_deck.len()
        );
        self.subscribers.send(SessionEvent::DiscardCommitted {
            stage,
            main: main.to_vec(),
            side: side.to_vec(),
        });

        self.stage_opened = 0;
        self.current = None;
        if stage >= self.config.rules.stages() {
            self.transition(SessionState::Completed);
            self.subscribers.send(SessionEvent::Completed);
        } else {
            self.transition(SessionState::Stage {
                stage: stage + 1,
                phase: StagePhase::Opening,
            });
        }

        self.autosave(stage);
        Ok(())
    }

    /// Export the finished deck to every configured export directory.
    pub fn export(&mut self) -> Res<Vec<PathBuf>> {
        let dirs = self.config.export_dirs.clone();
        self.export_to(&dirs)
    }

    /// Write `<deck name>.ydk` into each of `dirs`, returning the written
    /// paths.
    pub fn export_to<D: AsRef<Path>>(&mut self, dirs: &[D]) -> Res<Vec<PathBuf>> {
        let deck = DeckAssembler::assemble(self)?;
        if dirs.is_empty() {
            return Err(DraftError::InvalidConfiguration(
                "No export directories configured.".to_string(),
            ));
        }

        let paths = dirs
            .iter()
            .map(|dir| DeckExporter::export_to_dir(&deck, dir.as_ref()))
            .collect::<Res<Vec<PathBuf>>>()?;

        for path in &paths {
            tracing::info!("Session {}: exported deck to {}.", self.id, path.display());
        }
        if self.state == SessionState::Completed {
            self.transition(SessionState::Exported);
        }
        self.subscribers.send(SessionEvent::Exported {
            paths: paths.clone(),
        });
        Ok(paths)
    }

    fn picking_stage(&self, action: &'static str) -> Res<usize> {
        match self.state {
            SessionState::Stage {
                stage,
                phase: StagePhase::Picking,
            } => Ok(stage),
            _ => Err(self.invalid_state(action)),
        }
    }

    fn record_picks(&mut self, stage: usize, outcomes: &[PickOutcome]) {
        for outcome in outcomes {
            for associated in &outcome.skipped_associations {
                self.warn(&DraftError::AssociationResolution {
                    card: outcome.record.card,
                    associated: *associated,
                });
            }
            self.subscribers
                .send(SessionEvent::CardPicked(outcome.record.clone()));
        }

        if self.current.as_ref().is_some_and(OpenedPack::is_resolved) {
            self.finish_pack(stage);
        }
    }

    /// Move on from a resolved pack, to the discard once the stage's packs
    /// are all open.
    fn finish_pack(&mut self, stage: usize) {
        let phase = if self.stage_opened >= self.config.rules.packs_per_stage {
            StagePhase::Discarding
        } else {
            StagePhase::Opening
        };
        self.transition(SessionState::Stage { stage, phase });
    }

    fn autosave(&mut self, stage: usize) {
        let Some(dir) = &self.config.autosave_dir else {
            return;
        };

        let file = format!("{}_autosave_stage_{stage}.ydk", self.config.name).to_lowercase();
        let path = dir.join(sanitize_file_name(&file));
        match DeckExporter::export(&DeckAssembler::snapshot(self), &path) {
            Ok(()) => tracing::debug!("Session {}: autosaved to {}.", self.id, path.display()),
            Err(e) => self.warn(&e),
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }

        tracing::debug!("Session {}: {from} -> {to}.", self.id);
        self.state = to;
        self.subscribers.send(SessionEvent::StateChanged { from, to });
    }

    fn warn(&mut self, e: &DraftError) {
        tracing::warn!("Session {}: {e}", self.id);
        self.subscribers.send(SessionEvent::Warning {
            message: e.to_string(),
        });
    }

    fn invalid_state(&self, action: &'static str) -> DraftError {
        DraftError::InvalidState {
            action,
            state: self.state,
        }
    }
}

impl Debug for DraftSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DraftSession {{ id: {}, name: {}, state: {}, opened: {}, pending: {}, \
             main: {}, side: {}, extra: {}, subscribers: {} }}",
            self.id,
            self.config.name,
            self.state,
            self.opened.len(),
            self.pending.len(),
            self.main_deck.len(),
            self.side_deck.len(),
            self.extra_deck.len(),
            self.subscribers.len()
        )
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::{
        CardDatabase, DeckType, DraftConfig, Pack, PackDatabase, PackSlot, PackState,
        SessionEvent,
    };

    use super::*;

    pub fn init_tracing() {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
    }

    /// `count` sample packs of `size` cards each, with their cards.
    pub fn catalogs(count: usize, size: usize) -> (PackDatabase, CardDatabase) {
        let mut packs = PackDatabase::new();
        let mut cards = CardDatabase::new();
        for _ in 0..count {
            let (pack, pack_cards) = Pack::sample(size);
            packs.add(pack);
            for card in pack_cards {
                cards.add(card);
            }
        }
        (packs, cards)
    }

    /// Session over every pack in `packs`, started and ready to open.
    pub fn started_session(packs: &PackDatabase, rules: DraftConfig) -> DraftSession {
        let mut config = SessionConfig::new("Test");
        config.rules = rules;

        let mut session = DraftSession::new(config).unwrap();
        session
            .select_packs(packs.iter().map(|p| p.id().clone()).collect())
            .unwrap();
        session.start(packs).unwrap();
        session
    }

    /// Open and pick through every pack of the current stage, always taking
    /// the first candidate.
    pub fn play_stage(
        session: &mut DraftSession,
        packs: &PackDatabase,
        cards: &CardDatabase,
        rng: &mut ChaCha8Rng,
    ) {
        while let SessionState::Stage { phase, .. } = session.state() {
            match phase {
                StagePhase::Opening => {
                    let draw = session.open_next_pack(packs, rng).unwrap();
                    assert!(draw.insufficient_pool().is_none());
                }
                StagePhase::Picking => {
                    let card = session.current_pack().unwrap().candidates()[0];
                    session.pick(cards, card).unwrap();
                }
                StagePhase::Discarding => return,
            }
        }
    }

    /// A discard selection meeting the stage quotas: the first main eligible
    /// picks for the main deck, then the next main deck picks for the side.
    pub fn quota_selection(session: &DraftSession) -> (Vec<CardId>, Vec<CardId>) {
        let rules = &session.config().rules;
        let main: Vec<CardId> = session
            .pending()
            .iter()
            .filter(|r| r.main_eligible())
            .map(|r| r.card)
            .take(rules.main_per_stage)
            .collect();
        let side = session
            .pending()
            .iter()
            .filter(|r| r.deck_type == DeckType::Main && !main.contains(&r.card))
            .map(|r| r.card)
            .take(rules.side_per_stage)
            .collect();
        (main, side)
    }

    /// Small ruleset with two packs per stage and six picks per pack, so
    /// every stage pools twelve main deck picks.
    pub fn quick_rules(stages: usize) -> DraftConfig {
        DraftConfig {
            total_packs: stages * 2,
            packs_per_stage: 2,
            base_picks: 6,
            ..Default::default()
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("drafter-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_full_draft() {
        init_tracing();
        let (packs, cards) = catalogs(40, 12);
        let mut session = started_session(&packs, DraftConfig::default());
        let mut rng = SessionConfig {
            seed: Some(2024),
            ..Default::default()
        }
        .rng();

        for stage in 1..=4 {
            assert_eq!(session.stage(), Some(stage));
            play_stage(&mut session, &packs, &cards, &mut rng);
            assert_eq!(session.pending().len(), 20);
            assert!(
                session.pending().iter().filter(|r| r.main_eligible()).count() <= 10 * stage
            );

            let (main, side) = quota_selection(&session);
            session.commit_discard(&main, &side).unwrap();
            assert_eq!(session.main_deck().len(), 10 * stage);
            assert_eq!(session.side_deck().len(), 2 * stage);
            assert!(session.pending().is_empty());
        }

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(session.opened_packs().len(), 40);
        let distinct: HashSet<&PackId> = session.opened_packs().iter().collect();
        assert_eq!(distinct.len(), 40);
        assert_eq!(session.discards().len(), 4 * 20 - 48);
    }

    #[test]
    fn test_stage_one_over_cap() {
        let (packs, cards) = catalogs(40, 12);
        let mut session = started_session(&packs, DraftConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        play_stage(&mut session, &packs, &cards, &mut rng);

        // Twenty picks against a cap of ten.
        let over_cap: Vec<&PickRecord> = session.pending().iter().filter(|r| r.over_cap).collect();
        assert_eq!(over_cap.len(), 10);

        let (mut main, side) = quota_selection(&session);
        main[0] = over_cap[5].card;
        assert!(matches!(
            session.commit_discard(&main, &side),
            Err(DraftError::QuotaViolation(_))
        ));
    }

    #[test]
    fn test_eleven_main_rejected() {
        let (packs, cards) = catalogs(40, 12);
        let mut session = started_session(&packs, DraftConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        play_stage(&mut session, &packs, &cards, &mut rng);

        let (mut main, side) = quota_selection(&session);
        let extra = session
            .pending()
            .iter()
            .map(|r| r.card)
            .find(|c| !main.contains(c) && !side.contains(c))
            .unwrap();
        main.push(extra);

        let state = session.state();
        assert!(matches!(
            session.commit_discard(&main, &side),
            Err(DraftError::QuotaViolation(_))
        ));
        assert_eq!(session.state(), state);
        assert_eq!(session.pending().len(), 20);
        assert!(session.main_deck().is_empty());
        assert!(session.side_deck().is_empty());
        assert!(session.discards().is_empty());

        // The caller may retry.
        main.pop();
        session.commit_discard(&main, &side).unwrap();
        assert_eq!(session.stage(), Some(2));
    }

    #[test]
    fn test_wrong_pack_count() {
        let (packs, _) = catalogs(39, 12);
        let mut session = DraftSession::new(SessionConfig::new("Test")).unwrap();
        session
            .select_packs(packs.iter().map(|p| p.id().clone()).collect())
            .unwrap();

        assert!(matches!(
            session.start(&packs),
            Err(DraftError::InvalidConfiguration(_))
        ));
        assert_eq!(session.state(), SessionState::PackSelectionPending);
    }

    #[test]
    fn test_unknown_pack_rejected() {
        let (packs, _) = catalogs(2, 12);
        let mut session = DraftSession::new(SessionConfig {
            name: "Test".to_string(),
            rules: quick_rules(1),
            ..Default::default()
        })
        .unwrap();

        let first = packs.iter().next().unwrap().id().clone();
        session
            .select_packs(vec![first.clone(), PackId::from("NOPE")])
            .unwrap();
        assert!(matches!(
            session.start(&packs),
            Err(DraftError::InvalidConfiguration(_))
        ));

        session.select_packs(vec![first.clone(), first]).unwrap();
        assert!(session.start(&packs).is_err());
        assert_eq!(session.state(), SessionState::PackSelectionPending);
    }

    #[test]
    fn test_invalid_state() {
        let (packs, cards) = catalogs(2, 12);
        let mut session = DraftSession::new(SessionConfig::new("Test")).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(matches!(
            session.open_next_pack(&packs, &mut rng),
            Err(DraftError::InvalidState {
                state: SessionState::Created,
                ..
            })
        ));
        assert!(session.start(&packs).is_err());
        assert!(session.pick(&cards, CardId(1)).is_err());
        assert!(session.commit_discard(&[], &[]).is_err());
        assert!(session.export().is_err());
        assert_eq!(session.state(), SessionState::Created);

        let mut session = started_session(&packs, quick_rules(1));
        assert!(session.select_packs(Vec::new()).is_err());
        assert!(session.commit_discard(&[], &[]).is_err());
    }

    #[test]
    fn test_next_pack_waits_for_picks() {
        let (packs, cards) = catalogs(2, 12);
        let mut session = started_session(&packs, quick_rules(1));
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        session.open_next_pack(&packs, &mut rng).unwrap();
        assert!(session.open_next_pack(&packs, &mut rng).is_err());
        assert_eq!(session.opened_packs().len(), 1);

        let candidates = session.current_pack().unwrap().candidates().to_vec();
        let outcomes = session.resolve_picks(&cards, &candidates[..6]).unwrap();
        assert_eq!(outcomes.last().unwrap().state, PackState::PackResolved);
        assert_eq!(
            session.state(),
            SessionState::Stage {
                stage: 1,
                phase: StagePhase::Opening
            }
        );
    }

    #[test]
    fn test_unknown_association_warns_once() {
        let card = crate::Card::sample(DeckType::Main).with_associated([CardId(1)]);
        let other = crate::Card::sample(DeckType::Main);
        let pack = Pack::new(PackId::from("ASC"), "Associations")
            .with_slots([PackSlot::new(card.id()), PackSlot::new(other.id())]);
        let id = card.id();
        let cards: CardDatabase = [card, other].into_iter().collect();
        let packs: PackDatabase = [pack].into_iter().collect();

        let mut session = started_session(
            &packs,
            DraftConfig {
                total_packs: 1,
                packs_per_stage: 1,
                ..Default::default()
            },
        );
        let mut events = session.subscribe();
        session
            .open_next_pack(&packs, &mut ChaCha8Rng::seed_from_u64(2))
            .unwrap();
        session.pick(&cards, id).unwrap();

        let mut warnings = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Warning { message } = event {
                warnings.push(message);
            }
        }
        // The two card pack also warns about running short.
        let associations: Vec<&String> = warnings
            .iter()
            .filter(|m| m.contains("unknown associated card 1"))
            .collect();
        assert_eq!(associations.len(), 1);
    }

    #[test]
    fn test_short_pack_warns() {
        let (packs, cards) = catalogs(2, 4);
        let mut session = started_session(&packs, quick_rules(1));
        let mut events = session.subscribe();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let draw = session.open_next_pack(&packs, &mut rng).unwrap();
        assert_eq!(draw.cards.len(), 4);
        let candidates = session.current_pack().unwrap().candidates().to_vec();

        // Running out of candidates resolves the pack.
        session.resolve_picks(&cards, &candidates).unwrap();
        assert!(session.current_pack().unwrap().is_resolved());

        let mut warned = false;
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Warning { message } = event {
                assert!(message.contains("ran out of cards"));
                warned = true;
            }
        }
        assert!(warned);
    }

    #[test]
    fn test_events() {
        let (packs, cards) = catalogs(2, 12);
        let mut session = DraftSession::new(SessionConfig {
            name: "Test".to_string(),
            rules: quick_rules(1),
            ..Default::default()
        })
        .unwrap();
        let mut events = session.subscribe();

        session
            .select_packs(packs.iter().map(|p| p.id().clone()).collect())
            .unwrap();
        session.start(&packs).unwrap();
        play_stage(&mut session, &packs, &cards, &mut ChaCha8Rng::seed_from_u64(8));
        let (main, side) = quota_selection(&session);
        session.commit_discard(&main, &side).unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }

        assert_eq!(
            received[0],
            SessionEvent::StateChanged {
                from: SessionState::Created,
                to: SessionState::PackSelectionPending
            }
        );
        let opened = received
            .iter()
            .filter(|e| matches!(e, SessionEvent::PackOpened { .. }))
            .count();
        let picked = received
            .iter()
            .filter(|e| matches!(e, SessionEvent::CardPicked(_)))
            .count();
        assert_eq!(opened, 2);
        assert_eq!(picked, 12);
        assert!(received.contains(&SessionEvent::DiscardCommitted {
            stage: 1,
            main: main.clone(),
            side: side.clone()
        }));
        assert_eq!(received.last(), Some(&SessionEvent::Completed));
    }

    #[test]
    fn test_autosave_and_export() {
        init_tracing();
        let (packs, cards) = catalogs(4, 12);
        let dir = temp_dir();
        let mut session = DraftSession::new(SessionConfig {
            name: "Dragon Deck".to_string(),
            autosave_dir: Some(dir.clone()),
            export_dirs: vec![dir.clone()],
            rules: quick_rules(2),
            ..Default::default()
        })
        .unwrap();
        session
            .select_packs(packs.iter().map(|p| p.id().clone()).collect())
            .unwrap();
        session.start(&packs).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..2 {
            play_stage(&mut session, &packs, &cards, &mut rng);
            let (main, side) = quota_selection(&session);
            session.commit_discard(&main, &side).unwrap();
        }
        assert!(dir.join("dragon deck_autosave_stage_1.ydk").exists());
        assert!(dir.join("dragon deck_autosave_stage_2.ydk").exists());
        assert_eq!(session.state(), SessionState::Completed);

        let paths = session.export().unwrap();
        assert_eq!(paths, vec![dir.join("Dragon Deck.ydk")]);
        assert_eq!(session.state(), SessionState::Exported);

        let text = std::fs::read_to_string(&paths[0]).unwrap();
        let deck = DeckExporter::parse_ydk("Dragon Deck", &text).unwrap();
        assert_eq!(deck.main(), session.main_deck());
        assert_eq!(deck.side(), session.side_deck());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_failed_export_keeps_state() {
        let (packs, cards) = catalogs(2, 12);
        let mut session = started_session(&packs, quick_rules(1));
        play_stage(&mut session, &packs, &cards, &mut ChaCha8Rng::seed_from_u64(5));
        let (main, side) = quota_selection(&session);
        session.commit_discard(&main, &side).unwrap();

        assert!(matches!(
            session.export(),
            Err(DraftError::InvalidConfiguration(_))
        ));

        let missing = std::env::temp_dir().join(format!("{}", Uuid::new_v4()));
        assert!(matches!(
            session.export_to(&[missing]),
            Err(DraftError::Io { .. })
        ));
        assert_eq!(session.state(), SessionState::Completed);
    }
}
