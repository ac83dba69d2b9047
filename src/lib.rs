//! Booster draft rule engine.
//!
//! A [`DraftSession`] walks a player through a staged booster draft: packs are
//! opened with an injected random source, picks are resolved against a base
//! quota plus bonus picks unlocked by associated cards, and each stage ends
//! with a discard-down into the main, side and extra decks. The finished deck
//! is exported as a `.ydk` deck list.
//!
//! Card and pack metadata come from read-only catalogs ([`CardCatalog`],
//! [`PackCatalog`]). The [`cards::ygoprodeck`] module builds in-memory
//! catalogs from a YGOPRODeck card dump.

pub mod cards;
pub mod deck;
pub mod draft;
mod error;

pub use cards::{Card, CardCatalog, CardDatabase, CardId, Category, DeckType, Rarity};
pub use deck::{DeckAssembler, DeckExporter, DeckList};
pub use draft::{
    events::SessionEvent,
    packs::{BoosterOpener, Draw, Pack, PackCatalog, PackDatabase, PackId, PackSlot},
    picks::{OpenedPack, PackState, PickOutcome, PickRecord},
    session::{DiscardRecord, DraftSession, SessionState, StagePhase},
    DraftConfig, SessionConfig,
};
pub use error::DraftError;

pub type Res<T> = Result<T, DraftError>;
