use std::path::PathBuf;

use thiserror::Error;

use crate::{draft::session::SessionState, CardId, PackId};

#[derive(Debug, Error)]
pub enum DraftError {
    /// Rejected session or ruleset configuration. Blocks the session start.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A pack ran out of cards before the requested draw size was reached.
    /// Reported as a warning alongside the shorter draw.
    #[error("Pack {pack} ran out of cards: drew {available} of {requested}.")]
    InsufficientPool {
        pack: PackId,
        requested: usize,
        available: usize,
    },

    /// Discard selection does not match the stage quota. No state changed.
    #[error("Quota violation: {0}")]
    QuotaViolation(String),

    /// An associated card referenced by a catalog entry does not exist. The
    /// bonus pick path is skipped for that association.
    #[error("Card {card} references unknown associated card {associated}.")]
    AssociationResolution { card: CardId, associated: CardId },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot {action} while the session is {state}.")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("Invalid pick: {0}")]
    InvalidPick(String),

    #[error("Card {0} not found in catalog.")]
    UnknownCard(CardId),

    #[error("Pack {0} not found in catalog.")]
    UnknownPack(PackId),

    #[error("Malformed deck list: {0}")]
    MalformedDeckList(String),

    #[error("Failed to decode card data: {0}")]
    Catalog(#[from] serde_json::Error),
}

impl DraftError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Warnings are reported to the caller without aborting the operation.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPool { .. } | Self::AssociationResolution { .. }
        )
    }
}
