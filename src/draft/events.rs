use std::path::PathBuf;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{CardId, PackId};

use super::{picks::PickRecord, session::SessionState};

/// Notifications pushed to session observers, in the order things happen.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    PackOpened {
        pack: PackId,
        cards: Vec<CardId>,
        insufficient: bool,
    },
    CardPicked(PickRecord),
    Warning {
        message: String,
    },
    DiscardCommitted {
        stage: usize,
        main: Vec<CardId>,
        side: Vec<CardId>,
    },
    Completed,
    Exported {
        paths: Vec<PathBuf>,
    },
}

#[derive(Default)]
pub(crate) struct Subscribers {
    chans: Vec<UnboundedSender<SessionEvent>>,
}

impl Subscribers {
    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.chans.push(tx);
        rx
    }

    /// Send to every live subscriber, dropping those whose receiver is gone.
    pub fn send(&mut self, event: SessionEvent) {
        self.chans.retain(|chan| chan.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.chans.len()
    }
}
