use std::{
    collections::{btree_map, BTreeMap},
    fmt::{Debug, Display},
};

use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
    Rng,
};

use crate::{
    cards::{CardId, Rarity},
    DraftError, Res,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PackId(String);

impl PackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PackSlot {
    pub card: CardId,

    /// Relative draw weight. Packs without any weights draw uniformly.
    #[serde(default)]
    pub weight: Option<f64>,

    #[serde(default)]
    pub rarity: Rarity,
}

impl PackSlot {
    pub fn new(card: CardId) -> Self {
        Self {
            card,
            weight: None,
            rarity: Rarity::Common,
        }
    }

    /// Slot weighted by the pull rate of its rarity.
    pub fn weighted(card: CardId, rarity: Rarity) -> Self {
        Self {
            card,
            weight: Some(rarity.weight()),
            rarity,
        }
    }
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct Pack {
    id: PackId,
    name: String,
    slots: Vec<PackSlot>,
}

impl Pack {
    pub fn new<S: ToString>(id: PackId, name: S) -> Self {
        Self {
            id,
            name: name.to_string(),
            slots: Vec::new(),
        }
    }

    pub fn with_slots<I: IntoIterator<Item = PackSlot>>(mut self, slots: I) -> Self {
        self.slots.extend(slots);
        self
    }

    pub fn push(&mut self, slot: PackSlot) {
        self.slots.push(slot);
    }

    pub fn id(&self) -> &PackId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[PackSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.slots.iter().any(|slot| slot.card == card)
    }

    fn is_weighted(&self) -> bool {
        self.slots.iter().any(|slot| slot.weight.is_some())
    }

    /// Pack of `size` fresh sample cards, along with the cards themselves.
    #[cfg(test)]
    pub fn sample(size: usize) -> (Self, Vec<crate::cards::Card>) {
        use crate::cards::{Card, DeckType};

        static ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(1);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let cards: Vec<Card> = (0..size).map(|_| Card::sample(DeckType::Main)).collect();
        let pack = Pack::new(PackId(format!("TST{id}")), format!("Test Pack {id}"))
            .with_slots(cards.iter().map(|c| PackSlot::new(c.id())));
        (pack, cards)
    }
}

impl Debug for Pack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pack {{ id: {}, name: {}, slots: {} }}",
            self.id,
            self.name,
            self.slots.len()
        )
    }
}

/// Read-only source of pack pools.
pub trait PackCatalog {
    fn lookup(&self, id: &PackId) -> Option<&Pack>;
}

#[derive(Clone, Debug, Default)]
pub struct PackDatabase {
    packs: BTreeMap<PackId, Pack>,
}

impl PackDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pack: Pack) {
        self.packs.insert(pack.id.clone(), pack);
    }

    /// Get the pack with this id, creating an empty one named `name` if it
    /// doesn't exist yet.
    pub fn entry(&mut self, id: PackId, name: &str) -> &mut Pack {
        match self.packs.entry(id) {
            btree_map::Entry::Occupied(entry) => entry.into_mut(),
            btree_map::Entry::Vacant(entry) => {
                let pack = Pack::new(entry.key().clone(), name);
                entry.insert(pack)
            }
        }
    }

    pub fn size(&self) -> usize {
        self.packs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pack> {
        self.packs.values()
    }

    /// Choose `count` distinct packs holding at least `min_cards` cards.
    pub fn random_selection<R: Rng>(
        &self,
        count: usize,
        min_cards: usize,
        rng: &mut R,
    ) -> Res<Vec<PackId>> {
        let mut eligible: Vec<&PackId> = self
            .packs
            .values()
            .filter(|pack| pack.len() >= min_cards)
            .map(Pack::id)
            .collect();

        if eligible.len() < count {
            return Err(DraftError::InvalidConfiguration(format!(
                "Only {} packs hold at least {min_cards} cards, {count} required.",
                eligible.len()
            )));
        }

        eligible.shuffle(rng);
        Ok(eligible.into_iter().take(count).cloned().collect())
    }
}

impl PackCatalog for PackDatabase {
    fn lookup(&self, id: &PackId) -> Option<&Pack> {
        self.packs.get(id)
    }
}

impl FromIterator<Pack> for PackDatabase {
    fn from_iter<T: IntoIterator<Item = Pack>>(iter: T) -> Self {
        let mut database = Self::new();
        for pack in iter {
            database.add(pack);
        }
        database
    }
}

/// Result of opening a pack. Holds fewer than `requested` cards when the
/// pack's pool ran out.
#[derive(Clone, Debug, PartialEq)]
pub struct Draw {
    pub pack: PackId,
    pub cards: Vec<CardId>,
    pub requested: usize,
}

impl Draw {
    pub fn insufficient_pool(&self) -> Option<DraftError> {
        (self.cards.len() < self.requested).then(|| DraftError::InsufficientPool {
            pack: self.pack.clone(),
            requested: self.requested,
            available: self.cards.len(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BoosterOpener {
    /// Draw position which is filled from the non-common cards of the pack,
    /// if it has any.
    rare_slot: Option<usize>,
}

impl BoosterOpener {
    pub fn new(rare_slot: Option<usize>) -> Self {
        Self { rare_slot }
    }

    /// Draw `draw_size` cards from the pack without replacement. Identical
    /// packs, draw sizes and generator states produce identical draws.
    pub fn open_pack<R: Rng>(&self, pack: &Pack, draw_size: usize, rng: &mut R) -> Draw {
        let weighted = pack.is_weighted();
        let mut remaining: Vec<&PackSlot> = pack.slots.iter().collect();
        let mut cards = Vec::with_capacity(draw_size.min(remaining.len()));

        for position in 0..draw_size {
            if remaining.is_empty() {
                break;
            }

            let rares_only = self.rare_slot == Some(position)
                && remaining.iter().any(|slot| slot.rarity != Rarity::Common);
            let eligible: Vec<usize> = (0..remaining.len())
                .filter(|&i| !rares_only || remaining[i].rarity != Rarity::Common)
                .collect();

            let index = choose_slot(&remaining, &eligible, weighted, rng);
            cards.push(remaining.remove(index).card);
        }

        let draw = Draw {
            pack: pack.id.clone(),
            cards,
            requested: draw_size,
        };
        tracing::debug!("Drew {} of {draw_size} from {}.", draw.cards.len(), draw.pack);
        draw
    }
}

/// Pick one of the `eligible` indices into `remaining`, by weight if the pack
/// is weighted. Falls back to a uniform choice when the weights are unusable
/// (all zero, for example).
fn choose_slot<R: Rng>(
    remaining: &[&PackSlot],
    eligible: &[usize],
    weighted: bool,
    rng: &mut R,
) -> usize {
    if weighted {
        let weights = eligible
            .iter()
            .map(|&i| remaining[i].weight.unwrap_or(1.0));
        if let Ok(distribution) = WeightedIndex::new(weights) {
            return eligible[distribution.sample(rng)];
        }
    }

    eligible[rng.gen_range(0..eligible.len())]
}
