use std::{
    collections::{BTreeSet, HashMap},
    fmt::Display,
};

pub mod ygoprodeck;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Category {
    Monster,
    Spell,
    Trap,
}

/// Which deck a card is committed to. Extra deck cards never count towards
/// the main or side deck quotas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeckType {
    #[default]
    Main,
    Extra,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    SuperRare,
    UltraRare,
    Secret,
}

impl Rarity {
    /// Parse a set rarity name as printed on card set listings. Anything rarer
    /// than an ultra rare is treated as a secret.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "Common" | "Short Print" | "Super Short Print" => Rarity::Common,
            "Rare" => Rarity::Rare,
            "Super Rare" => Rarity::SuperRare,
            "Ultra Rare" => Rarity::UltraRare,
            _ => Rarity::Secret,
        }
    }

    /// Relative pull weight for a card of this rarity within a pack.
    pub fn weight(self) -> f64 {
        match self {
            Rarity::Common => 80.0,
            Rarity::Rare => 17.0,
            Rarity::SuperRare => 8.0,
            Rarity::UltraRare => 4.0,
            Rarity::Secret => 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Card {
    id: CardId,
    name: String,
    category: Category,
    deck_type: DeckType,
    associated: BTreeSet<CardId>,
}

impl Card {
    pub fn new<S: ToString>(id: CardId, name: S, category: Category, deck_type: DeckType) -> Self {
        Self {
            id,
            name: name.to_string(),
            category,
            deck_type,
            associated: BTreeSet::new(),
        }
    }

    /// Add cards which unlock a bonus pick when drafted alongside this card.
    pub fn with_associated<I: IntoIterator<Item = CardId>>(mut self, cards: I) -> Self {
        self.associated.extend(cards);
        self.associated.remove(&self.id);
        self
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn deck_type(&self) -> DeckType {
        self.deck_type
    }

    pub fn associated(&self) -> &BTreeSet<CardId> {
        &self.associated
    }

    #[cfg(test)]
    pub fn sample(deck_type: DeckType) -> Self {
        static ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1_000_000);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let category = match deck_type {
            DeckType::Main if id % 3 == 1 => Category::Spell,
            DeckType::Main if id % 3 == 2 => Category::Trap,
            _ => Category::Monster,
        };
        Self::new(CardId(id), format!("Card {id}"), category, deck_type)
    }
}

/// Read-only source of card metadata. The engine only ever reads from a
/// catalog at the moment it needs a card.
pub trait CardCatalog {
    fn lookup(&self, id: CardId) -> Option<&Card>;
}

#[derive(Clone, Debug, Default)]
pub struct CardDatabase {
    cards: HashMap<CardId, Card>,

    /// Map from lowercased card name to card id.
    name_to_id: HashMap<String, CardId>,
}

impl CardDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, card: Card) {
        self.name_to_id
            .insert(card.name.to_ascii_lowercase(), card.id);
        self.cards.insert(card.id, card);
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Card> {
        self.name_to_id
            .get(&name.trim().to_ascii_lowercase())
            .and_then(|id| self.cards.get(id))
    }

    pub fn size(&self) -> usize {
        self.cards.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }
}

impl CardCatalog for CardDatabase {
    fn lookup(&self, id: CardId) -> Option<&Card> {
        self.get(id)
    }
}

impl FromIterator<Card> for CardDatabase {
    fn from_iter<T: IntoIterator<Item = Card>>(iter: T) -> Self {
        let mut database = Self::new();
        for card in iter {
            database.add(card);
        }
        database
    }
}
