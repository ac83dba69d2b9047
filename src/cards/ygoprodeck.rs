use std::{collections::HashMap, fs::File, io::BufReader, io::Read, path::Path};

use crate::{
    cards::{Card, CardDatabase, CardId, Category, DeckType, Rarity},
    draft::packs::{PackDatabase, PackId, PackSlot},
    DraftError, Res,
};

/// Spell associated with every fusion monster, as a fusion can't be summoned
/// without it.
const FUSION_SPELL: &str = "Polymerization";

/// Type line fragments marking a card as belonging in the extra deck.
const EXTRA_DECK_TYPES: &[&str] = &["Fusion", "Synchro", "XYZ", "Link"];

#[derive(serde::Deserialize, Debug)]
struct YgoCardSet {
    /// Full set name, e.g. "Legend of Blue Eyes White Dragon".
    set_name: String,

    /// Set code with collector number, e.g. "LOB-001".
    set_code: String,

    /// Rarity string, e.g. "Common", "Super Rare".
    #[serde(default)]
    set_rarity: String,
}

#[derive(serde::Deserialize, Debug)]
struct YgoCard {
    id: u64,
    name: String,

    /// Type line, e.g. "Effect Monster", "Fusion Monster", "Spell Card".
    #[serde(rename = "type")]
    ty: String,

    /// Card text. Associated cards are quoted by name.
    #[serde(default)]
    desc: String,

    #[serde(default)]
    card_sets: Vec<YgoCardSet>,
}

#[derive(serde::Deserialize)]
struct YgoCardInfo {
    data: Vec<YgoCard>,
}

impl YgoCard {
    fn category(&self) -> Option<Category> {
        if self.ty.contains("Spell") {
            Some(Category::Spell)
        } else if self.ty.contains("Trap") {
            Some(Category::Trap)
        } else if self.ty.contains("Monster") {
            Some(Category::Monster)
        } else {
            None // Skills and tokens are not draftable.
        }
    }

    fn deck_type(&self) -> DeckType {
        if EXTRA_DECK_TYPES.iter().any(|t| self.ty.contains(t)) {
            DeckType::Extra
        } else {
            DeckType::Main
        }
    }

    fn is_fusion(&self) -> bool {
        self.ty.contains("Fusion")
    }

    /// Names quoted in the card text, e.g. `"Blue-Eyes White Dragon" + ...`.
    fn quoted_names(&self) -> impl Iterator<Item = &str> {
        self.desc
            .split('"')
            .skip(1)
            .step_by(2)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// In-memory card and pack catalogs built from a card dump.
#[derive(Debug, Default)]
pub struct Catalog {
    pub cards: CardDatabase,
    pub packs: PackDatabase,
}

/// Decode a YGOPRODeck `cardinfo` document (`{"data": [...]}`) into card and
/// pack catalogs. Associated cards are resolved by name against the same
/// document; names that can't be resolved are dropped.
pub fn decode_catalog<R: Read>(reader: R) -> Res<Catalog> {
    let info: YgoCardInfo = serde_json::de::from_reader(reader)?;
    tracing::debug!("Decoded {} cards. Building catalog.", info.data.len());

    let draftable: Vec<(YgoCard, Category)> = info
        .data
        .into_iter()
        .filter_map(|card| card.category().map(|category| (card, category)))
        .collect();

    let name_to_id: HashMap<String, CardId> = draftable
        .iter()
        .map(|(card, _)| (card.name.to_ascii_lowercase(), CardId(card.id)))
        .collect();
    let fusion_spell = name_to_id.get(&FUSION_SPELL.to_ascii_lowercase()).copied();

    let mut catalog = Catalog::default();
    for (ygo_card, category) in &draftable {
        let mut associated = Vec::new();
        for name in ygo_card.quoted_names() {
            if name.eq_ignore_ascii_case(&ygo_card.name) {
                continue;
            }

            match name_to_id.get(&name.to_ascii_lowercase()) {
                Some(id) => associated.push(*id),
                None => tracing::warn!(
                    "Associated card \"{name}\" referenced by {} not found, skipping.",
                    ygo_card.name
                ),
            }
        }
        if ygo_card.is_fusion() {
            associated.extend(fusion_spell);
        }

        let id = CardId(ygo_card.id);
        catalog.cards.add(
            Card::new(id, &ygo_card.name, *category, ygo_card.deck_type())
                .with_associated(associated),
        );

        for set in &ygo_card.card_sets {
            let code = set.set_code.split('-').next().unwrap_or(&set.set_code);
            let pack = catalog
                .packs
                .entry(PackId::from(code), &set.set_name);
            if !pack.contains(id) {
                pack.push(PackSlot::weighted(id, Rarity::from_name(&set.set_rarity)));
            }
        }
    }

    tracing::debug!(
        "Built catalog with {} cards in {} packs.",
        catalog.cards.size(),
        catalog.packs.size()
    );
    Ok(catalog)
}

pub fn load_catalog(path: &Path) -> Res<Catalog> {
    tracing::debug!("Loading card data from {}.", path.display());
    let file = File::open(path).map_err(|e| DraftError::io(path, e))?;
    decode_catalog(BufReader::new(file))
}
