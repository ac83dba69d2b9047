use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::{CardId, DraftError, Res};

use super::DeckList;

const MAIN_MARKER: &str = "#main";
const EXTRA_MARKER: &str = "#extra";
const SIDE_MARKER: &str = "!side";

/// Longest file name most filesystems will accept.
const MAX_FILE_NAME: usize = 255;

/// Strip characters which aren't allowed in file names. Square brackets
/// become dashes.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '[' | ']' => Some('-'),
            '\\' | '/' | ':' | '"' | '*' | '?' | '<' | '>' | '|' => None,
            c => Some(c),
        })
        .take(MAX_FILE_NAME)
        .collect()
}

/// Reads and writes `.ydk` deck lists: a `#main` section, an `#extra` section
/// and a `!side` section, one card id per line.
pub struct DeckExporter;

impl DeckExporter {
    pub fn to_ydk(deck: &DeckList) -> String {
        let mut text = String::new();
        for (marker, cards) in [
            (MAIN_MARKER, deck.main()),
            (EXTRA_MARKER, deck.extra()),
            (SIDE_MARKER, deck.side()),
        ] {
            text.push_str(marker);
            text.push('\n');
            for card in cards {
                text.push_str(&card.to_string());
                text.push('\n');
            }
        }
        text
    }

    /// Parse a `.ydk` deck list. Blank lines and `#` comment lines other than
    /// the section markers are ignored.
    pub fn parse_ydk(name: &str, text: &str) -> Res<DeckList> {
        let mut sections: [Vec<CardId>; 3] = Default::default();
        let mut current = None;

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            match line {
                "" => continue,
                MAIN_MARKER => current = Some(0),
                EXTRA_MARKER => current = Some(1),
                SIDE_MARKER => current = Some(2),
                _ if line.starts_with('#') => continue,
                _ => {
                    let Some(section) = current else {
                        return Err(DraftError::MalformedDeckList(format!(
                            "Line {}: card id before any section marker.",
                            number + 1
                        )));
                    };
                    let Ok(id) = line.parse::<u64>() else {
                        return Err(DraftError::MalformedDeckList(format!(
                            "Line {}: invalid card id \"{line}\".",
                            number + 1
                        )));
                    };
                    sections[section].push(CardId(id));
                }
            }
        }

        let [main, extra, side] = sections;
        Ok(DeckList::new(name, main, extra, side))
    }

    /// Write the deck list to `path`. The list is written to a temporary file
    /// alongside `path` and moved into place once complete, so `path` either
    /// holds the whole deck or is left alone.
    pub fn export(deck: &DeckList, path: &Path) -> Res<()> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(Self::to_ydk(deck).as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        };

        write().map_err(|e| {
            fs::remove_file(&tmp).ok();
            DraftError::io(path, e)
        })?;

        tracing::debug!("Wrote {} to {}.", deck.name(), path.display());
        Ok(())
    }

    /// Write the deck to `<deck name>.ydk` in `dir`, returning the path.
    pub fn export_to_dir(deck: &DeckList, dir: &Path) -> Res<PathBuf> {
        let path = dir.join(format!("{}.ydk", sanitize_file_name(deck.name())));
        Self::export(deck, &path)?;
        Ok(path)
    }
}
