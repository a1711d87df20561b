//! FITS header card parsing.

use crate::block::{padded_byte_len, CARD_SIZE};
use crate::error::{Error, Result};
use crate::metadata::MetadataMap;
use crate::value::{parse_fits_value, MetadataValue};

// ── Types ──

/// A parsed FITS header card (one 80-byte keyword record).
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Trimmed keyword. `HIERARCH` keywords are flattened with `_`.
    pub keyword: String,
    /// The typed value, or the text of a commentary card.
    pub value: Option<MetadataValue>,
    /// The inline comment following ` /`.
    pub comment: Option<String>,
}

impl Card {
    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Returns `true` if this is a blank card (keyword is all spaces).
    pub fn is_blank(&self) -> bool {
        self.keyword.is_empty()
    }

    /// Returns `true` if this card carries a commentary keyword
    /// (COMMENT, HISTORY, or blank).
    pub fn is_commentary(&self) -> bool {
        is_commentary_keyword(&self.keyword)
    }
}

/// The cards of one header unit plus where its data begins.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// All cards up to and including END.
    pub cards: Vec<Card>,
    /// Block-padded header length when an END card was found.
    pub byte_len: Option<usize>,
}

impl Header {
    /// Find the first card with `keyword`.
    pub fn find(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    /// Integer value of `keyword`, accepting integral floats.
    pub fn integer(&self, keyword: &str) -> Option<i64> {
        match self.find(keyword)?.value.as_ref()? {
            MetadataValue::Int64(n) => Some(*n),
            MetadataValue::UInt64(n) => i64::try_from(*n).ok(),
            MetadataValue::Float64(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric value of `keyword` promoted to `f64`.
    pub fn float(&self, keyword: &str) -> Option<f64> {
        self.find(keyword)?.value.as_ref()?.as_f64()
    }

    /// Logical (`T`/`F`) value of `keyword`.
    pub fn logical(&self, keyword: &str) -> Option<bool> {
        self.find(keyword)?.value.as_ref()?.as_bool()
    }

    /// Quoted string value of `keyword`, trailing blanks already removed.
    pub fn string(&self, keyword: &str) -> Option<&str> {
        self.find(keyword)?.value.as_ref()?.as_str()
    }

    /// Flatten the cards into a metadata map, comments under `_Comment`.
    pub fn to_metadata(&self) -> MetadataMap {
        let mut map = MetadataMap::new();
        for card in &self.cards {
            if card.is_end() || card.is_blank() {
                continue;
            }
            let value = card
                .value
                .clone()
                .unwrap_or_else(|| MetadataValue::String(String::new()));
            map.insert_with_comment(&card.keyword, value, card.comment.clone());
        }
        map
    }
}

// ── Parsing ──

const END_KEYWORD: &[u8; 8] = b"END     ";
const HIERARCH_KEYWORD: &[u8; 8] = b"HIERARCH";

/// Keywords that never carry a value indicator.
fn is_commentary_keyword(keyword: &str) -> bool {
    matches!(keyword, "COMMENT" | "HISTORY" | "")
}

fn trimmed_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse an ESO `HIERARCH` card: `HIERARCH ESO DET DIT = 1.5 / comment`.
fn parse_hierarch(card_bytes: &[u8; CARD_SIZE]) -> Option<Card> {
    let rest = &card_bytes[8..];
    let eq = rest.iter().position(|&b| b == b'=')?;
    let name = String::from_utf8_lossy(&rest[..eq]);
    let keyword = name.split_whitespace().collect::<Vec<_>>().join("_");
    if keyword.is_empty() {
        return None;
    }
    let (value, comment) = parse_fits_value(&rest[eq + 1..]);
    Some(Card {
        keyword,
        value: Some(value),
        comment,
    })
}

/// Parse a single 80-byte FITS header card.
///
/// `index` is only used to identify the card in error messages.
pub fn parse_card(index: usize, card_bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let keyword_bytes = &card_bytes[..8];
    if !keyword_bytes.iter().all(|b| (0x20..=0x7E).contains(b)) {
        return Err(Error::structural(format!(
            "header card {index} has a non-printable keyword"
        )));
    }

    if keyword_bytes == END_KEYWORD {
        return Ok(Card {
            keyword: String::from("END"),
            value: None,
            comment: None,
        });
    }

    if keyword_bytes == HIERARCH_KEYWORD {
        if let Some(card) = parse_hierarch(card_bytes) {
            return Ok(card);
        }
    }

    let keyword = String::from_utf8_lossy(keyword_bytes).trim().to_string();

    if !is_commentary_keyword(&keyword) && &card_bytes[8..10] == b"= " {
        let (value, comment) = parse_fits_value(&card_bytes[10..]);
        return Ok(Card {
            keyword,
            value: Some(value),
            comment,
        });
    }

    // Commentary cards and value-less keywords keep their text as the value.
    let text = trimmed_text(&card_bytes[8..]).unwrap_or_default();
    Ok(Card {
        keyword,
        value: Some(MetadataValue::String(text.trim_start().to_string())),
        comment: None,
    })
}

/// Parse consecutive 80-byte cards from the start of `data` until the END
/// card or until fewer than 80 bytes remain.
///
/// A header that runs out of bytes before END is returned with
/// `byte_len == None`; its cards are still usable as metadata.
pub fn parse_header(data: &[u8]) -> Result<Header> {
    let mut cards = Vec::new();
    for (index, chunk) in data.chunks_exact(CARD_SIZE).enumerate() {
        let card_bytes: &[u8; CARD_SIZE] = chunk
            .try_into()
            .map_err(|_| Error::structural("short header card"))?;
        let card = parse_card(index, card_bytes)?;
        let is_end = card.is_end();
        cards.push(card);
        if is_end {
            let byte_len = padded_byte_len((index + 1) * CARD_SIZE);
            return Ok(Header {
                cards,
                byte_len: Some(byte_len),
            });
        }
    }
    tracing::debug!(cards = cards.len(), "header ended without END card");
    Ok(Header {
        cards,
        byte_len: None,
    })
}
