//! Search tokens for the `hash` query parameter of the search results page.
//!
//! The site expects a compact JSON filter with escaped non-ASCII characters,
//! encoded with URL-safe base64 (padded).

use std::io;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use serde::{Deserialize, Serialize};

use crate::{Result, BASE_URL};

/// Every filter the search form knows about. Only the name is ever set, the rest stay at
/// their "match anything" defaults. Field order is part of the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub name: String,
    pub id_expansion: String,
    pub rarity: String,
    pub color: Vec<String>,
    pub power: StatFilter,
    pub toughness: StatFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatFilter {
    pub logic: String,
    pub search: String,
}

impl Default for StatFilter {
    fn default() -> Self {
        Self {
            logic: "<=".into(),
            search: String::new(),
        }
    }
}

impl SearchFilter {
    pub fn for_name(name: &str) -> Self {
        Self {
            name: name.into(),
            id_expansion: String::new(),
            rarity: String::new(),
            color: Vec::new(),
            power: StatFilter::default(),
            toughness: StatFilter::default(),
        }
    }
}

/// Builds the search token for a card name. Identical names always give identical tokens.
pub fn query_hash(name: &str) -> String {
    let mut ser = serde_json::Serializer::with_formatter(Vec::new(), AsciiFormatter);
    SearchFilter::for_name(name)
        .serialize(&mut ser)
        .expect("serializing a struct of strings into memory can't fail");
    URL_SAFE.encode(ser.into_inner())
}

/// Recovers the filter a token was built from.
pub fn decode_query_hash(token: &str) -> Result<SearchFilter> {
    let json = URL_SAFE.decode(token)?;
    Ok(serde_json::from_slice(&json)?)
}

pub fn search_url(name: &str) -> String {
    format!("{BASE_URL}/search-results?hash={}", query_hash(name))
}

/// Compact output with every non-ASCII char and DEL written as a lowercase `\uXXXX` escape
/// (surrogate pairs above the BMP).
struct AsciiFormatter;

impl serde_json::ser::Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for ch in fragment.chars() {
            if ch.is_ascii() && ch != '\x7f' {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
