//! Typed catalog identifiers and their URN forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::IdentifierId;

/// Prefix for identifiers minted under the Library Simplified namespace.
const SIMPLIFIED_URN_PREFIX: &str = "urn:librarysimplified.org/terms/id/";

/// Prefix for ISBN URNs.
const ISBN_URN_PREFIX: &str = "urn:isbn:";

/// Errors parsing identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Unknown identifier type: {0}")]
    UnknownType(String),

    #[error("Could not parse identifier from URN: {0}")]
    UnrecognizedUrn(String),
}

/// The vendor or standard an identifier comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierType {
    Isbn,
    Overdrive,
    Axis360,
    Bibliotheca,
    OneClick,
    Gutenberg,
    Uri,
}

impl IdentifierType {
    /// Canonical name, as used inside URNs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isbn => "ISBN",
            Self::Overdrive => "Overdrive ID",
            Self::Axis360 => "Axis 360 ID",
            Self::Bibliotheca => "Bibliotheca ID",
            Self::OneClick => "OneClick ID",
            Self::Gutenberg => "Gutenberg ID",
            Self::Uri => "URI",
        }
    }

    /// Vendor identifiers the metadata wrangler only understands by ISBN.
    pub fn needs_isbn_mapping(&self) -> bool {
        matches!(self, Self::Axis360 | Self::Bibliotheca | Self::OneClick)
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISBN" => Ok(Self::Isbn),
            "Overdrive ID" => Ok(Self::Overdrive),
            "Axis 360 ID" => Ok(Self::Axis360),
            "Bibliotheca ID" => Ok(Self::Bibliotheca),
            "OneClick ID" => Ok(Self::OneClick),
            "Gutenberg ID" => Ok(Self::Gutenberg),
            "URI" => Ok(Self::Uri),
            other => Err(IdentifierError::UnknownType(other.to_string())),
        }
    }
}

/// An opaque key for a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub id: IdentifierId,

    pub identifier_type: IdentifierType,

    pub value: String,

    /// Identifiers known to name the same item, strongest first.
    #[serde(default)]
    pub equivalents: Vec<IdentifierId>,
}

impl Identifier {
    pub fn new(id: IdentifierId, identifier_type: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            id,
            identifier_type,
            value: value.into(),
            equivalents: Vec::new(),
        }
    }

    /// URN form of this identifier.
    pub fn urn(&self) -> String {
        urn_for(self.identifier_type, &self.value)
    }
}

/// Build the URN for a (type, value) pair.
pub fn urn_for(identifier_type: IdentifierType, value: &str) -> String {
    match identifier_type {
        IdentifierType::Isbn => format!("{}{}", ISBN_URN_PREFIX, value),
        IdentifierType::Uri => value.to_string(),
        other => format!(
            "{}{}/{}",
            SIMPLIFIED_URN_PREFIX,
            urlencoding::encode(other.as_str()),
            urlencoding::encode(value)
        ),
    }
}

/// Parse a URN back into its (type, value) pair.
///
/// Anything with a URI scheme that is not one of the known URN forms is
/// treated as a plain URI.
pub fn parse_urn(urn: &str) -> Result<(IdentifierType, String), IdentifierError> {
    if let Some(isbn) = urn.strip_prefix(ISBN_URN_PREFIX) {
        if isbn.is_empty() {
            return Err(IdentifierError::UnrecognizedUrn(urn.to_string()));
        }
        return Ok((IdentifierType::Isbn, isbn.to_string()));
    }

    if let Some(rest) = urn.strip_prefix(SIMPLIFIED_URN_PREFIX) {
        let (encoded_type, encoded_value) = rest
            .split_once('/')
            .ok_or_else(|| IdentifierError::UnrecognizedUrn(urn.to_string()))?;
        let type_name = urlencoding::decode(encoded_type)
            .map_err(|_| IdentifierError::UnrecognizedUrn(urn.to_string()))?;
        let value = urlencoding::decode(encoded_value)
            .map_err(|_| IdentifierError::UnrecognizedUrn(urn.to_string()))?;
        if value.is_empty() {
            return Err(IdentifierError::UnrecognizedUrn(urn.to_string()));
        }
        return Ok((type_name.parse()?, value.into_owned()));
    }

    if urn.contains(':') && !urn.starts_with("urn:") {
        return Ok((IdentifierType::Uri, urn.to_string()));
    }

    Err(IdentifierError::UnrecognizedUrn(urn.to_string()))
}

/// Canonical form of `urn`, so differently encoded spellings of one
/// identifier compare equal. Unparseable URNs come back unchanged.
pub fn normalize_urn(urn: &str) -> String {
    match parse_urn(urn) {
        Ok((identifier_type, value)) => urn_for(identifier_type, &value),
        Err(_) => urn.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isbn_urn() {
        let identifier = Identifier::new(IdentifierId(1), IdentifierType::Isbn, "9781449372620");
        assert_eq!(identifier.urn(), "urn:isbn:9781449372620");
        assert_eq!(
            parse_urn(&identifier.urn()).unwrap(),
            (IdentifierType::Isbn, "9781449372620".to_string())
        );
    }

    #[test]
    fn test_vendor_urn_is_percent_encoded() {
        let identifier = Identifier::new(IdentifierId(2), IdentifierType::Axis360, "0003 642");
        let urn = identifier.urn();
        assert_eq!(urn, "urn:librarysimplified.org/terms/id/Axis%20360%20ID/0003%20642");
        assert_eq!(
            parse_urn(&urn).unwrap(),
            (IdentifierType::Axis360, "0003 642".to_string())
        );
    }

    #[test]
    fn test_uri_passes_through() {
        let identifier = Identifier::new(IdentifierId(3), IdentifierType::Uri, "http://example.org/book/1");
        assert_eq!(identifier.urn(), "http://example.org/book/1");
        assert_eq!(parse_urn(&identifier.urn()).unwrap().0, IdentifierType::Uri);
    }

    #[test]
    fn test_normalize_urn() {
        let canonical = Identifier::new(IdentifierId(4), IdentifierType::Overdrive, "od 4").urn();
        assert_eq!(normalize_urn("urn:librarysimplified.org/terms/id/Overdrive ID/od%204"), canonical);
        assert_eq!(normalize_urn(&canonical), canonical);
        assert_eq!(normalize_urn("not a urn"), "not a urn");
    }

    #[test]
    fn test_unknown_urns_rejected() {
        assert_eq!(
            parse_urn("urn:librarysimplified.org/terms/id/Nope/1"),
            Err(IdentifierError::UnknownType("Nope".to_string()))
        );
        assert!(parse_urn("urn:isbn:").is_err());
        assert!(parse_urn("not a urn").is_err());
    }

    #[test]
    fn test_needs_isbn_mapping() {
        assert!(IdentifierType::Axis360.needs_isbn_mapping());
        assert!(IdentifierType::Bibliotheca.needs_isbn_mapping());
        assert!(IdentifierType::OneClick.needs_isbn_mapping());
        assert!(!IdentifierType::Overdrive.needs_isbn_mapping());
        assert!(!IdentifierType::Isbn.needs_isbn_mapping());
    }
}
