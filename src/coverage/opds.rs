//! Reading and writing the OPDS (Atom) feeds exchanged with the wrangler.
//!
//! Only the parts the sync engine needs are read: entry ids and titles,
//! `simplified:message` entries with their status codes, and links.

use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::model::Work;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const SIMPLIFIED_NS: &str = "http://librarysimplified.org/terms/";
pub const SCHEMA_NS: &str = "http://schema.org/";
pub const OPDS_MEDIA_TYPE: &str = "application/atom+xml;profile=opds-catalog;kind=acquisition";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    #[error("Document is not an Atom feed")]
    NotAFeed,

    #[error("Entry without an id")]
    MissingId,

    #[error("Invalid status code {0:?}")]
    InvalidStatusCode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLink {
    pub rel: Option<String>,
    pub href: String,
    pub media_type: Option<String>,
}

/// An entry carrying bibliographic data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub urn: String,
    pub title: Option<String>,
    pub links: Vec<FeedLink>,
}

/// A status report about one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    /// Identifier the message is about. Feed-wide messages have none.
    pub urn: Option<String>,
    pub status_code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub entries: Vec<FeedEntry>,
    pub messages: Vec<FeedMessage>,
    /// Feed-level links.
    pub links: Vec<FeedLink>,
}

impl ParsedFeed {
    pub fn link(&self, rel: &str) -> Option<&FeedLink> {
        self.links.iter().find(|l| l.rel.as_deref() == Some(rel))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    StatusCode,
    Description,
}

#[derive(Default)]
struct Partial {
    is_message: bool,
    id: String,
    title: String,
    status_code: String,
    description: String,
    links: Vec<FeedLink>,
}

impl Partial {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Id => &mut self.id,
            Field::Title => &mut self.title,
            Field::StatusCode => &mut self.status_code,
            Field::Description => &mut self.description,
        }
    }
}

fn parse_link(element: &BytesStart<'_>) -> Result<Option<FeedLink>, FeedError> {
    let mut rel = None;
    let mut href = None;
    let mut media_type = None;
    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.local_name().as_ref() {
            b"rel" => rel = Some(value),
            b"href" => href = Some(value),
            b"type" => media_type = Some(value),
            _ => {}
        }
    }
    Ok(href.map(|href| FeedLink { rel, href, media_type }))
}

/// Parse an OPDS feed.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut saw_feed = false;
    let mut current: Option<Partial> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"feed" => saw_feed = true,
                b"entry" => current = Some(Partial::default()),
                b"message" => {
                    current = Some(Partial {
                        is_message: true,
                        ..Default::default()
                    })
                }
                b"link" => {
                    if let Some(link) = parse_link(&e)? {
                        match current.as_mut() {
                            Some(partial) => partial.links.push(link),
                            None => feed.links.push(link),
                        }
                    }
                }
                name => {
                    field = match (current.as_ref(), name) {
                        (Some(_), b"id") => Some(Field::Id),
                        (Some(p), b"title") if !p.is_message => Some(Field::Title),
                        (Some(p), b"status_code") if p.is_message => Some(Field::StatusCode),
                        (Some(p), b"description") if p.is_message => Some(Field::Description),
                        _ => None,
                    };
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(link) = parse_link(&e)? {
                        match current.as_mut() {
                            Some(partial) => partial.links.push(link),
                            None => feed.links.push(link),
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(partial), Some(f)) = (current.as_mut(), field) {
                    partial.field_mut(f).push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let (Some(partial), Some(f)) = (current.as_mut(), field) {
                    partial.field_mut(f).push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"entry" | b"message" => {
                    if let Some(partial) = current.take() {
                        finish(&mut feed, partial)?;
                    }
                    field = None;
                }
                _ => field = None,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_feed {
        return Err(FeedError::NotAFeed);
    }
    Ok(feed)
}

fn finish(feed: &mut ParsedFeed, partial: Partial) -> Result<(), FeedError> {
    let id = partial.id.trim().to_string();
    if partial.is_message {
        let code = partial.status_code.trim();
        let status_code = code
            .parse::<u16>()
            .map_err(|_| FeedError::InvalidStatusCode(code.to_string()))?;
        feed.messages.push(FeedMessage {
            urn: (!id.is_empty()).then_some(id),
            status_code,
            message: partial.description.trim().to_string(),
        });
    } else {
        if id.is_empty() {
            return Err(FeedError::MissingId);
        }
        let title = partial.title.trim();
        feed.entries.push(FeedEntry {
            urn: id,
            title: (!title.is_empty()).then(|| title.to_string()),
            links: partial.links,
        });
    }
    Ok(())
}

/// Write an OPDS feed describing `works`, each keyed by its URN.
pub fn write_metadata_feed(feed_id: &str, title: &str, works: &[(String, &Work)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<feed xmlns="{}" xmlns:simplified="{}" xmlns:schema="{}" xmlns:dcterms="http://purl.org/dc/terms/">"#,
        ATOM_NS, SIMPLIFIED_NS, SCHEMA_NS
    );
    let _ = writeln!(out, "  <id>{}</id>", escape(feed_id));
    let _ = writeln!(out, "  <title>{}</title>", escape(title));
    let _ = writeln!(out, "  <updated>{}</updated>", chrono::Utc::now().to_rfc3339());

    for (urn, work) in works {
        let _ = writeln!(out, "  <entry>");
        let _ = writeln!(out, "    <id>{}</id>", escape(urn.as_str()));
        let _ = writeln!(out, "    <title>{}</title>", escape(work.title.as_str()));
        for contribution in &work.contributions {
            if let Some(name) = contribution.contributor.key() {
                let _ = writeln!(
                    out,
                    r#"    <author><name>{}</name><simplified:role>{}</simplified:role></author>"#,
                    escape(name),
                    escape(contribution.role.as_str())
                );
            }
        }
        if let Some(language) = &work.language {
            let _ = writeln!(out, "    <dcterms:language>{}</dcterms:language>", escape(language.as_str()));
        }
        if let Some(audience) = work.audience {
            let _ = writeln!(
                out,
                r#"    <category scheme="http://schema.org/audience" term="{}" label="{}"/>"#,
                escape(audience.as_str()),
                escape(audience.as_str())
            );
        }
        if let Some(series) = &work.series {
            match work.series_position {
                Some(position) => {
                    let _ = writeln!(
                        out,
                        r#"    <schema:Series name="{}" schema:position="{}"/>"#,
                        escape(series.as_str()),
                        position
                    );
                }
                None => {
                    let _ = writeln!(out, r#"    <schema:Series name="{}"/>"#, escape(series.as_str()));
                }
            }
        }
        let _ = writeln!(out, "  </entry>");
    }
    let _ = writeln!(out, "</feed>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdentifierId, WorkId};

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:simplified="http://librarysimplified.org/terms/" xmlns:schema="http://schema.org/">
  <id>http://wrangler.example/lookup</id>
  <title>Lookup results</title>
  <link rel="next" href="http://wrangler.example/lookup?after=2"/>
  <entry>
    <id>urn:isbn:9781449372620</id>
    <title>Dive Into Python &amp; More</title>
    <link rel="http://opds-spec.org/image" href="http://covers.example/1.png"/>
  </entry>
  <simplified:message>
    <id>urn:librarysimplified.org/terms/id/Overdrive%20ID/abc</id>
    <simplified:status_code>201</simplified:status_code>
    <schema:description>Successfully registered</schema:description>
  </simplified:message>
  <simplified:message>
    <simplified:status_code>500</simplified:status_code>
    <schema:description>Feed-wide trouble</schema:description>
  </simplified:message>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let feed = parse_feed(FEED).unwrap();

        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].urn, "urn:isbn:9781449372620");
        assert_eq!(feed.entries[0].title.as_deref(), Some("Dive Into Python & More"));
        assert_eq!(feed.entries[0].links.len(), 1);

        assert_eq!(feed.messages.len(), 2);
        assert_eq!(
            feed.messages[0].urn.as_deref(),
            Some("urn:librarysimplified.org/terms/id/Overdrive%20ID/abc")
        );
        assert_eq!(feed.messages[0].status_code, 201);
        assert_eq!(feed.messages[0].message, "Successfully registered");
        assert_eq!(feed.messages[1].urn, None);

        assert_eq!(feed.link("next").unwrap().href, "http://wrangler.example/lookup?after=2");
    }

    #[test]
    fn test_not_a_feed() {
        assert!(matches!(parse_feed("<html><body/></html>"), Err(FeedError::NotAFeed)));
        assert!(parse_feed("<feed><entry><id>x</entry></feed>").is_err());
    }

    #[test]
    fn test_bad_status_code() {
        let xml = r#"<feed xmlns:simplified="http://librarysimplified.org/terms/">
            <simplified:message><id>urn:isbn:1</id><simplified:status_code>ok</simplified:status_code></simplified:message>
        </feed>"#;
        assert!(matches!(parse_feed(xml), Err(FeedError::InvalidStatusCode(code)) if code == "ok"));
    }

    #[test]
    fn test_written_feed_parses() {
        let mut work = Work::new(WorkId(1), IdentifierId(1), "Fish & Chips");
        work.language = Some("eng".to_string());
        work.series = Some("Dinners".to_string());
        work.series_position = Some(2);

        let xml = write_metadata_feed("urn:uuid:upload", "Metadata upload", &[("urn:isbn:1".to_string(), &work)]);
        let feed = parse_feed(&xml).unwrap();
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].urn, "urn:isbn:1");
        assert_eq!(feed.entries[0].title.as_deref(), Some("Fish & Chips"));
    }
}
