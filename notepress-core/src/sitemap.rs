//! Sitemap loading: local files or HTTP(S), optionally gzipped, with
//! sitemap indexes resolved recursively.

use crate::snapshot::LastModified;
use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_ENCODING};
use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Timeout applied to every sitemap request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Deepest chain of nested sitemap indexes that is followed.
pub const MAX_SITEMAP_DEPTH: usize = 8;

const USER_AGENT: &str = concat!("notepress/", env!("CARGO_PKG_VERSION"));
const ACCEPT_XML: &str = "application/xml,text/xml,*/*";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {location}: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decompress {location}: {source}")]
    Decompress {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML in {location}: {source}")]
    Xml {
        location: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Unsupported sitemap root element <{element}> from {location}")]
    UnsupportedRoot { element: String, location: String },

    #[error("Sitemap indexes nested deeper than {max} levels at {location}")]
    TooDeep { location: String, max: usize },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// One `<url>` of a sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub url: String,
    pub lastmod: LastModified,
}

/// Parsed body of a single sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SitemapDocument {
    /// `<sitemapindex>`: locations of nested sitemaps
    Index(Vec<String>),
    /// `<urlset>`
    UrlSet(Vec<SitemapEntry>),
}

/// Fetches and flattens sitemaps.
pub struct SitemapLoader {
    client: Client,
}

impl SitemapLoader {
    pub fn new() -> Result<Self, SitemapError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(SitemapError::Client)?;
        Ok(Self::with_client(client))
    }

    /// Use a preconfigured client (proxy, TLS or timeout settings).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Load every entry reachable from `location`, in document order.
    ///
    /// A location seen twice is skipped, so cyclic indexes terminate.
    pub fn load(&self, location: &str) -> Result<Vec<SitemapEntry>, SitemapError> {
        let mut visited = HashSet::new();
        let mut entries = Vec::new();
        self.load_into(location, 0, &mut visited, &mut entries)?;
        tracing::info!("Loaded {} sitemap entries from {}", entries.len(), location);
        Ok(entries)
    }

    fn load_into(
        &self,
        location: &str,
        depth: usize,
        visited: &mut HashSet<String>,
        entries: &mut Vec<SitemapEntry>,
    ) -> Result<(), SitemapError> {
        if depth > MAX_SITEMAP_DEPTH {
            return Err(SitemapError::TooDeep {
                location: location.to_string(),
                max: MAX_SITEMAP_DEPTH,
            });
        }
        if !visited.insert(location.to_string()) {
            tracing::warn!("Skipping already visited sitemap {}", location);
            return Ok(());
        }

        let bytes = self.read_source(location)?;
        match parse_sitemap(&bytes, location)? {
            SitemapDocument::Index(children) => {
                tracing::debug!("Sitemap index {} lists {} sitemaps", location, children.len());
                for child in children {
                    self.load_into(&child, depth + 1, visited, entries)?;
                }
            }
            SitemapDocument::UrlSet(found) => {
                tracing::debug!("Sitemap {} has {} entries", location, found.len());
                entries.extend(found);
            }
        }
        Ok(())
    }

    /// Raw (decompressed) bytes behind a location.
    fn read_source(&self, location: &str) -> Result<Vec<u8>, SitemapError> {
        let (raw, gzip_encoded) = if is_remote(location) {
            self.fetch(location)?
        } else {
            let raw = std::fs::read(location).map_err(|source| SitemapError::Io {
                path: PathBuf::from(location),
                source,
            })?;
            (raw, false)
        };

        if raw.starts_with(&GZIP_MAGIC) {
            return gunzip(&raw).map_err(|source| SitemapError::Decompress {
                location: location.to_string(),
                source,
            });
        }
        if gzip_encoded || location.ends_with(".gz") {
            // Servers often decompress transparently despite the hint.
            match gunzip(&raw) {
                Ok(bytes) => return Ok(bytes),
                Err(err) => tracing::debug!("Treating {} as plain XML: {}", location, err),
            }
        }
        Ok(raw)
    }

    fn fetch(&self, location: &str) -> Result<(Vec<u8>, bool), SitemapError> {
        let http_err = |source| SitemapError::Http {
            location: location.to_string(),
            source,
        };

        tracing::debug!("GET {}", location);
        let response = self
            .client
            .get(location)
            .header(ACCEPT, ACCEPT_XML)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;

        let gzip_encoded = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));
        let body = response.bytes().map_err(http_err)?;
        Ok((body.to_vec(), gzip_encoded))
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn gunzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(raw).read_to_end(&mut out)?;
    Ok(out)
}

/// Parse one sitemap document. Element names are compared by local name,
/// so namespace prefixes do not matter.
pub(crate) fn parse_sitemap(bytes: &[u8], location: &str) -> Result<SitemapDocument, SitemapError> {
    let xml_err = |source: quick_xml::Error| SitemapError::Xml {
        location: location.to_string(),
        source,
    };

    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut document: Option<SitemapDocument> = None;
    let mut loc: Option<String> = None;
    let mut lastmod: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_err)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if document.is_none() {
                    document = Some(empty_document(&name, location)?);
                }
                if stack.len() == 1 {
                    loc = None;
                    lastmod = None;
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if document.is_none() {
                    let name = e.local_name().as_ref().to_vec();
                    document = Some(empty_document(&name, location)?);
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| xml_err(quick_xml::Error::from(e)))?;
                record_text(&stack, &text, &mut loc, &mut lastmod);
            }
            Event::CData(data) => {
                let raw = data.into_inner();
                record_text(&stack, &String::from_utf8_lossy(&raw), &mut loc, &mut lastmod);
            }
            Event::End(_) => {
                if stack.len() == 2 {
                    if let Some(doc) = document.as_mut() {
                        finish_item(doc, &stack[1], loc.take(), lastmod.take());
                    }
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    document.ok_or_else(|| SitemapError::UnsupportedRoot {
        element: String::new(),
        location: location.to_string(),
    })
}

fn empty_document(root: &[u8], location: &str) -> Result<SitemapDocument, SitemapError> {
    match root {
        b"sitemapindex" => Ok(SitemapDocument::Index(Vec::new())),
        b"urlset" => Ok(SitemapDocument::UrlSet(Vec::new())),
        other => Err(SitemapError::UnsupportedRoot {
            element: String::from_utf8_lossy(other).into_owned(),
            location: location.to_string(),
        }),
    }
}

/// Text directly inside `<loc>` or `<lastmod>` of a second-level element.
fn record_text(stack: &[Vec<u8>], text: &str, loc: &mut Option<String>, lastmod: &mut Option<String>) {
    if stack.len() != 3 {
        return;
    }
    let target = match stack[2].as_slice() {
        b"loc" => loc,
        b"lastmod" => lastmod,
        _ => return,
    };
    target.get_or_insert_with(String::new).push_str(text);
}

fn finish_item(doc: &mut SitemapDocument, item: &[u8], loc: Option<String>, lastmod: Option<String>) {
    let Some(loc) = loc.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) else {
        return;
    };
    match (doc, item) {
        (SitemapDocument::Index(children), b"sitemap") => children.push(loc),
        (SitemapDocument::UrlSet(entries), b"url") => entries.push(SitemapEntry {
            url: loc,
            lastmod: lastmod
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .into(),
        }),
        _ => {}
    }
}
