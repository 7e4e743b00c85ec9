//! `Link` response header parsing (RFC 8288)
//!
//! Mastodon-compatible servers advertise the neighbouring pages of a list
//! endpoint through `Link: <url>; rel="next", <url>; rel="prev"`.

use url::Url;

/// One link-value from a `Link` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target, resolved against the URL of the request that returned it
    pub url: Url,
    /// Lowercased relation types
    pub rels: Vec<String>,
}

/// All link-values collected from a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHeader {
    links: Vec<Link>,
}

impl LinkHeader {
    /// Parse every `Link` header value of a response.
    ///
    /// Malformed entries are skipped rather than failing the whole header.
    pub fn from_values<'a, I>(values: I, base: &Url) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let links = values
            .into_iter()
            .flat_map(|value| parse_link_value(value, base))
            .collect();
        Self { links }
    }

    /// Parse a single header value
    pub fn parse(value: &str, base: &Url) -> Self {
        Self::from_values([value], base)
    }

    /// First link carrying the given relation
    pub fn find(&self, rel: &str) -> Option<&Url> {
        self.links
            .iter()
            .find(|link| link.rels.iter().any(|r| r.eq_ignore_ascii_case(rel)))
            .map(|link| &link.url)
    }

    pub fn next(&self) -> Option<&Url> {
        self.find("next")
    }

    pub fn prev(&self) -> Option<&Url> {
        self.find("prev").or_else(|| self.find("previous"))
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

fn parse_link_value(value: &str, base: &Url) -> Vec<Link> {
    let mut links = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }

        let Some(stripped) = rest.strip_prefix('<') else {
            // Not a link-value; resynchronize on the next top-level comma.
            rest = &rest[param_section_end(rest)..];
            continue;
        };

        let Some(close) = stripped.find('>') else {
            break;
        };
        let target = stripped[..close].trim();
        let after = &stripped[close + 1..];
        let end = param_section_end(after);
        let params = &after[..end];
        rest = &after[end..];

        let rels = relation_types(params);
        if rels.is_empty() {
            continue;
        }

        match base.join(target) {
            Ok(url) => links.push(Link { url, rels }),
            Err(error) => {
                tracing::debug!(%error, target = %target, "Skipping unparsable Link target");
            }
        }
    }

    links
}

/// Byte offset of the first comma outside a quoted string
fn param_section_end(s: &str) -> usize {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return i,
            _ => {}
        }
    }
    s.len()
}

fn relation_types(params: &str) -> Vec<String> {
    params
        .split(';')
        .filter_map(|param| param.split_once('='))
        .filter(|(name, _)| name.trim().eq_ignore_ascii_case("rel"))
        .flat_map(|(_, value)| {
            value
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .map(str::to_ascii_lowercase)
                .collect::<Vec<_>>()
        })
        .collect()
}
