//! Resource facade: the only view of the rules the protocol layer gets.
//!
//! Each rule is addressed as `rules:///<file name>`, with the name
//! percent-encoded outside the URI unreserved set. Listing and reading go
//! through [`Synchronizer::current`], so a local directory is rebuilt before
//! it is served while a GitHub source answers from its last poll.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ResourceError;
use crate::sync::Synchronizer;

/// URI scheme of rule resources.
pub const URI_SCHEME: &str = "rules";
/// Content type attached to every rule body.
pub const MARKDOWN_MIME: &str = "text/markdown";

/// One entry of a resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub uri: String,
    /// Display name, the rule's title.
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Body of a read resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceBody {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// Everything but RFC 3986 unreserved characters.
const NAME_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `rules:///<name>`.
pub fn resource_uri(name: &str) -> String {
    format!("{}:///{}", URI_SCHEME, utf8_percent_encode(name, NAME_ESCAPES))
}

/// Extracts the decoded rule name from a `rules:///<name>` URI.
pub fn parse_resource_uri(uri: &str) -> Result<String, ResourceError> {
    let malformed = || ResourceError::MalformedUri(uri.to_string());

    let rest = uri
        .strip_prefix(URI_SCHEME)
        .and_then(|r| r.strip_prefix(":///"))
        .ok_or_else(malformed)?;

    let name = percent_decode_str(rest)
        .decode_utf8()
        .map_err(|_| malformed())?;
    if name.is_empty() || name.contains('/') {
        return Err(malformed());
    }
    Ok(name.into_owned())
}

fn describe(title: &str, name: &str) -> String {
    format!("Rule \"{}\" from {}", title, name)
}

pub struct RuleResources {
    sync: Arc<Synchronizer>,
}

impl RuleResources {
    pub fn new(sync: Arc<Synchronizer>) -> Self {
        Self { sync }
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    /// One entry per rule in the current snapshot, in name order.
    pub async fn list_resources(&self) -> Vec<ResourceEntry> {
        let snapshot = self.sync.current().await;
        snapshot
            .documents()
            .map(|doc| ResourceEntry {
                uri: resource_uri(&doc.name),
                name: doc.title.clone(),
                description: describe(&doc.title, &doc.name),
                mime_type: MARKDOWN_MIME.to_string(),
            })
            .collect()
    }

    /// Reads one rule by URI.
    ///
    /// # Errors
    ///
    /// [`ResourceError::MalformedUri`] when the URI is not `rules:///<name>`,
    /// [`ResourceError::NotFound`] when the current snapshot has no such rule.
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceBody, ResourceError> {
        let name = parse_resource_uri(uri)?;
        let snapshot = self.sync.current().await;
        let doc = snapshot
            .get(&name)
            .ok_or(ResourceError::NotFound(name))?;

        Ok(ResourceBody {
            uri: resource_uri(&doc.name),
            mime_type: MARKDOWN_MIME.to_string(),
            text: doc.body.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trip() {
        let uri = resource_uri("rust.md");
        assert_eq!(uri, "rules:///rust.md");
        assert_eq!(parse_resource_uri(&uri), Ok("rust.md".to_string()));
    }

    #[test]
    fn names_are_percent_encoded() {
        let uri = resource_uri("my rule#1.md");
        assert_eq!(uri, "rules:///my%20rule%231.md");
        assert_eq!(parse_resource_uri(&uri), Ok("my rule#1.md".to_string()));
        assert_eq!(
            parse_resource_uri("rules:///caf%C3%A9.md"),
            Ok("café.md".to_string())
        );
    }

    #[test]
    fn malformed_uris_are_rejected() {
        for uri in [
            "rust.md",
            "rules://rust.md",
            "other:///rust.md",
            "rules:///",
            "rules:///a/b.md",
            "rules:///a%2Fb.md",
            "rules:///%FF.md",
        ] {
            assert_eq!(
                parse_resource_uri(uri),
                Err(ResourceError::MalformedUri(uri.to_string())),
                "{}",
                uri
            );
        }
    }

    #[test]
    fn description_embeds_title_and_name() {
        assert_eq!(describe("Rust", "rust.md"), "Rule \"Rust\" from rust.md");
    }
}
