//! MCP JSON-RPC protocol bridge.
//!
//! Exposes [`RuleResources`] as MCP resources through `rmcp`:
//!
//! * `resources/list` → [`RuleResources::list_resources`]
//! * `resources/read` → [`RuleResources::read_resource`]
//!
//! Unknown or malformed URIs answer with the MCP `resource_not_found` error.

use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::error::ResourceError;
use crate::resources::{ResourceBody, ResourceEntry, RuleResources};

/// Each MCP session receives a clone of this struct; all sessions share the
/// same facade and therefore the same snapshot store.
#[derive(Clone)]
pub struct RulesBridge {
    resources: Arc<RuleResources>,
}

impl RulesBridge {
    pub fn new(resources: Arc<RuleResources>) -> Self {
        Self { resources }
    }

    fn to_mcp_resource(entry: ResourceEntry) -> Resource {
        let mut raw = RawResource::new(entry.uri, entry.name);
        raw.description = Some(entry.description);
        raw.mime_type = Some(entry.mime_type);
        raw.no_annotation()
    }

    fn to_mcp_contents(body: ResourceBody) -> ResourceContents {
        let mut contents = ResourceContents::text(body.text, body.uri);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some(body.mime_type);
        }
        contents
    }

    fn to_mcp_error(err: ResourceError) -> McpError {
        McpError::resource_not_found(err.to_string(), None)
    }
}

impl ServerHandler for RulesBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_resources().build(),
            server_info: Implementation {
                name: "rules-mcp".to_string(),
                title: Some("Rules".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Markdown rule documents. Use list_resources to discover rules and \
                 read_resource with a rules:///<name> URI to fetch one."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self
            .resources
            .list_resources()
            .await
            .into_iter()
            .map(Self::to_mcp_resource)
            .collect();
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let body = self
            .resources
            .read_resource(&request.uri)
            .await
            .map_err(Self::to_mcp_error)?;

        Ok(ReadResourceResult {
            contents: vec![Self::to_mcp_contents(body)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MARKDOWN_MIME;

    #[test]
    fn contents_carry_markdown_mime_type() {
        let contents = RulesBridge::to_mcp_contents(ResourceBody {
            uri: "rules:///a.md".to_string(),
            mime_type: MARKDOWN_MIME.to_string(),
            text: "# A".to_string(),
        });
        match contents {
            ResourceContents::TextResourceContents {
                uri,
                mime_type,
                text,
                ..
            } => {
                assert_eq!(uri, "rules:///a.md");
                assert_eq!(mime_type.as_deref(), Some(MARKDOWN_MIME));
                assert_eq!(text, "# A");
            }
            other => panic!("expected text contents, got {:?}", other),
        }
    }

    #[test]
    fn resource_descriptor_uses_title_as_name() {
        let resource = RulesBridge::to_mcp_resource(ResourceEntry {
            uri: "rules:///a.md".to_string(),
            name: "Alpha".to_string(),
            description: "Rule \"Alpha\" from a.md".to_string(),
            mime_type: MARKDOWN_MIME.to_string(),
        });
        assert_eq!(resource.raw.uri, "rules:///a.md");
        assert_eq!(resource.raw.name, "Alpha");
        assert_eq!(resource.raw.mime_type.as_deref(), Some(MARKDOWN_MIME));
    }

    #[test]
    fn resource_errors_map_to_not_found() {
        let err = RulesBridge::to_mcp_error(ResourceError::NotFound("x.md".into()));
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        let err = RulesBridge::to_mcp_error(ResourceError::MalformedUri("bad".into()));
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
    }
}
