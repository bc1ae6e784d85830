//! Read-only MCP resources.

use crate::error::DbError;
use rmcp::model::{AnnotateAble, RawResource, Resource};
use std::fmt;
use std::str::FromStr;

pub const JSON_MIME_TYPE: &str = "application/json";

/// The two advertised resource URIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUri {
    /// Full schema document.
    Schema,
    /// Raw `SHOW TABLES` listing.
    Tables,
}

impl ResourceUri {
    pub const ALL: [ResourceUri; 2] = [ResourceUri::Schema, ResourceUri::Tables];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "mysql://schema",
            Self::Tables => "mysql://tables",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Schema => "Database Schema",
            Self::Tables => "Database Tables",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Schema => "Complete database schema information",
            Self::Tables => "List of all tables in the database",
        }
    }

    pub fn to_resource(self) -> Resource {
        let mut raw = RawResource::new(self.as_str(), self.name());
        raw.description = Some(self.description().to_string());
        raw.mime_type = Some(JSON_MIME_TYPE.to_string());
        raw.no_annotation()
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceUri {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|uri| uri.as_str() == s)
            .ok_or_else(|| DbError::unknown_resource(s))
    }
}

/// Resources advertised by `list_resources`.
pub fn list() -> Vec<Resource> {
    ResourceUri::ALL
        .into_iter()
        .map(ResourceUri::to_resource)
        .collect()
}

/// Protocol error for a failed read, prefixed with the requested URI.
pub fn read_error(uri: &str, err: DbError) -> rmcp::ErrorData {
    let mut data: rmcp::ErrorData = err.into();
    data.message = format!("Failed to read resource {}: {}", uri, data.message).into();
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_uris() {
        assert_eq!(
            "mysql://schema".parse::<ResourceUri>().unwrap(),
            ResourceUri::Schema
        );
        assert_eq!(
            "mysql://tables".parse::<ResourceUri>().unwrap(),
            ResourceUri::Tables
        );
    }

    #[test]
    fn test_parse_unknown_uri() {
        let err = "mysql://tables/customers".parse::<ResourceUri>().unwrap_err();
        assert!(matches!(err, DbError::UnknownResource { .. }));
    }

    #[test]
    fn test_list_advertises_both_resources() {
        let resources = list();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].raw.uri, "mysql://schema");
        assert_eq!(resources[0].raw.name, "Database Schema");
        assert_eq!(resources[1].raw.uri, "mysql://tables");
        assert_eq!(
            resources[1].raw.mime_type.as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_read_error_is_prefixed() {
        let err = read_error("mysql://nope", DbError::unknown_resource("mysql://nope"));
        assert_eq!(
            err.message,
            "Failed to read resource mysql://nope: Unknown resource: mysql://nope"
        );
        assert_eq!(err.code.0, -32002);
    }
}
