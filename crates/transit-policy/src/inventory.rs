//! Attachment inventory documents.
//!
//! An inventory is a list of endpoints supplied once their identifiers are
//! known:
//!
//! ```yaml
//! - attachmentId: vpc-0a1b
//!   groupName: app
//!   ownedPrefixes: [10.1.0.0/16]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use transit_types::{AttachmentId, IpPrefix};

use crate::error::{RoutingError, RoutingResult};
use crate::format::load_document;

/// A network endpoint to attach to a routing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSpec {
    pub attachment_id: AttachmentId,
    /// Group name as written in the document; resolved against the model.
    pub group_name: String,
    #[serde(default)]
    pub owned_prefixes: Vec<IpPrefix>,
}

impl AttachmentSpec {
    pub fn new(attachment_id: AttachmentId, group_name: impl Into<String>) -> Self {
        Self {
            attachment_id,
            group_name: group_name.into(),
            owned_prefixes: Vec::new(),
        }
    }

    pub fn with_prefixes(mut self, prefixes: impl IntoIterator<Item = IpPrefix>) -> Self {
        self.owned_prefixes.extend(prefixes);
        self
    }

    /// Loads an inventory document (YAML or JSON by extension).
    ///
    /// The same attachment id may not appear twice in one inventory.
    pub fn load_all(path: impl AsRef<Path>) -> RoutingResult<Vec<Self>> {
        let path = path.as_ref();
        let specs: Vec<Self> = load_document(path)?;

        let mut seen = BTreeSet::new();
        for spec in &specs {
            if !seen.insert(&spec.attachment_id) {
                return Err(RoutingError::config(
                    path,
                    format!("attachment {} listed twice", spec.attachment_id),
                ));
            }
        }
        Ok(specs)
    }
}
