//! Routing policy document.
//!
//! ```yaml
//! isolation: true
//! hub:
//!   description: shared services
//! groups:
//!   app:
//!     description: application tier
//!     allowedGroups: [db]
//!   db: {}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use transit_types::{GroupName, HUB_GROUP_NAME};

use crate::error::{RoutingError, RoutingResult};
use crate::format::{load_document, save_document};

/// Policy of the reserved hub group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubPolicy {
    #[serde(default = "default_hub_description")]
    pub description: String,
}

/// Policy of a declared routing group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPolicy {
    #[serde(default)]
    pub description: String,

    /// Groups whose attachments may reach this group's attachments (and back).
    #[serde(default)]
    pub allowed_groups: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Complete routing policy of one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPolicy {
    /// When false every attachment shares one flat table
    #[serde(default = "default_isolation")]
    pub isolation: bool,

    #[serde(default)]
    pub hub: HubPolicy,

    #[serde(default)]
    pub groups: BTreeMap<String, GroupPolicy>,
}

/// A validated group declaration derived from policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDeclaration {
    pub name: GroupName,
    pub allow_list: Vec<GroupName>,
    pub description: String,
}

fn default_hub_description() -> String {
    "hub".to_string()
}

fn default_isolation() -> bool {
    true
}

impl Default for HubPolicy {
    fn default() -> Self {
        Self {
            description: default_hub_description(),
        }
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            isolation: default_isolation(),
            hub: HubPolicy::default(),
            groups: BTreeMap::new(),
        }
    }
}

impl GroupPolicy {
    /// Parses the allow-list of `group`; see [`parse_allow_list`].
    pub fn allow_list(&self, group: &str) -> RoutingResult<Vec<GroupName>> {
        parse_allow_list(group, &self.allowed_groups)
    }
}

/// Parses an allow-list, dropping `hub`, the group itself and duplicates.
///
/// Hub reachability is implicit for every group, so naming it is a no-op.
/// Entries may name groups that are not declared yet.
pub fn parse_allow_list<I, S>(group: &str, entries: I) -> RoutingResult<Vec<GroupName>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut allow_list = Vec::new();
    for entry in entries {
        let entry = entry.as_ref();
        if entry == HUB_GROUP_NAME {
            debug!("Group {} lists the hub in its allow-list; ignoring", group);
            continue;
        }
        if entry == group {
            debug!("Group {} lists itself in its allow-list; ignoring", group);
            continue;
        }
        let name = GroupName::new(entry)?;
        if !allow_list.contains(&name) {
            allow_list.push(name);
        }
    }
    Ok(allow_list)
}

impl RoutingPolicy {
    /// Loads and validates a policy document (YAML or JSON by extension).
    pub fn load(path: impl AsRef<Path>) -> RoutingResult<Self> {
        let policy: Self = load_document(path)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Loads a policy document, falling back to an empty isolated policy if
    /// the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> RoutingResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Policy file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> RoutingResult<()> {
        save_document(path, self)
    }

    /// Validates the policy without building anything.
    pub fn validate(&self) -> RoutingResult<()> {
        self.declarations().map(|_| ())
    }

    /// Returns the group declarations in name order.
    ///
    /// Allow-list entries are syntax-checked only; whether they name a
    /// declared group is decided when edges are computed.
    pub fn declarations(&self) -> RoutingResult<Vec<GroupDeclaration>> {
        self.groups
            .iter()
            .map(|(name, group)| {
                if name == HUB_GROUP_NAME {
                    return Err(RoutingError::reserved_name(name.as_str()));
                }
                Ok(GroupDeclaration {
                    name: GroupName::new(name.as_str())?,
                    allow_list: group.allow_list(name)?,
                    description: group.description.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_policy() {
        let policy = RoutingPolicy::default();
        assert!(policy.isolation);
        assert_eq!(policy.hub.description, "hub");
        assert!(policy.groups.is_empty());
    }

    #[test]
    fn test_yaml_deserialization() {
        let file = write_temp(
            ".yaml",
            r#"
hub:
  description: shared services
groups:
  app:
    description: application tier
    allowedGroups: [db, hub]
    tags:
      env: prod
  db: {}
"#,
        );
        let policy = RoutingPolicy::load(file.path()).unwrap();

        assert!(policy.isolation);
        assert_eq!(policy.hub.description, "shared services");
        assert_eq!(policy.groups.len(), 2);
        assert_eq!(policy.groups["app"].tags["env"], "prod");

        let declarations = policy.declarations().unwrap();
        assert_eq!(declarations[0].name.as_str(), "app");
        // hub is implicit and dropped from the allow-list
        assert_eq!(
            declarations[0].allow_list,
            vec![GroupName::new("db").unwrap()]
        );
        assert!(declarations[1].allow_list.is_empty());
    }

    #[test]
    fn test_json_deserialization() {
        let file = write_temp(
            ".json",
            r#"{"isolation": false, "groups": {"web": {"allowedGroups": ["app"]}}}"#,
        );
        let policy = RoutingPolicy::load(file.path()).unwrap();
        assert!(!policy.isolation);
        assert_eq!(policy.groups["web"].allowed_groups, vec!["app".to_string()]);
    }

    #[test]
    fn test_hub_group_is_rejected() {
        let file = write_temp(".yaml", "groups:\n  hub: {}\n");
        let err = RoutingPolicy::load(file.path()).unwrap_err();
        assert_eq!(err, RoutingError::reserved_name("hub"));
    }

    #[test]
    fn test_invalid_allow_list_entry() {
        let mut policy = RoutingPolicy::default();
        policy.groups.insert(
            "app".to_string(),
            GroupPolicy {
                allowed_groups: vec!["db tier".to_string()],
                ..Default::default()
            },
        );
        assert!(matches!(policy.validate(), Err(RoutingError::Parse(_))));
    }

    #[test]
    fn test_parse_allow_list_drops_hub_self_and_duplicates() {
        let allow_list = parse_allow_list("app", ["db", "hub", "app", "db", "web"]).unwrap();
        assert_eq!(
            allow_list,
            vec![GroupName::new("db").unwrap(), GroupName::new("web").unwrap()]
        );
    }

    #[test]
    fn test_forward_reference_is_accepted() {
        let mut policy = RoutingPolicy::default();
        policy.groups.insert(
            "app".to_string(),
            GroupPolicy {
                allowed_groups: vec!["not_yet_declared".to_string()],
                ..Default::default()
            },
        );
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_malformed_document() {
        let file = write_temp(".yaml", "groups: [not, a, map]\n");
        assert!(matches!(
            RoutingPolicy::load(file.path()),
            Err(RoutingError::Config { .. })
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let policy = RoutingPolicy::load_or_default("/nonexistent/policy.yaml").unwrap();
        assert_eq!(policy, RoutingPolicy::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");

        let mut policy = RoutingPolicy::default();
        policy.groups.insert("app".to_string(), GroupPolicy::default());
        policy.save(&path).unwrap();

        assert_eq!(RoutingPolicy::load(&path).unwrap(), policy);
    }
}
