//! Community membership lookups.
//!
//! Stored graphs keep every user that was ever connected. Whether a user is
//! still part of the community is a question for a [`MembershipResolver`],
//! asked at render time so departed users drop out of views without their
//! stored edges being touched.

use crate::domain::{CommunityId, UserId};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A resolved community member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Name shown on graph nodes
    pub display_name: String,
}

/// Answers "is this user still a member, and what are they called?".
#[async_trait]
pub trait MembershipResolver: Send + Sync {
    /// Resolve `user` in `community`. `None` means the user is not a member.
    async fn resolve_member(&self, community: &CommunityId, user: &UserId) -> Result<Option<Member>>;

    /// Human-readable community name, if known.
    async fn community_name(&self, community: &CommunityId) -> Result<Option<String>>;
}

/// One community's roster as written in the directory file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityRoster {
    /// Community display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// User id to display name
    #[serde(default)]
    pub members: BTreeMap<UserId, String>,
}

/// Membership directory read from a YAML roster file.
///
/// ```yaml
/// communities:
///   "1001":
///     name: Book Club
///     members:
///       "1": Alice
///       "2": Bob
/// ```
///
/// Communities without a roster are open: every user resolves, labelled with
/// their raw id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDirectory {
    /// Rosters keyed by community
    #[serde(default)]
    pub communities: BTreeMap<CommunityId, CommunityRoster>,
}

impl StaticDirectory {
    /// An empty directory (every community open)
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory from `path`. A missing file yields an empty directory.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            tracing::debug!(path = %path.display(), "No member roster, all communities open");
            return Ok(Self::new());
        }
        let content = tokio::fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Add or rename a member, creating the roster if needed.
    pub fn insert_member(
        &mut self,
        community: impl Into<CommunityId>,
        user: impl Into<UserId>,
        display_name: impl Into<String>,
    ) -> &mut Self {
        self.communities
            .entry(community.into())
            .or_default()
            .members
            .insert(user.into(), display_name.into());
        self
    }

    /// Set the community's display name, creating the roster if needed.
    pub fn set_community_name(&mut self, community: impl Into<CommunityId>, name: impl Into<String>) -> &mut Self {
        self.communities.entry(community.into()).or_default().name = Some(name.into());
        self
    }
}

#[async_trait]
impl MembershipResolver for StaticDirectory {
    async fn resolve_member(&self, community: &CommunityId, user: &UserId) -> Result<Option<Member>> {
        let Some(roster) = self.communities.get(community) else {
            return Ok(Some(Member {
                display_name: user.to_string(),
            }));
        };
        Ok(roster.members.get(user).map(|name| Member {
            display_name: name.clone(),
        }))
    }

    async fn community_name(&self, community: &CommunityId) -> Result<Option<String>> {
        Ok(self.communities.get(community).and_then(|r| r.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cid(s: &str) -> CommunityId {
        CommunityId::new(s)
    }

    fn uid(s: &str) -> UserId {
        UserId::new(s)
    }

    #[tokio::test]
    async fn test_rostered_community_resolves_members_only() {
        let mut directory = StaticDirectory::new();
        directory.insert_member("g", "1", "Alice");

        let alice = directory.resolve_member(&cid("g"), &uid("1")).await.unwrap();
        assert_eq!(alice.unwrap().display_name, "Alice");
        assert!(directory.resolve_member(&cid("g"), &uid("2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unrostered_community_is_open() {
        let directory = StaticDirectory::new();
        let member = directory.resolve_member(&cid("g"), &uid("42")).await.unwrap();
        assert_eq!(member.unwrap().display_name, "42");
        assert!(directory.community_name(&cid("g")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_yaml_roster() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("members.yaml");
        std::fs::write(
            &path,
            "communities:\n  \"1001\":\n    name: Book Club\n    members:\n      \"1\": Alice\n",
        )
        .unwrap();

        let directory = StaticDirectory::load(&path).await.unwrap();
        assert_eq!(
            directory.community_name(&cid("1001")).await.unwrap().as_deref(),
            Some("Book Club")
        );
        assert!(directory.resolve_member(&cid("1001"), &uid("1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let directory = StaticDirectory::load(&temp_dir.path().join("nope.yaml"))
            .await
            .unwrap();
        assert!(directory.communities.is_empty());
    }

    #[tokio::test]
    async fn test_load_invalid_yaml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("members.yaml");
        std::fs::write(&path, "communities: [not, a, map]").unwrap();

        let result = StaticDirectory::load(&path).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
