//! Named committee attributes answerable over the request channel
//!
//! The table is closed: adding an attribute means adding a variant, and the
//! compiler checks every accessor is covered.

use std::str::FromStr;

use committee_core::errors::CommitteeError;
use committee_core::model::Committee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitteeAttribute {
    Uid,
    ProjectUid,
    ProjectName,
    Name,
    Category,
    Description,
    Website,
    DisplayName,
    ParentUid,
    SsoGroupName,
    Public,
    EnableVoting,
    SsoGroupEnabled,
    RequiresReview,
    TotalMembers,
    TotalVotingRepos,
}

impl CommitteeAttribute {
    pub const ALL: [CommitteeAttribute; 16] = [
        CommitteeAttribute::Uid,
        CommitteeAttribute::ProjectUid,
        CommitteeAttribute::ProjectName,
        CommitteeAttribute::Name,
        CommitteeAttribute::Category,
        CommitteeAttribute::Description,
        CommitteeAttribute::Website,
        CommitteeAttribute::DisplayName,
        CommitteeAttribute::ParentUid,
        CommitteeAttribute::SsoGroupName,
        CommitteeAttribute::Public,
        CommitteeAttribute::EnableVoting,
        CommitteeAttribute::SsoGroupEnabled,
        CommitteeAttribute::RequiresReview,
        CommitteeAttribute::TotalMembers,
        CommitteeAttribute::TotalVotingRepos,
    ];

    /// Wire name, matching the serialized field name
    pub fn name(self) -> &'static str {
        match self {
            CommitteeAttribute::Uid => "uid",
            CommitteeAttribute::ProjectUid => "project_uid",
            CommitteeAttribute::ProjectName => "project_name",
            CommitteeAttribute::Name => "name",
            CommitteeAttribute::Category => "category",
            CommitteeAttribute::Description => "description",
            CommitteeAttribute::Website => "website",
            CommitteeAttribute::DisplayName => "display_name",
            CommitteeAttribute::ParentUid => "parent_uid",
            CommitteeAttribute::SsoGroupName => "sso_group_name",
            CommitteeAttribute::Public => "public",
            CommitteeAttribute::EnableVoting => "enable_voting",
            CommitteeAttribute::SsoGroupEnabled => "sso_group_enabled",
            CommitteeAttribute::RequiresReview => "requires_review",
            CommitteeAttribute::TotalMembers => "total_members",
            CommitteeAttribute::TotalVotingRepos => "total_voting_repos",
        }
    }

    /// Render the attribute; absent optionals render empty
    pub fn value(self, committee: &Committee) -> String {
        match self {
            CommitteeAttribute::Uid => committee.uid.clone(),
            CommitteeAttribute::ProjectUid => committee.project_uid.clone(),
            CommitteeAttribute::ProjectName => committee.project_name.clone(),
            CommitteeAttribute::Name => committee.name.clone(),
            CommitteeAttribute::Category => committee.category.clone(),
            CommitteeAttribute::Description => committee.description.clone(),
            CommitteeAttribute::Website => committee.website.clone().unwrap_or_default(),
            CommitteeAttribute::DisplayName => committee.display_name.clone(),
            CommitteeAttribute::ParentUid => committee.parent_uid.clone().unwrap_or_default(),
            CommitteeAttribute::SsoGroupName => committee.sso_group_name.clone(),
            CommitteeAttribute::Public => committee.public.to_string(),
            CommitteeAttribute::EnableVoting => committee.enable_voting.to_string(),
            CommitteeAttribute::SsoGroupEnabled => committee.sso_group_enabled.to_string(),
            CommitteeAttribute::RequiresReview => committee.requires_review.to_string(),
            CommitteeAttribute::TotalMembers => committee.total_members.to_string(),
            CommitteeAttribute::TotalVotingRepos => committee.total_voting_repos.to_string(),
        }
    }
}

impl FromStr for CommitteeAttribute {
    type Err = CommitteeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CommitteeAttribute::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| CommitteeError::UnknownAttribute {
                name: wanted.to_string(),
            })
    }
}
