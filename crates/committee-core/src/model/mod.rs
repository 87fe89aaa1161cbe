pub mod committee;
pub mod member;
pub mod settings;

pub use committee::{Calendar, Committee, GOVERNMENT_ADVISORY_COUNCIL};
pub use member::{CommitteeMember, MemberRole, MemberVoting, Organization};
pub use settings::CommitteeSettings;
