//! Reservation key derivation
//!
//! A reservation key is a secondary key whose existence encodes a uniqueness
//! claim. Keys are `/`-separated segments of `[a-z0-9_=-]`, so a backend that
//! uses `.` as its own separator can map `/` onto it one-to-one.

use sha2::{Digest, Sha256};

use crate::model::{Committee, CommitteeMember};

pub const NAME_LOOKUP_PREFIX: &str = "lookup/committees";
pub const SSO_LOOKUP_PREFIX: &str = "lookup/committee-sso-groups";
pub const MEMBER_LOOKUP_PREFIX: &str = "lookup/committee-members";

/// What a reservation key claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationKind {
    /// `(project_uid, name)` of a committee
    NameProject,
    /// Global SSO group name
    SsoGroupName,
    /// `(committee_uid, email)` of a member
    MemberEmail,
}

/// A derived secondary key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationKey {
    kind: ReservationKind,
    key: String,
}

impl ReservationKey {
    pub fn name_project(committee: &Committee) -> Self {
        Self {
            kind: ReservationKind::NameProject,
            key: format!(
                "{}/{}/{}",
                NAME_LOOKUP_PREFIX,
                committee.project_uid,
                normalize_name(&committee.name)
            ),
        }
    }

    pub fn sso_group_name(sso_group_name: &str) -> Self {
        Self {
            kind: ReservationKind::SsoGroupName,
            key: format!("{}/{}", SSO_LOOKUP_PREFIX, sso_group_name),
        }
    }

    pub fn member(member: &CommitteeMember) -> Self {
        Self {
            kind: ReservationKind::MemberEmail,
            key: format!(
                "{}/{}/{}",
                MEMBER_LOOKUP_PREFIX,
                member.committee_uid,
                email_digest(&member.email)
            ),
        }
    }

    pub fn kind(&self) -> ReservationKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Rebuild a key of the same kind from another record
    ///
    /// After an update the orchestrator holds the new key and the old record;
    /// this yields exactly the key that was reserved for the old record.
    /// Returns `None` when the old record held no key of this kind.
    pub fn rebuild_for<R: Reservable>(&self, old: &R) -> Option<ReservationKey> {
        old.reservation_keys()
            .into_iter()
            .find(|k| k.kind == self.kind)
    }
}

impl std::fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Records that own reservation keys
pub trait Reservable {
    /// Every secondary key this record currently holds
    fn reservation_keys(&self) -> Vec<ReservationKey>;
}

impl Reservable for Committee {
    fn reservation_keys(&self) -> Vec<ReservationKey> {
        let mut keys = vec![ReservationKey::name_project(self)];
        if self.holds_sso_group() {
            keys.push(ReservationKey::sso_group_name(&self.sso_group_name));
        }
        keys
    }
}

impl Reservable for CommitteeMember {
    fn reservation_keys(&self) -> Vec<ReservationKey> {
        vec![ReservationKey::member(self)]
    }
}

/// Key-safe, case-insensitive form of a committee name
///
/// The name is trimmed and lowercased, and each whitespace run becomes a
/// single `-`. ASCII `[a-z0-9_]` is kept as is; every other character is
/// written as `=` followed by the lowercase hex of its UTF-8 bytes, so two
/// names map to the same key only when they differ in case or spacing.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if pending_dash {
            out.push('-');
            pending_dash = false;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push('=');
                out.push_str(&hex::encode([byte]));
            }
        }
    }
    out
}

/// Lowercase ASCII alphanumerics joined by single dashes
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.trim().chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Candidate SSO group name for the given attempt
///
/// Attempt 0 is `<slug>-<name>`; later attempts append `-<attempt>`.
pub fn sso_group_candidate(project_slug: &str, committee_name: &str, attempt: u32) -> String {
    let base = match (slugify(project_slug), slugify(committee_name)) {
        (slug, name) if slug.is_empty() => name,
        (slug, name) if name.is_empty() => slug,
        (slug, name) => format!("{}-{}", slug, name),
    };
    if attempt == 0 {
        base
    } else {
        format!("{}-{}", base, attempt)
    }
}

/// Hex SHA-256 of the normalized e-mail; keeps raw addresses out of keys
pub fn email_digest(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_name_project_key_shape() {
        let c = Committee::draft("p1", "Technical Steering Committee");
        assert_eq!(
            ReservationKey::name_project(&c).as_str(),
            "lookup/committees/p1/technical-steering-committee"
        );
    }

    #[test]
    fn test_sso_candidate_matches_scenario() {
        assert_eq!(sso_group_candidate("p1", "TSC", 0), "p1-tsc");
        assert_eq!(sso_group_candidate("p1", "TSC", 3), "p1-tsc-3");
        assert_eq!(
            ReservationKey::sso_group_name("p1-tsc").as_str(),
            "lookup/committee-sso-groups/p1-tsc"
        );
    }

    #[test]
    fn test_member_key_hides_email_and_ignores_case() {
        let a = CommitteeMember::draft("c1", "Jane@Example.org");
        let b = CommitteeMember::draft("c1", " jane@example.org ");
        let key = ReservationKey::member(&a);
        assert_eq!(key, ReservationKey::member(&b));
        assert!(!key.as_str().contains("jane"));
        assert!(key.as_str().starts_with("lookup/committee-members/c1/"));
    }

    #[test]
    fn test_rebuild_reproduces_old_name_key() {
        let old = Committee::draft("p1", "TSC");
        let mut new = old.clone();
        new.name = "TSC2".into();

        let old_key = ReservationKey::name_project(&old);
        let new_key = ReservationKey::name_project(&new);

        assert_ne!(old_key, new_key);
        assert_eq!(new_key.rebuild_for(&old), Some(old_key));
    }

    #[test]
    fn test_rebuild_sso_none_when_old_disabled() {
        let old = Committee::draft("p1", "TSC");
        let key = ReservationKey::sso_group_name("p1-tsc2");
        assert_eq!(key.rebuild_for(&old), None);
    }

    /// What the key is meant to identify: lowercase, single-spaced, trimmed
    fn canonical(name: &str) -> String {
        name.chars()
            .flat_map(char::to_lowercase)
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_non_latin_names_keep_their_identity() {
        let a = normalize_name("委员会");
        let b = normalize_name("理事会");
        assert_ne!(a, b);
        assert_eq!(a, "=e5=a7=94=e5=91=98=e4=bc=9a");
    }

    #[test]
    fn test_symbols_are_not_dropped() {
        assert_ne!(
            normalize_name("C++ Working Group"),
            normalize_name("C Working Group")
        );
        assert_eq!(normalize_name("C++ Working Group"), "c=2b=2b-working-group");
        assert_ne!(normalize_name("R&D"), normalize_name("RD"));
        assert_ne!(normalize_name("Build-Tools"), normalize_name("Build Tools"));
        assert_eq!(normalize_name("v1.2 WG"), "v1=2e2-wg");
    }

    #[test]
    fn test_case_and_spacing_collapse() {
        assert_eq!(normalize_name("  Comité   Technique "), normalize_name("COMITÉ technique"));
    }

    proptest! {
        #[test]
        fn prop_normalized_names_are_key_safe(name in "\\PC{0,40}") {
            let n = normalize_name(&name);
            prop_assert!(n.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '=')));
            prop_assert!(!n.starts_with('-') && !n.ends_with('-'));
            prop_assert!(!n.contains("--"));
        }

        #[test]
        fn prop_distinct_names_get_distinct_keys(a in "\\PC{0,20}", b in "\\PC{0,20}") {
            prop_assume!(canonical(&a) != canonical(&b));
            prop_assert_ne!(normalize_name(&a), normalize_name(&b));
        }

        #[test]
        fn prop_case_and_spacing_share_a_key(name in "[a-zA-Z0-9\u{e9}\u{c9}\u{4e00}-\u{4e10}]{1,10}( [a-zA-Z0-9]{1,10}){0,3}") {
            let shouted = format!("  {}  ", name.to_uppercase().replace(' ', "   "));
            prop_assert_eq!(normalize_name(&shouted), normalize_name(&name));
        }

        #[test]
        fn prop_candidates_differ_per_attempt(name in "[a-zA-Z]{1,12}", a in 0u32..100, b in 0u32..100) {
            prop_assume!(a != b);
            prop_assert_ne!(sso_group_candidate("proj", &name, a), sso_group_candidate("proj", &name, b));
        }
    }
}
