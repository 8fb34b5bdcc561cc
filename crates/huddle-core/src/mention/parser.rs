use regex::Regex;
use std::sync::OnceLock;

use super::index::{Mention, MentionIndex};

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)@(img\d+|[a-z_][a-z0-9_]*)").expect("mention pattern is valid")
    })
}

/// Lowercased mention labels in first-occurrence order, without duplicates.
pub fn parse_mentions(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for cap in mention_re().captures_iter(text) {
        let label = cap[1].to_lowercase();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedMentions {
    pub resolved: Vec<Mention>,
    /// `@label` for every mention the index does not know.
    pub missing: Vec<String>,
}

impl ResolvedMentions {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }
}

pub fn resolve_mentions(text: &str, index: &MentionIndex) -> ResolvedMentions {
    let mut out = ResolvedMentions::default();
    for label in parse_mentions(text) {
        match index.find(&label) {
            Some(m) => out.resolved.push(m.clone()),
            None => out.missing.push(format!("@{label}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{AssetType, CompanyAsset, MeetingImage};

    #[test]
    fn extracts_in_order_without_punctuation() {
        assert_eq!(
            parse_mentions("Check @img1 and @logo. Also @img2."),
            ["img1", "logo", "img2"]
        );
    }

    #[test]
    fn lowercases_and_dedups() {
        assert_eq!(parse_mentions("@IMG1 then @img1 then @Logo"), ["img1", "logo"]);
    }

    #[test]
    fn ignores_bare_at_and_digits() {
        assert!(parse_mentions("email me @ 5pm or @9").is_empty());
    }

    #[test]
    fn splits_resolved_from_missing() {
        let index = MentionIndex::build(
            &[MeetingImage {
                id: 4,
                image_url: "/a.png".into(),
                description: None,
                display_order: Some(1),
                created_at: None,
            }],
            &[CompanyAsset {
                id: 9,
                asset_name: "logo_main".into(),
                display_name: None,
                asset_type: AssetType::Image,
                file_path: "logo.png".into(),
            }],
            "http://h",
        );

        let r = resolve_mentions("compare @img1 with @logo_main and @img5", &index);
        let labels: Vec<_> = r.resolved.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["img1", "logo_main"]);
        assert_eq!(r.missing, ["@img5"]);
        assert!(r.has_missing());
    }
}
