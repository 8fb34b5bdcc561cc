use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::api::types::{AssetType, CompanyAsset, MeetingImage};
use crate::api::MeetingApi;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    Image,
    Asset,
}

/// Something a message can reference with `@label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    /// Bare token, e.g. `img1` or `logo_main`.
    pub label: String,
    /// `@` + label.
    pub display: String,
    pub kind: MentionKind,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Mention {
    fn new(
        id: String,
        label: String,
        kind: MentionKind,
        url: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            id,
            display: format!("@{label}"),
            label,
            kind,
            url,
            description,
        }
    }

    /// Whether the label or display text contains `query`, ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.label.to_lowercase().contains(&q) || self.display.to_lowercase().contains(&q)
    }
}

/// Meeting images followed by company assets, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionIndex {
    mentions: Vec<Mention>,
}

impl MentionIndex {
    /// Build the index. Images are labelled `img<display_order>`, or by their
    /// 1-based position when the order is missing or zero.
    pub fn build(images: &[MeetingImage], assets: &[CompanyAsset], asset_base_url: &str) -> Self {
        let base = asset_base_url.trim_end_matches('/');
        let mut mentions = Vec::with_capacity(images.len() + assets.len());

        for (i, img) in images.iter().enumerate() {
            let order = img
                .display_order
                .filter(|o| *o != 0)
                .unwrap_or(i as i64 + 1);
            let path = if img.image_url.starts_with('/') {
                img.image_url.clone()
            } else {
                format!("/{}", img.image_url)
            };
            mentions.push(Mention::new(
                format!("meeting-img-{}", img.id),
                format!("img{order}"),
                MentionKind::Image,
                Some(format!("{base}{path}")),
                img.description.clone(),
            ));
        }

        for asset in assets {
            let url = match asset.asset_type {
                AssetType::Image => Some(format!(
                    "{base}/{}",
                    asset.file_path.replace('\\', "/").trim_start_matches('/')
                )),
                AssetType::Other => None,
            };
            mentions.push(Mention::new(
                format!("asset-{}", asset.id),
                asset.asset_name.clone(),
                MentionKind::Asset,
                url,
                asset.display_name.clone(),
            ));
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for m in &mentions {
            *seen.entry(m.label.as_str()).or_default() += 1;
        }
        for (label, count) in seen.into_iter().filter(|(_, c)| *c > 1) {
            warn!(label, count, "duplicate mention label");
        }

        Self { mentions }
    }

    /// Fetch images, and assets when the company is known, then build.
    pub async fn load(
        api: &dyn MeetingApi,
        meeting_id: i64,
        company_id: Option<i64>,
        asset_base_url: &str,
    ) -> Result<Self, ApiError> {
        let images = api.list_images(meeting_id).await?;
        let assets = match company_id {
            Some(company_id) => api.list_assets(company_id).await?,
            None => Vec::new(),
        };
        Ok(Self::build(&images, &assets, asset_base_url))
    }

    pub fn mentions(&self) -> &[Mention] {
        &self.mentions
    }

    /// First mention with this label, ignoring case.
    pub fn find(&self, label: &str) -> Option<&Mention> {
        self.mentions
            .iter()
            .find(|m| m.label.eq_ignore_ascii_case(label))
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;

    fn image(id: i64, url: &str, order: Option<i64>) -> MeetingImage {
        MeetingImage {
            id,
            image_url: url.to_string(),
            description: Some(format!("image {id}")),
            display_order: order,
            created_at: None,
        }
    }

    fn asset(id: i64, name: &str, kind: AssetType, path: &str) -> CompanyAsset {
        CompanyAsset {
            id,
            asset_name: name.to_string(),
            display_name: Some(format!("{name} (display)")),
            asset_type: kind,
            file_path: path.to_string(),
        }
    }

    #[test]
    fn images_come_first_then_assets() {
        let index = MentionIndex::build(
            &[image(10, "/uploads/a.png", Some(1)), image(11, "/uploads/b.png", Some(2))],
            &[asset(5, "logo_main", AssetType::Image, "assets/1/logo.png")],
            "http://localhost:8001/",
        );

        let labels: Vec<_> = index.mentions().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["img1", "img2", "logo_main"]);

        let first = &index.mentions()[0];
        assert_eq!(first.id, "meeting-img-10");
        assert_eq!(first.display, "@img1");
        assert_eq!(first.kind, MentionKind::Image);
        assert_eq!(first.url.as_deref(), Some("http://localhost:8001/uploads/a.png"));

        let logo = &index.mentions()[2];
        assert_eq!(logo.id, "asset-5");
        assert_eq!(logo.kind, MentionKind::Asset);
        assert_eq!(
            logo.url.as_deref(),
            Some("http://localhost:8001/assets/1/logo.png")
        );
        assert_eq!(logo.description.as_deref(), Some("logo_main (display)"));
    }

    #[test]
    fn missing_or_zero_order_falls_back_to_position() {
        let index = MentionIndex::build(
            &[
                image(1, "/a.png", None),
                image(2, "/b.png", Some(0)),
                image(3, "/c.png", Some(7)),
            ],
            &[],
            "http://h",
        );
        let labels: Vec<_> = index.mentions().iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["img1", "img2", "img7"]);
    }

    #[test]
    fn non_image_assets_have_no_url() {
        let index = MentionIndex::build(
            &[],
            &[asset(8, "brand_guide", AssetType::Other, "assets/guide.pdf")],
            "http://h",
        );
        assert!(index.mentions()[0].url.is_none());
    }

    #[test]
    fn duplicate_labels_are_kept() {
        let index = MentionIndex::build(
            &[image(1, "/a.png", Some(1))],
            &[asset(2, "img1", AssetType::Image, "x.png")],
            "http://h",
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.find("img1").unwrap().kind, MentionKind::Image);
    }

    #[test]
    fn find_ignores_case() {
        let index = MentionIndex::build(
            &[],
            &[asset(2, "Logo_Main", AssetType::Image, "x.png")],
            "http://h",
        );
        assert!(index.find("logo_main").is_some());
        assert!(index.find("logo").is_none());
    }

    #[tokio::test]
    async fn load_skips_assets_without_company() {
        let api = FakeApi::new(Vec::new());
        api.images.lock().push(image(1, "/a.png", Some(1)));
        api.assets
            .lock()
            .push(asset(2, "logo", AssetType::Image, "logo.png"));

        let index = MentionIndex::load(&api, 3, None, "http://h").await.unwrap();
        assert_eq!(index.len(), 1);
        assert!(api.asset_requests.lock().is_empty());

        let index = MentionIndex::load(&api, 3, Some(1), "http://h").await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(*api.asset_requests.lock(), vec![1]);
    }
}
