use serde::Serialize;

use crate::routes::{Category, Subcategory, VideoWithStats};

/// Per-row video cap on the home view, where every subcategory renders.
pub const HOME_PREVIEW_COUNT: usize = 10;
/// Length of the hero/carousel strip of flagged videos.
pub const FEATURED_STRIP_COUNT: usize = 5;
/// Length of the "most viewed" strip.
pub const MOST_VIEWED_COUNT: usize = 10;

#[derive(Debug, Serialize, Clone)]
pub struct CatalogRow {
    pub subcategory: Subcategory,
    pub videos: Vec<VideoWithStats>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CatalogView {
    pub rows: Vec<CatalogRow>,
    pub featured: Vec<VideoWithStats>,
    pub most_viewed: Vec<VideoWithStats>,
}

/// Derives the browse view for a navigation state.
///
/// With no selected category every subcategory renders, with videos capped
/// to [`HOME_PREVIEW_COUNT`] per row. With a selected slug, subcategories
/// are narrowed to the resolved category; a slug that resolves to nothing
/// falls back to the unfiltered list rather than an empty page.
///
/// A video is associated to a row by `subcategory_id` equality only, and
/// rows that end up with zero videos are suppressed.
pub fn compose(
    categories: &[Category],
    subcategories: &[Subcategory],
    videos: &[VideoWithStats],
    selected_slug: Option<&str>,
) -> CatalogView {
    let selected = selected_slug.and_then(|slug| categories.iter().find(|c| c.slug == slug));

    if selected_slug.is_some() && selected.is_none() {
        tracing::warn!(slug = ?selected_slug, "Unknown category slug, falling back to full catalog");
    }

    let mut visible: Vec<&Subcategory> = match selected {
        Some(category) => subcategories
            .iter()
            .filter(|s| Some(s.category_id.as_str()) == category.id.as_deref())
            .collect(),
        None => subcategories.iter().collect(),
    };
    visible.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    let preview_cap = if selected_slug.is_none() {
        HOME_PREVIEW_COUNT
    } else {
        usize::MAX
    };

    let rows = visible
        .into_iter()
        .filter_map(|subcategory| {
            let row_videos: Vec<VideoWithStats> = videos
                .iter()
                .filter(|v| {
                    subcategory.id.is_some()
                        && v.subcategory_id.as_deref() == subcategory.id.as_deref()
                })
                .take(preview_cap)
                .cloned()
                .collect();

            if row_videos.is_empty() {
                return None;
            }

            Some(CatalogRow {
                subcategory: subcategory.clone(),
                videos: row_videos,
            })
        })
        .collect();

    let featured = videos
        .iter()
        .filter(|v| v.featured)
        .take(FEATURED_STRIP_COUNT)
        .cloned()
        .collect();

    let mut by_views: Vec<VideoWithStats> = videos.to_vec();
    by_views.sort_by(|a, b| b.views_count.cmp(&a.views_count));
    by_views.truncate(MOST_VIEWED_COUNT);

    CatalogView {
        rows,
        featured,
        most_viewed: by_views,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, slug: &str, order: i32) -> Category {
        Category {
            id: Some(id.to_string()),
            name: slug.to_string(),
            slug: slug.to_string(),
            order,
            created_at: None,
        }
    }

    fn subcategory(id: &str, category_id: &str, order: i32) -> Subcategory {
        Subcategory {
            id: Some(id.to_string()),
            category_id: category_id.to_string(),
            name: id.to_string(),
            slug: id.to_string(),
            order,
            created_at: None,
        }
    }

    fn video(id: &str, subcategory_id: &str, views: i64, featured: bool) -> VideoWithStats {
        VideoWithStats {
            id: Some(id.to_string()),
            title: id.to_string(),
            description: None,
            video_url: format!("/uploads/{}.mp4", id),
            thumbnail_url: None,
            duration: Some(60),
            year: Some(2024),
            category_id: None,
            subcategory_id: Some(subcategory_id.to_string()),
            featured,
            created_at: None,
            views_count: views,
            likes_count: 0,
        }
    }

    #[test]
    fn selected_category_narrows_rows() {
        let categories = vec![category("c1", "couture", 0), category("c2", "streetwear", 1)];
        let subcategories = vec![
            subcategory("s1", "c1", 0),
            subcategory("s2", "c2", 0),
        ];
        let videos = vec![video("v1", "s1", 3, false), video("v2", "s2", 1, false)];

        let view = compose(&categories, &subcategories, &videos, Some("couture"));

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].subcategory.id.as_deref(), Some("s1"));
        assert_eq!(view.rows[0].videos.len(), 1);
        assert_eq!(view.rows[0].videos[0].id.as_deref(), Some("v1"));
    }

    #[test]
    fn unknown_slug_falls_back_to_full_catalog() {
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![subcategory("s1", "c1", 0), subcategory("s2", "c1", 1)];
        let videos = vec![video("v1", "s1", 0, false), video("v2", "s2", 0, false)];

        let view = compose(&categories, &subcategories, &videos, Some("no-such-slug"));

        assert_eq!(view.rows.len(), 2);
    }

    #[test]
    fn empty_rows_are_suppressed() {
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![subcategory("s1", "c1", 0), subcategory("s2", "c1", 1)];
        let videos = vec![video("v1", "s2", 0, false)];

        let view = compose(&categories, &subcategories, &videos, None);

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].subcategory.id.as_deref(), Some("s2"));
    }

    #[test]
    fn rows_follow_stored_order_then_id() {
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![
            subcategory("s3", "c1", 1),
            subcategory("s2", "c1", 0),
            subcategory("s1", "c1", 0),
        ];
        let videos = vec![
            video("v1", "s1", 0, false),
            video("v2", "s2", 0, false),
            video("v3", "s3", 0, false),
        ];

        let view = compose(&categories, &subcategories, &videos, None);

        let ids: Vec<_> = view
            .rows
            .iter()
            .map(|r| r.subcategory.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn home_view_caps_each_row_to_preview_count() {
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![subcategory("s1", "c1", 0)];
        let videos: Vec<_> = (0..15)
            .map(|i| video(&format!("v{}", i), "s1", 0, false))
            .collect();

        let home = compose(&categories, &subcategories, &videos, None);
        assert_eq!(home.rows[0].videos.len(), HOME_PREVIEW_COUNT);

        let filtered = compose(&categories, &subcategories, &videos, Some("couture"));
        assert_eq!(filtered.rows[0].videos.len(), 15);
    }

    #[test]
    fn featured_strip_takes_flagged_videos_up_to_five() {
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![subcategory("s1", "c1", 0)];
        let videos: Vec<_> = (0..8)
            .map(|i| video(&format!("v{}", i), "s1", 0, true))
            .collect();

        let view = compose(&categories, &subcategories, &videos, None);

        assert_eq!(view.featured.len(), FEATURED_STRIP_COUNT);
        assert!(view.featured.iter().all(|v| v.featured));
    }

    #[test]
    fn most_viewed_is_descending_and_capped() {
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![subcategory("s1", "c1", 0)];
        let videos: Vec<_> = (0..12)
            .map(|i| video(&format!("v{}", i), "s1", i as i64, false))
            .collect();

        let view = compose(&categories, &subcategories, &videos, None);

        assert_eq!(view.most_viewed.len(), MOST_VIEWED_COUNT);
        assert_eq!(view.most_viewed[0].views_count, 11);
        let views: Vec<_> = view.most_viewed.iter().map(|v| v.views_count).collect();
        let mut sorted = views.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(views, sorted);
    }

    #[test]
    fn videos_match_rows_by_id_only() {
        // A video pointing at a missing subcategory never renders.
        let categories = vec![category("c1", "couture", 0)];
        let subcategories = vec![subcategory("s1", "c1", 0)];
        let mut orphan = video("v1", "s-gone", 0, false);
        orphan.subcategory_id = Some("s-gone".to_string());

        let view = compose(&categories, &subcategories, &[orphan], None);

        assert!(view.rows.is_empty());
    }
}
