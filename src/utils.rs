use std::path::Path;

use rand::Rng;

/// Derives a URL-safe slug from a display name. Slugs are the stable,
/// human-readable identifiers used for category filtering in the URL,
/// distinct from the opaque row id.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Builds a collision-resistant filename for an uploaded file, keeping the
/// original extension: `<millis>-<random>.<ext>`.
pub fn unique_upload_name(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);

    match Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) => format!("{}-{}.{}", millis, suffix, ext.to_ascii_lowercase()),
        None => format!("{}-{}", millis, suffix),
    }
}
