//! URL allow-lists applied while reading content.

const SAFE_DATA_IMAGES: [&str; 5] = ["png", "jpeg", "jpg", "gif", "webp"];
const UNSAFE_HREF_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Image sources must be http(s), an uploads path on this origin, or an
/// inline raster image.
pub fn is_safe_image_src(src: &str) -> bool {
    let src = src.trim();
    let lower = src.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return true;
    }
    if src.starts_with("/uploads/") {
        return true;
    }
    if let Some(rest) = lower.strip_prefix("data:image/") {
        let subtype = rest.split([';', ',']).next().unwrap_or_default();
        return SAFE_DATA_IMAGES.contains(&subtype);
    }
    false
}

/// Link targets may be anything except script-capable schemes.
pub fn is_safe_href(href: &str) -> bool {
    // Browsers ignore embedded whitespace and control chars in schemes.
    let compact: String = href
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    !compact.is_empty() && !UNSAFE_HREF_SCHEMES.iter().any(|s| compact.starts_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_sources() {
        assert!(is_safe_image_src("https://cdn.example.com/a.png"));
        assert!(is_safe_image_src("/uploads/screenshots/a.png"));
        assert!(is_safe_image_src("data:image/png;base64,iVBORw0KGgo="));
        assert!(!is_safe_image_src("data:image/svg+xml;base64,PHN2Zz4="));
        assert!(!is_safe_image_src("javascript:alert(1)"));
        assert!(!is_safe_image_src("/etc/passwd"));
    }

    #[test]
    fn link_targets() {
        assert!(is_safe_href("https://owasp.org"));
        assert!(is_safe_href("#section-2"));
        assert!(!is_safe_href("javascript:alert(1)"));
        assert!(!is_safe_href(" JavaScript:alert(1)"));
        assert!(!is_safe_href("java\tscript:alert(1)"));
        assert!(!is_safe_href("data:text/html,<b>x</b>"));
        assert!(!is_safe_href(""));
    }
}
