//! Filesystem-safe name components for run folders and files.

/// Make `name` safe as one component of a Linux path.
///
/// - Replaces NUL, `/`, `\`, whitespace and control characters with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores
/// - Limits length to 255 bytes (Linux NAME_MAX)
///
/// Returns `"unnamed"` if nothing is left.
pub fn sanitize_component(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_and_whitespace() {
        assert_eq!(sanitize_component("sailing/basic"), "sailing_basic");
        assert_eq!(sanitize_component("upper air\\v2"), "upper_air_v2");
    }

    #[test]
    fn dot_segments_cannot_escape() {
        assert_eq!(sanitize_component(".."), "unnamed");
        assert_eq!(sanitize_component("../../etc"), "etc");
    }

    #[test]
    fn collapses_and_trims() {
        assert_eq!(sanitize_component("__a___b__"), "a_b");
        assert_eq!(sanitize_component("gfs\x00x"), "gfs_x");
    }

    #[test]
    fn length_cut_respects_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_component(&long);
        assert!(out.len() <= 255);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
