//! Run ID generation
//!
//! All run IDs use the format: `{6-char-hex}-{kind}-{slug}`
//! Example: `019430-run-adjust-plan`

/// Generate an ID from kind and label
pub fn generate_id(kind: &str, label: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    let hex_prefix = &uuid.to_string()[..6];
    format!("{}-{}-{}", hex_prefix, kind, slugify(label))
}

/// Slugify a label for use in IDs
fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id("run", "Adjust Plan");
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 6);
        assert_eq!(parts[1], "run");
        assert_eq!(parts[2], "adjust-plan");
    }

    #[test]
    fn test_generate_id_unique() {
        assert_ne!(generate_id("run", "x"), generate_id("run", "x"));
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("week 3 / day 2!"), "week-3-day-2");
    }
}
