use url::Url;

/// Up to two upper-cased initials from the leading words of `name`.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Link to a generated initials avatar on the configured avatar service.
pub fn avatar_url(base: &str, name: &str) -> String {
    let initials = match initials(name) {
        i if i.is_empty() => "U".to_string(),
        i => i,
    };
    let params = [
        ("name", initials.as_str()),
        ("size", "200"),
        ("background", "1A3D64"),
        ("color", "fff"),
        ("bold", "true"),
    ];
    match Url::parse_with_params(base, params) {
        Ok(url) => url.to_string(),
        Err(err) => {
            tracing::warn!(error = %err, base, "invalid avatar service URL");
            String::new()
        }
    }
}
