#[macro_export]
macro_rules! lazy_regex {
    ($s:expr) => {
        std::sync::LazyLock::new(|| {
            regex::Regex::new($s).expect("Static regex pattern must be valid")
        })
    };
}

/// Joins a user-supplied base URL and an endpoint path without doubling slashes.
#[must_use]
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Masks all but the last four characters of a secret for display.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}
