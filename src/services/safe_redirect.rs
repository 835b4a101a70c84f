/// Sanitize a redirect path taken from a query parameter (e.g. `?next=`) to
/// prevent open redirects. Allows only internal paths: single leading `/`,
/// no `//`, no protocol. Query strings are stripped.
pub fn sanitize_next_path(next: Option<&str>) -> String {
    let s = next.unwrap_or("").trim();
    if s.is_empty() {
        return "/".to_string();
    }
    let path_only = match s.find('?') {
        Some(idx) => &s[..idx],
        None => s,
    };
    if !path_only.starts_with('/') || path_only.starts_with("//") || path_only.contains(':') {
        return "/".to_string();
    }
    path_only.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_relative_paths_are_rejected() {
        assert_eq!(sanitize_next_path(Some("//evil.com")), "/");
    }

    #[test]
    fn query_strings_are_stripped() {
        assert_eq!(sanitize_next_path(Some("/account?x=1")), "/account");
    }

    #[test]
    fn missing_or_empty_falls_back_to_root() {
        assert_eq!(sanitize_next_path(None), "/");
        assert_eq!(sanitize_next_path(Some("")), "/");
        assert_eq!(sanitize_next_path(Some("   ")), "/");
    }

    #[test]
    fn absolute_urls_and_schemes_are_rejected() {
        assert_eq!(sanitize_next_path(Some("https://evil.com/x")), "/");
        assert_eq!(sanitize_next_path(Some("javascript:alert(1)")), "/");
        assert_eq!(sanitize_next_path(Some("account")), "/");
    }

    #[test]
    fn internal_paths_pass_through() {
        assert_eq!(sanitize_next_path(Some("/bookings")), "/bookings");
        assert_eq!(sanitize_next_path(Some("/organiser/classes/new")), "/organiser/classes/new");
    }
}
