use url::Url;

/// Hosts that stay inside the content window.
pub const ALLOWED_HOSTS: [&str; 3] = ["whatsapp.com", "web.whatsapp.com", "chat.whatsapp.com"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkDecision {
    InWindow,
    External,
}

/// Decides where a navigation target should open.
pub fn decide(target: &str) -> LinkDecision {
    let Ok(url) = Url::parse(target) else {
        return LinkDecision::External;
    };
    match url.scheme() {
        "http" | "https" => match url.host_str() {
            Some(host) if ALLOWED_HOSTS.contains(&host) => LinkDecision::InWindow,
            _ => LinkDecision::External,
        },
        "about" | "blob" | "data" => LinkDecision::InWindow,
        _ => LinkDecision::External,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_set_hosts_stay_in_window() {
        assert_eq!(decide("https://chat.whatsapp.com/xyz"), LinkDecision::InWindow);
        assert_eq!(decide("https://web.whatsapp.com/"), LinkDecision::InWindow);
        assert_eq!(decide("https://whatsapp.com/legal"), LinkDecision::InWindow);
    }

    #[test]
    fn other_hosts_go_external() {
        assert_eq!(decide("https://example.com"), LinkDecision::External);
        assert_eq!(decide("https://faq.whatsapp.com/"), LinkDecision::External);
        assert_eq!(
            decide("https://evil.com/?next=web.whatsapp.com"),
            LinkDecision::External
        );
        assert_eq!(decide("https://notwhatsapp.com/"), LinkDecision::External);
    }

    #[test]
    fn non_web_schemes() {
        assert_eq!(decide("mailto:someone@example.com"), LinkDecision::External);
        assert_eq!(decide("tel:+123456"), LinkDecision::External);
        assert_eq!(decide("about:blank"), LinkDecision::InWindow);
        assert_eq!(
            decide("blob:https://web.whatsapp.com/4f1c"),
            LinkDecision::InWindow
        );
        assert_eq!(decide("not a url"), LinkDecision::External);
    }
}
