use url::{Host, Url};

/// Canonicalizes a URL to its registrable domain key.
///
/// Multi-label country-code suffixes (e.g. `.co.uk`, `.com.au`) are detected
/// heuristically: if both the last and second-to-last labels are at most three
/// characters, three labels are retained, otherwise two. IP-literal hosts pass
/// through unchanged. Malformed URLs yield `None`; callers must treat that as
/// "not classifiable by domain", never as an affirmative verdict.
pub fn normalize_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.host()? {
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
        Host::Domain(host) => {
            let host = host.trim_end_matches('.').to_ascii_lowercase();
            if host.is_empty() {
                return None;
            }
            let labels: Vec<&str> = host.split('.').collect();
            let n = labels.len();
            if n <= 2 {
                return Some(host);
            }
            let last = labels[n - 1];
            let second_last = labels[n - 2];
            let keep = if last.len() <= 3 && second_last.len() <= 3 {
                3
            } else {
                2
            };
            Some(labels[n - keep..].join("."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_domains_keep_two_labels() {
        assert_eq!(
            normalize_domain("https://news.example.com/article"),
            Some("example.com".to_string())
        );
        assert_eq!(
            normalize_domain("https://a.b.c.example.com/"),
            Some("example.com".to_string())
        );
        assert_eq!(
            normalize_domain("https://mangadex.org/title/1"),
            Some("mangadex.org".to_string())
        );
    }

    #[test]
    fn test_cc_suffix_keeps_three_labels() {
        assert_eq!(
            normalize_domain("https://a.b.co.uk/x"),
            Some("b.co.uk".to_string())
        );
        assert_eq!(
            normalize_domain("https://sub.a.b.co.uk/y"),
            Some("b.co.uk".to_string())
        );
        assert_eq!(
            normalize_domain("https://shop.example.com.au/"),
            Some("example.com.au".to_string())
        );
    }

    #[test]
    fn test_single_label_host() {
        assert_eq!(
            normalize_domain("http://localhost:3000/"),
            Some("localhost".to_string())
        );
    }

    #[test]
    fn test_ip_literal_passthrough() {
        assert_eq!(
            normalize_domain("http://192.168.1.10/admin"),
            Some("192.168.1.10".to_string())
        );
        assert_eq!(
            normalize_domain("http://[::1]:8080/"),
            Some("::1".to_string())
        );
    }

    #[test]
    fn test_malformed_url_is_none() {
        assert_eq!(normalize_domain("not a url"), None);
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("file:///etc/hosts"), None);
    }

    #[test]
    fn test_repeated_calls_agree() {
        let url = "https://WWW.Example.CO.UK./path?x=1";
        assert_eq!(normalize_domain(url), normalize_domain(url));
        assert_eq!(normalize_domain(url), Some("example.co.uk".to_string()));
    }
}
