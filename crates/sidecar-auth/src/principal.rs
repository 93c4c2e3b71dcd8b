/// Who a request is attributed to: an authenticated API key, or an anonymous
/// IP-derived identity. The two namespaces are disjoint, so an IP that
/// collides with a key string is never conflated with it — callers keep them
/// in separate variants rather than a bare `String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    ApiKey(String),
    Ip(String),
}

impl Principal {
    pub fn authenticated(key: impl Into<String>) -> Self {
        Principal::ApiKey(key.into())
    }

    pub fn anonymous(ip: impl Into<String>) -> Self {
        Principal::Ip(ip.into())
    }

    /// The rate limiter's per-principal KV key suffix: `api_key/<key>` or
    /// `ip/<ip>`.
    pub fn limit_key_suffix(&self) -> String {
        match self {
            Principal::ApiKey(key) => format!("api_key/{key}"),
            Principal::Ip(ip) => format!("ip/{ip}"),
        }
    }
}

/// A request quota: a non-negative request count per interval, or unlimited
/// (the stored-value `inf` case).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quota {
    Limited(f64),
    Unlimited,
}

impl Quota {
    pub fn finite(value: f64) -> Self {
        Quota::Limited(value)
    }

    /// Parses the textual form stored in the API-key hash: an ordinary
    /// float, or the literal `inf` (case-insensitive, as Python's
    /// `float("inf")` accepts).
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("inf") || trimmed.eq_ignore_ascii_case("+inf") {
            return Some(Quota::Unlimited);
        }
        trimmed.parse::<f64>().ok().map(Quota::Limited)
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Quota::Unlimited)
    }

    /// `None` for `Unlimited` — callers must special-case it rather than
    /// comparing against `f64::INFINITY`, since a stored value could in
    /// principle be an ordinary very large float instead.
    pub fn as_limited(&self) -> Option<f64> {
        match self {
            Quota::Limited(v) => Some(*v),
            Quota::Unlimited => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_float() {
        assert_eq!(Quota::parse("500"), Some(Quota::Limited(500.0)));
        assert_eq!(Quota::parse("12.5"), Some(Quota::Limited(12.5)));
    }

    #[test]
    fn parses_inf_case_insensitively() {
        assert_eq!(Quota::parse("inf"), Some(Quota::Unlimited));
        assert_eq!(Quota::parse("INF"), Some(Quota::Unlimited));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Quota::parse("not-a-number"), None);
    }

    #[test]
    fn limit_key_suffix_disambiguates_namespaces() {
        assert_eq!(Principal::authenticated("abc").limit_key_suffix(), "api_key/abc");
        assert_eq!(Principal::anonymous("1.2.3.4").limit_key_suffix(), "ip/1.2.3.4");
    }
}
