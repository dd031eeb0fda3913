//! Post-checkout redirect allowlist.
//!
//! Checkout success/cancel URLs come from the client, so every absolute URL
//! must match a known origin before the gateway is told to redirect there.
//! There is no bypass path: anything that fails the origin check yields None
//! and the caller must fail the request.

use url::Url;

/// Allowed redirect destinations for checkout success/cancel URLs.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    frontend_origin: String,
    allowed_origins: Vec<String>,
    /// Localhost targets are only acceptable outside production.
    allow_localhost: bool,
}

impl RedirectPolicy {
    pub fn new(frontend_origin: &str, allowed_origins: Vec<String>, allow_localhost: bool) -> Self {
        Self {
            frontend_origin: frontend_origin.trim_end_matches('/').to_string(),
            allowed_origins,
            allow_localhost,
        }
    }

    /// Resolve a client-supplied redirect target.
    ///
    /// Bare paths resolve against the frontend origin. Absolute URLs must
    /// pass the origin allowlist. `None` input falls back to `fallback_path`
    /// on the frontend origin. Returns None for anything else - including
    /// non-http schemes and schemeless/protocol-relative forms.
    pub fn build_redirect_url(
        &self,
        input: Option<&str>,
        fallback_path: &str,
        params: &[(&str, &str)],
    ) -> Option<String> {
        let target = match input.map(str::trim).filter(|s| !s.is_empty()) {
            None => format!("{}{}", self.frontend_origin, fallback_path),
            Some(path) if path.starts_with('/') && !path.starts_with("//") => {
                format!("{}{}", self.frontend_origin, path)
            }
            Some(absolute) => {
                if !self.is_allowed_origin(absolute) {
                    return None;
                }
                absolute.to_string()
            }
        };

        Some(append_query_params(&target, params))
    }

    fn is_allowed_origin(&self, input: &str) -> bool {
        let Ok(url) = Url::parse(input) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };

        let origin = url.origin().ascii_serialization();

        if origin == self.frontend_origin {
            return true;
        }
        if self.allowed_origins.iter().any(|o| *o == origin) {
            return true;
        }
        if self.allow_localhost && matches!(host, "localhost" | "127.0.0.1") {
            return true;
        }
        // Vercel preview deployments, https only
        if url.scheme() == "https" && host.ends_with(".vercel.app") {
            return true;
        }

        false
    }
}

/// Append query parameters to a URL
fn append_query_params(base_url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return base_url.to_string();
    }

    let query_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if base_url.contains('?') {
        format!("{}&{}", base_url, query_string)
    } else {
        format!("{}?{}", base_url, query_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RedirectPolicy {
        RedirectPolicy::new(
            "https://app.rentfolio.test",
            vec!["https://landlords.rentfolio.test".to_string()],
            false,
        )
    }

    #[test]
    fn test_bare_path_resolves_against_frontend_origin() {
        let url = policy()
            .build_redirect_url(Some("/screening/success"), "/", &[("order", "rf_ord_1")])
            .unwrap();
        assert_eq!(
            url,
            "https://app.rentfolio.test/screening/success?order=rf_ord_1"
        );
    }

    #[test]
    fn test_empty_input_uses_fallback_path() {
        let url = policy()
            .build_redirect_url(None, "/screening/done", &[])
            .unwrap();
        assert_eq!(url, "https://app.rentfolio.test/screening/done");
    }

    #[test]
    fn test_unlisted_origin_is_rejected() {
        assert!(policy()
            .build_redirect_url(Some("https://evil.com/x"), "/", &[])
            .is_none());
    }

    #[test]
    fn test_allowlisted_origin_is_accepted() {
        let url = policy()
            .build_redirect_url(Some("https://landlords.rentfolio.test/paid"), "/", &[])
            .unwrap();
        assert_eq!(url, "https://landlords.rentfolio.test/paid");
    }

    #[test]
    fn test_vercel_preview_is_accepted_https_only() {
        assert!(policy()
            .build_redirect_url(Some("https://rentfolio-pr-42.vercel.app/done"), "/", &[])
            .is_some());
        assert!(policy()
            .build_redirect_url(Some("http://rentfolio-pr-42.vercel.app/done"), "/", &[])
            .is_none());
    }

    #[test]
    fn test_vercel_lookalike_host_is_rejected() {
        assert!(policy()
            .build_redirect_url(Some("https://evilvercel.app/x"), "/", &[])
            .is_none());
        assert!(policy()
            .build_redirect_url(Some("https://vercel.app.evil.com/x"), "/", &[])
            .is_none());
    }

    #[test]
    fn test_localhost_only_outside_production() {
        let dev = RedirectPolicy::new("https://app.rentfolio.test", vec![], true);
        assert!(dev
            .build_redirect_url(Some("http://localhost:5173/done"), "/", &[])
            .is_some());
        assert!(policy()
            .build_redirect_url(Some("http://localhost:5173/done"), "/", &[])
            .is_none());
    }

    #[test]
    fn test_protocol_relative_and_odd_schemes_rejected() {
        assert!(policy()
            .build_redirect_url(Some("//evil.com/x"), "/", &[])
            .is_none());
        assert!(policy()
            .build_redirect_url(Some("javascript:alert(1)"), "/", &[])
            .is_none());
    }

    #[test]
    fn test_params_are_url_encoded() {
        let url = policy()
            .build_redirect_url(Some("/done"), "/", &[("status", "paid & done")])
            .unwrap();
        assert!(url.ends_with("status=paid%20%26%20done"));
    }
}
