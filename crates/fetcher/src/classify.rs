use otto_core::{SiteWideFailure, UrlSpecificFailure};

/// Classify a non-2xx HTTP response. All `5xx` statuses are treated as
/// potentially site-wide (the origin server itself is failing); `4xx` is
/// always specific to this one URL.
pub fn classify_status(status: u16, reason: &str) -> ClassifiedFailure {
    if status >= 500 {
        ClassifiedFailure::SiteWide(SiteWideFailure {
            reason: format!("HTTP {status} {reason}"),
        })
    } else {
        ClassifiedFailure::UrlSpecific(UrlSpecificFailure {
            status_code: Some(status),
            reason: format!("HTTP {status} {reason}"),
        })
    }
}

/// Classify a transport-level failure (connect error, timeout, TLS error,
/// too many redirects). These never carry a status code and are always
/// treated as potentially site-wide, matching the upstream behavior of
/// never retrying them locally — the main loop re-enqueues and lets the
/// circuit breaker decide.
pub fn classify_transport_error(err: &reqwest::Error) -> SiteWideFailure {
    let kind = if err.is_timeout() {
        "Timeout"
    } else if err.is_connect() {
        "ConnectError"
    } else if err.is_redirect() {
        "TooManyRedirects"
    } else {
        "RequestError"
    };
    SiteWideFailure {
        reason: format!("{kind}: {err}"),
    }
}

pub enum ClassifiedFailure {
    SiteWide(SiteWideFailure),
    UrlSpecific(UrlSpecificFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_500_and_above_is_site_wide() {
        assert!(matches!(
            classify_status(500, "Internal Server Error"),
            ClassifiedFailure::SiteWide(_)
        ));
        assert!(matches!(
            classify_status(503, "Service Unavailable"),
            ClassifiedFailure::SiteWide(_)
        ));
    }

    #[test]
    fn status_4xx_is_url_specific() {
        match classify_status(404, "Not Found") {
            ClassifiedFailure::UrlSpecific(f) => assert_eq!(f.status_code, Some(404)),
            _ => panic!("expected url-specific failure"),
        }
    }
}
