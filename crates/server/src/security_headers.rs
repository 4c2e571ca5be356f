use anyhow::Context;
use config::SecurityHeadersConfig;
use http::{
    HeaderName, HeaderValue,
    header::{CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
};
use tower_http::set_header::SetResponseHeaderLayer;

/// One layer per header. Values a handler already set are kept.
pub(crate) fn layers(config: &SecurityHeadersConfig) -> anyhow::Result<Vec<SetResponseHeaderLayer<HeaderValue>>> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let csp = HeaderValue::from_str(&config.content_security_policy)
        .context("server.security_headers.content_security_policy is not a valid header value")?;

    let mut headers: Vec<(HeaderName, HeaderValue)> = vec![
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (CONTENT_SECURITY_POLICY, csp),
    ];

    if let Some(max_age) = config.hsts_max_age {
        let value = format!("max-age={}; includeSubDomains", max_age.as_secs());
        headers.push((STRICT_TRANSPORT_SECURITY, HeaderValue::from_str(&value)?));
    }

    Ok(headers
        .into_iter()
        .map(|(name, value)| SetResponseHeaderLayer::if_not_present(name, value))
        .collect())
}
