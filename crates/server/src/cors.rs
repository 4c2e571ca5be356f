use anyhow::Context;
use ascii::AsciiString;
use config::{AnyOrAsciiStringArray, AnyOrHttpMethodArray, AnyOrUrlArray, CorsConfig};
use http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer, ExposeHeaders};
use url::Url;

/// Builds the CORS layer. Origins containing glob characters are matched as patterns.
pub(crate) fn generate(
    CorsConfig {
        allow_credentials,
        allow_origins,
        max_age,
        allow_methods,
        allow_headers,
        expose_headers,
    }: &CorsConfig,
) -> anyhow::Result<CorsLayer> {
    let mut cors_layer = CorsLayer::new().allow_credentials(*allow_credentials);

    if let Some(allow_origins) = allow_origins {
        cors_layer = cors_layer.allow_origin(match allow_origins {
            AnyOrUrlArray::Any => AllowOrigin::any(),
            AnyOrUrlArray::Explicit(origins) => origin_matcher(origins)?,
        });
    }

    if let Some(max_age) = max_age {
        cors_layer = cors_layer.max_age(*max_age);
    }

    if let Some(allow_methods) = allow_methods {
        cors_layer = cors_layer.allow_methods(match allow_methods {
            AnyOrHttpMethodArray::Any => AllowMethods::any(),
            AnyOrHttpMethodArray::Explicit(methods) => {
                let mut methods: Vec<Method> = methods.iter().map(|method| Method::from(*method)).collect();

                // Preflight requests must always be answerable.
                if !methods.contains(&Method::OPTIONS) {
                    methods.push(Method::OPTIONS);
                }

                AllowMethods::list(methods)
            }
        });
    }

    if let Some(allow_headers) = allow_headers {
        cors_layer = cors_layer.allow_headers(match allow_headers {
            AnyOrAsciiStringArray::Any => AllowHeaders::any(),
            AnyOrAsciiStringArray::Explicit(headers) => AllowHeaders::list(header_names(headers, "allow_headers")?),
        });
    }

    if let Some(expose_headers) = expose_headers {
        cors_layer = cors_layer.expose_headers(match expose_headers {
            AnyOrAsciiStringArray::Any => ExposeHeaders::any(),
            AnyOrAsciiStringArray::Explicit(headers) => ExposeHeaders::list(header_names(headers, "expose_headers")?),
        });
    }

    Ok(cors_layer)
}

fn origin_matcher(origins: &[Url]) -> anyhow::Result<AllowOrigin> {
    let mut constants = Vec::new();
    let mut globs = Vec::new();

    for origin in origins {
        let origin = &origin[..url::Position::BeforePath];

        if origin.chars().any(|c| "?*[]{}!\\".contains(c)) {
            globs.push(origin.to_owned());
        } else {
            let value = HeaderValue::from_str(origin)
                .with_context(|| format!("server.cors.allow_origins: invalid origin {origin}"))?;

            constants.push(value);
        }
    }

    if globs.is_empty() {
        return Ok(AllowOrigin::list(constants));
    }

    Ok(AllowOrigin::predicate(move |origin, _| {
        constants.iter().any(|constant| origin == constant)
            || origin
                .to_str()
                .is_ok_and(|origin| globs.iter().any(|glob| fast_glob::glob_match(glob, origin)))
    }))
}

fn header_names(headers: &[AsciiString], setting: &str) -> anyhow::Result<Vec<HeaderName>> {
    headers
        .iter()
        .map(|header| {
            HeaderName::from_bytes(header.as_bytes())
                .with_context(|| format!("server.cors.{setting}: invalid header name '{header}'"))
        })
        .collect()
}
