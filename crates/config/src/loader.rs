use std::{fmt::Write, path::Path, str::FromStr};

use anyhow::{Context, bail};
use indoc::indoc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_dynamic_string::DynamicString;
use toml::Value;

use crate::Config;

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config = from_str(&content)?;

    for warning in validate(&config)? {
        log::warn!("{warning}");
    }

    Ok(config)
}

fn from_str(content: &str) -> anyhow::Result<Config> {
    let mut raw_config: Value = toml::from_str(content)?;
    expand_dynamic_strings(&mut Vec::new(), &mut raw_config)?;

    Ok(Config::deserialize(raw_config)?)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<Vec<String>> {
    let mut warnings = Vec::new();

    match &config.server.auth {
        Some(auth) => {
            let secret_len = auth.secret.expose_secret().len();

            if secret_len == 0 {
                bail!("server.auth.secret must not be empty");
            }

            let recommended = auth.algorithm.recommended_secret_len();

            if secret_len < recommended {
                warnings.push(format!(
                    "server.auth.secret is {secret_len} bytes long, {} secrets should be at least {recommended} bytes",
                    auth.algorithm
                ));
            }
        }
        None => bail!(indoc! {r#"
            No token verification configured. Every authenticated route would reject all requests.

            Example configuration:

              [server.auth]
              secret = "{{ env.HRGATE_JWT_SECRET }}"
              algorithm = "HS256"
        "#}),
    }

    let limits = &config.server.rate_limits;

    if limits.enabled {
        if !limits.rate.is_finite() || limits.rate < 0.0 {
            bail!("server.rate_limits.rate must be a finite, non-negative number, got {}", limits.rate);
        }

        if limits.burst == 0 {
            bail!("server.rate_limits.burst must be at least 1");
        }

        if limits.idle_timeout.is_zero() {
            bail!("server.rate_limits.idle_timeout must be greater than zero");
        }

        if limits.sweep_interval.is_zero() {
            bail!("server.rate_limits.sweep_interval must be greater than zero");
        }

        if limits.sweep_interval > limits.idle_timeout {
            warnings.push(format!(
                "server.rate_limits.sweep_interval ({:?}) is longer than idle_timeout ({:?}), idle clients will linger",
                limits.sweep_interval, limits.idle_timeout
            ));
        }
    }

    Ok(warnings)
}

fn expand_dynamic_strings<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> anyhow::Result<()> {
    match value {
        Value::String(s) => match DynamicString::<String>::from_str(s) {
            Ok(out) => *s = out.into_inner(),
            Err(err) => {
                let mut p = String::new();

                for segment in path {
                    match segment {
                        Ok(s) => {
                            p.push_str(s);
                            p.push('.');
                        }
                        Err(i) => write!(p, "[{i}]")?,
                    }
                }

                if p.ends_with('.') {
                    p.pop();
                }

                bail!("Failed to expand dynamic string at path '{p}': {err}");
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}
