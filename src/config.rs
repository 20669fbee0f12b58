//! Process configuration, read from the environment once at startup and passed down explicitly.

use std::{fmt::Display, str::FromStr, time::Duration};

use reqwest::Url;
use thiserror::Error;

use crate::geojson::StyleFallbacks;

/// The address the server listens on when `ADDRESS` isn't set.
const DEFAULT_ADDRESS: &str = "127.0.0.1:3000";

/// The base map style used when a map doesn't specify its own.
const DEFAULT_MAP_STYLE_URL: &str = "https://api.maptiler.com/maps/streets/style.json";

/// All settings the server needs to run.
#[derive(Clone, Debug)]
pub struct Config {
    /// The socket address to listen on.
    pub address: String,

    /// How to reach the hosted data service.
    pub backend: BackendConfig,

    /// Style values used when neither a POI nor its map specify one.
    pub fallbacks: StyleFallbacks,

    /// The default base map style for map pages.
    pub map_style: MapStyle,
}

/// Connection settings for the hosted data service.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// The project's base URL, without a trailing slash.
    pub url: String,

    /// The anonymous API key sent with every request.
    pub anon_key: String,

    /// An optional timeout for each outbound request. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// The default base map style.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MapStyle {
    /// The style document URL.
    pub url: String,

    /// The key appended to the style URL's query.
    pub key: String,
}

impl MapStyle {
    /// Returns the full style URL including its key.
    pub fn style_url(&self) -> String {
        format!("{}?key={}", self.url, self.key)
    }
}

/// An error loading the [`Config`].
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required variable wasn't set.
    #[error("environment variable `{0}` should be set")]
    Missing(&'static str),

    /// A variable was set to something that couldn't be parsed.
    #[error("environment variable `{var}` is invalid: {reason}")]
    Invalid {
        /// The variable's name.
        var: &'static str,

        /// Why the value was rejected.
        reason: String,
    },
}

impl Config {
    /// Loads the configuration from the process environment, including a `.env` file if one
    /// exists.
    ///
    /// # Errors
    ///
    /// Fails if a required variable is missing or any variable is malformed.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|key| dotenvy::var(key).ok())
    }

    /// Loads the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails if a required variable is missing or any variable is malformed.
    pub fn from_vars<F>(var: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            var(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(Error::Missing(key))
        };

        let url = required("SUPABASE_URL")?;
        Url::parse(&url).map_err(|error| invalid("SUPABASE_URL", error))?;

        let timeout =
            parse_optional::<u64, _>(&var, "BACKEND_TIMEOUT_SECS")?.map(Duration::from_secs);

        let icon_size = parse_optional::<f64, _>(&var, "DEFAULT_POI_ICON_SIZE")?
            .unwrap_or(StyleFallbacks::DEFAULT_ICON_SIZE);

        if !icon_size.is_finite() {
            return Err(invalid("DEFAULT_POI_ICON_SIZE", "expected a finite number"));
        }

        Ok(Self {
            address: var("ADDRESS").unwrap_or_else(|| DEFAULT_ADDRESS.into()),
            backend: BackendConfig {
                url: url.trim_end_matches('/').into(),
                anon_key: required("SUPABASE_ANON_KEY")?,
                timeout,
            },
            fallbacks: StyleFallbacks {
                color: var("DEFAULT_POI_COLOR")
                    .unwrap_or_else(|| StyleFallbacks::DEFAULT_COLOR.into()),
                icon_size,
            },
            map_style: MapStyle {
                url: var("MAP_STYLE_URL").unwrap_or_else(|| DEFAULT_MAP_STYLE_URL.into()),
                key: var("MAP_STYLE_KEY").unwrap_or_default(),
            },
        })
    }
}

/// Parses a variable that may be left unset.
fn parse_optional<T, F>(var: &F, key: &'static str) -> Result<Option<T>, Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    var(key)
        .map(|value| value.trim().parse().map_err(|error| invalid(key, error)))
        .transpose()
}

/// Builds an [`Error::Invalid`].
fn invalid<E: Display>(var: &'static str, reason: E) -> Error {
    Error::Invalid {
        var,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();

        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_values() -> anyhow::Result<()> {
        let config = Config::from_vars(vars(&[
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))?;

        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.backend.url, "https://project.supabase.co");
        assert_eq!(config.backend.timeout, None);
        assert_eq!(config.fallbacks, StyleFallbacks::default());
        assert_eq!(
            config.map_style.style_url(),
            "https://api.maptiler.com/maps/streets/style.json?key="
        );

        Ok(())
    }

    #[test]
    fn overrides_are_applied() -> anyhow::Result<()> {
        let config = Config::from_vars(vars(&[
            ("ADDRESS", "0.0.0.0:8080"),
            ("SUPABASE_URL", "http://localhost:54321"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("DEFAULT_POI_COLOR", "rgba(90, 90, 90, 1)"),
            ("DEFAULT_POI_ICON_SIZE", "1.25"),
            ("BACKEND_TIMEOUT_SECS", "10"),
            ("MAP_STYLE_KEY", "secret"),
        ]))?;

        assert_eq!(config.address, "0.0.0.0:8080");
        assert_eq!(config.fallbacks.color, "rgba(90, 90, 90, 1)");
        assert!((config.fallbacks.icon_size - 1.25).abs() < f64::EPSILON);
        assert_eq!(config.backend.timeout, Some(Duration::from_secs(10)));
        assert!(config.map_style.style_url().ends_with("?key=secret"));

        Ok(())
    }

    #[test]
    fn missing_and_invalid_variables_are_named() {
        let missing = Config::from_vars(vars(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .expect_err("anon key should be required");
        assert_eq!(missing, Error::Missing("SUPABASE_ANON_KEY"));

        let blank = Config::from_vars(vars(&[
            ("SUPABASE_URL", "  "),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .expect_err("blank URL should count as missing");
        assert_eq!(blank, Error::Missing("SUPABASE_URL"));

        let invalid = Config::from_vars(vars(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("BACKEND_TIMEOUT_SECS", "soon"),
        ]))
        .expect_err("timeout should be numeric");
        assert!(matches!(
            invalid,
            Error::Invalid {
                var: "BACKEND_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
