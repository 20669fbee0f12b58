//! Utilities to help with API request validation.

use std::{fmt::Display, str::FromStr};

use derive_more::derive::{AsRef, Deref, Display};
use serde::{Deserialize, Serialize};
use serde_with::SerializeDisplay;
use thiserror::Error;

use crate::api;

/// A map's URL-safe identifier.
pub type MapSlug = BoundedString<1, 256>;

/// A [`String`] newtype that guarantees its length is within a certain range.
#[derive(
    Deref,
    AsRef,
    Display,
    Deserialize,
    SerializeDisplay,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
)]
#[as_ref(forward)]
#[serde(try_from = "String")]
pub struct BoundedString<const MIN: usize, const MAX: usize>(String);

impl<const MIN: usize, const MAX: usize> BoundedString<MIN, MAX> {
    /// Gets a reference to the wrapped string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the [`BoundedString`], returning the wrapped [`String`].
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// An error constructing a [`BoundedString`].
#[derive(Error, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BoundedStringError<const MIN: usize, const MAX: usize> {
    /// The length was less than the [`BoundedString`]'s `MIN`.
    #[error("invalid length {0}, expected at least {MIN}")]
    TooShort(usize),

    /// The length was greater than the [`BoundedString`]'s `MAX`.
    #[error("invalid length {0}, expected at most {MAX}")]
    TooLong(usize),
}

impl<const MIN: usize, const MAX: usize> TryFrom<String> for BoundedString<MIN, MAX> {
    type Error = BoundedStringError<MIN, MAX>;

    fn try_from(string: String) -> Result<Self, Self::Error> {
        if string.len() < MIN {
            Err(BoundedStringError::TooShort(string.len()))
        } else if string.len() > MAX {
            Err(BoundedStringError::TooLong(string.len()))
        } else {
            Ok(Self(string))
        }
    }
}

/// A finite `f64` parsed from a query parameter. Surrounding whitespace is ignored.
#[derive(Deref, Display, Serialize, Clone, Copy, PartialEq, PartialOrd, Debug)]
#[serde(transparent)]
pub struct Finite(f64);

impl Finite {
    /// Gets the wrapped number.
    pub fn get(self) -> f64 {
        self.0
    }
}

/// An error parsing a [`Finite`].
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("`{0}` isn't a finite number")]
pub struct NotFiniteError(String);

impl FromStr for Finite {
    type Err = NotFiniteError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        // `f64::from_str` accepts `inf` and `NaN`, which would be meaningless coordinates.
        match str.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Self(number)),
            _ => Err(NotFiniteError(str.into())),
        }
    }
}

/// An axis-aligned longitude/latitude rectangle.
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    /// The west edge.
    pub min_lon: f64,

    /// The south edge.
    pub min_lat: f64,

    /// The east edge.
    pub max_lon: f64,

    /// The north edge.
    pub max_lat: f64,
}

/// An error parsing a [`BoundingBox`].
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum BoundingBoxError {
    /// There weren't exactly four components.
    #[error("expected 4 comma-separated numbers, found {0}")]
    Count(usize),

    /// A component wasn't a finite number.
    #[error(transparent)]
    NotFinite(#[from] NotFiniteError),
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxError;

    /// Parses `minLon,minLat,maxLon,maxLat`.
    fn from_str(str: &str) -> Result<Self, Self::Err> {
        let components = str
            .split(',')
            .map(|component| component.parse::<Finite>().map(Finite::get))
            .collect::<Result<Vec<_>, _>>();

        let count = str.split(',').count();

        match components?.as_slice() {
            &[min_lon, min_lat, max_lon, max_lat] => Ok(Self {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            }),
            _ => Err(BoundingBoxError::Count(count)),
        }
    }
}

/// Parses a comma-separated tag filter, dropping empty segments and keeping order. Returns `None`
/// (no filter) when the parameter is absent or has no tags, which the backend treats differently
/// from an empty list.
pub fn parse_tags(tags: Option<&str>) -> Option<Vec<String>> {
    let tags: Vec<String> = tags?
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(Into::into)
        .collect();

    (!tags.is_empty()).then_some(tags)
}

/// Requires a query parameter to be present and non-empty.
///
/// # Errors
///
/// Returns [`api::Error::MissingParam`] naming the field otherwise.
pub(crate) fn required(field: &'static str, value: Option<String>) -> Result<String, api::Error> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(api::Error::MissingParam(field))
}

/// Requires a parameter to be a valid [`MapSlug`].
///
/// # Errors
///
/// Returns a validation error naming the field if it's missing or too long.
pub(crate) fn required_slug(
    field: &'static str,
    value: Option<String>,
) -> Result<MapSlug, api::Error> {
    let value = required(field, value)?;

    MapSlug::try_from(value).map_err(|error| invalid(field, error))
}

/// Parses a parameter's value, naming the field in the error if it's malformed.
///
/// # Errors
///
/// Returns [`api::Error::InvalidParam`] if parsing fails.
pub(crate) fn parse_field<T>(field: &'static str, value: &str) -> Result<T, api::Error>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|error| invalid(field, error))
}

/// Builds an [`api::Error::InvalidParam`].
pub(crate) fn invalid<E: Display>(field: &'static str, reason: E) -> api::Error {
    api::Error::InvalidParam {
        field,
        reason: reason.to_string(),
    }
}
