//! Module for handling the [`percent_encoding`] crate.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

/// All ASCII characters in the [component percent-encode
/// set](https://url.spec.whatwg.org/#component-percent-encode-set).
///
/// Using this with [`utf8_percent_encode`](percent_encoding::utf8_percent_encode) gives identical
/// results to JavaScript's
/// [`encodeURIComponent`](https://developer.mozilla.org/docs/Web/JavaScript/Reference/Global_Objects/encodeURIComponent),
/// so user-supplied values can't inject extra filters into a PostgREST query string.
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[cfg(test)]
mod tests {
    use percent_encoding::utf8_percent_encode;

    use super::*;

    #[test]
    fn query_delimiters_are_encoded() {
        assert_eq!(
            utf8_percent_encode("demo-tokyo&select=*", COMPONENT).to_string(),
            "demo-tokyo%26select%3D*"
        );
        assert_eq!(
            utf8_percent_encode("東京", COMPONENT).to_string(),
            "%E6%9D%B1%E4%BA%AC"
        );
    }
}
