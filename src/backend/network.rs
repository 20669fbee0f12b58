//! See [`NetworkErrorCause`].

use std::{error::Error as StdError, io, iter, net::IpAddr};

use serde::Serialize;
use serde_with::skip_serializing_none;

/// The message `hyper`'s connector gives a failed name lookup.
const DNS_ERROR_MESSAGE: &str = "dns error";

/// The message the system resolver gives a failed name lookup.
const LOOKUP_FAILED_MESSAGE: &str = "failed to lookup address information";

/// The low-level cause of a failed connection to the data service, broken into the fields an
/// operator needs to tell a DNS failure from a refused connection from a timeout.
#[skip_serializing_none]
#[derive(Serialize, Clone, PartialEq, Eq, Default, Debug)]
pub struct NetworkErrorCause {
    /// The kind of failure, e.g. `ConnectionRefused`.
    pub name: Option<String>,

    /// The symbolic OS error code, e.g. `ECONNREFUSED`.
    pub code: Option<&'static str>,

    /// The raw OS error number.
    pub errno: Option<i32>,

    /// The operation that failed.
    pub syscall: Option<&'static str>,

    /// The host that was being contacted.
    pub hostname: Option<String>,

    /// The IP address that was being contacted, when the host is an IP literal.
    pub address: Option<String>,

    /// The port that was being contacted.
    pub port: Option<u16>,
}

impl NetworkErrorCause {
    /// Extracts the cause from a `reqwest` error by walking its source chain for an I/O error.
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let io_error = find_io_error(error);
        let dns_failure = is_dns_failure(error);

        let name = if error.is_timeout() {
            Some("TimedOut".into())
        } else if dns_failure {
            Some("DnsLookupFailed".into())
        } else {
            io_error.map(|io_error| format!("{:?}", io_error.kind()))
        };

        let code = if dns_failure {
            Some("ENOTFOUND")
        } else {
            io_error.and_then(|io_error| errno_name(io_error.kind()))
        };

        let syscall = if dns_failure {
            Some("getaddrinfo")
        } else if error.is_connect() {
            Some("connect")
        } else if error.is_request() || error.is_body() {
            Some("write")
        } else {
            None
        };

        let url = error.url();
        let hostname = url.and_then(|url| url.host_str()).map(str::to_owned);

        Self {
            name,
            code,
            errno: io_error.and_then(io::Error::raw_os_error),
            syscall,
            address: hostname
                .as_deref()
                .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
                .and_then(|host| host.parse::<IpAddr>().ok())
                .map(|address| address.to_string()),
            hostname,
            port: url.and_then(reqwest::Url::port_or_known_default),
        }
    }
}

/// Iterates over an error and everything in its source chain.
fn chain<'a>(
    error: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    iter::successors(Some(error), |&error| error.source())
}

/// Finds the first [`io::Error`] in an error's source chain.
fn find_io_error(error: &reqwest::Error) -> Option<&io::Error> {
    chain(error).find_map(|error| error.downcast_ref::<io::Error>())
}

/// Checks whether an error's source chain contains a failed host name lookup.
fn is_dns_failure(error: &(dyn StdError + 'static)) -> bool {
    chain(error).any(|error| {
        let message = error.to_string();
        message.starts_with(DNS_ERROR_MESSAGE) || message.contains(LOOKUP_FAILED_MESSAGE)
    })
}

/// Maps an I/O error kind to its conventional POSIX error name.
fn errno_name(kind: io::ErrorKind) -> Option<&'static str> {
    Some(match kind {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::PermissionDenied => "EACCES",
        _ => return None,
    })
}
