//! nodewatch-http: the one HTTP client shared by dashboard probes and
//! webhook delivery.
//!
//! Every request opens a fresh HTTP/1.1 connection, over TCP for `http://`
//! and over rustls for `https://`. [`HttpClient::get`] follows redirects
//! up to a bounded number of hops.

pub mod client;
pub mod error;
pub mod redirect;
pub mod tls;

pub use client::HttpClient;
pub use error::{HttpError, HttpResult};
pub use redirect::DEFAULT_MAX_REDIRECTS;
