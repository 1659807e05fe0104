//! Requests and request bodies.
//!
//! A request may be sent more than once when a retry policy is in the
//! pipeline, so its body must be replayable from the start. Buffered bodies
//! are; one-shot streams are not, and [`Request::try_clone`] reports it.

use crate::error::{Error, Result};

use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, IntoHeaderName, CONTENT_LENGTH};
use reqwest::{Method, Url};
use std::fmt;
use std::sync::Mutex;

/// A request body.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Empty,
    Bytes(Bytes),
    Stream {
        stream: Mutex<Option<BoxStream<'static, Result<Bytes>>>>,
        length: Option<u64>,
    },
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }

    /// A one-shot streaming body. It cannot be replayed, so it is refused by
    /// pipelines that retry.
    pub fn wrap_stream(stream: BoxStream<'static, Result<Bytes>>, length: Option<u64>) -> Self {
        Self {
            inner: Inner::Stream {
                stream: Mutex::new(Some(stream)),
                length,
            },
        }
    }

    /// Byte length of the body, if known.
    pub fn len(&self) -> Option<u64> {
        match &self.inner {
            Inner::Empty => Some(0),
            Inner::Bytes(bytes) => Some(bytes.len() as u64),
            Inner::Stream { length, .. } => *length,
        }
    }

    /// Whether the body is known to be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Whether the body can be read again from the start.
    pub fn is_replayable(&self) -> bool {
        !matches!(self.inner, Inner::Stream { .. })
    }

    /// The buffered bytes, if the body is buffered.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Inner::Empty => Some(&[]),
            Inner::Bytes(bytes) => Some(bytes),
            Inner::Stream { .. } => None,
        }
    }

    /// A copy positioned at the start, if the body is replayable.
    pub fn try_clone(&self) -> Option<Self> {
        match &self.inner {
            Inner::Empty => Some(Self::empty()),
            Inner::Bytes(bytes) => Some(Self::from(bytes.clone())),
            Inner::Stream { .. } => None,
        }
    }

    fn into_reqwest(self) -> Option<reqwest::Body> {
        match self.inner {
            Inner::Empty => None,
            Inner::Bytes(bytes) => Some(reqwest::Body::from(bytes)),
            Inner::Stream { stream, .. } => stream
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .map(reqwest::Body::wrap_stream),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Empty => f.write_str("Body::Empty"),
            Inner::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
            Inner::Stream { length, .. } => {
                f.debug_struct("Body::Stream").field("length", length).finish()
            }
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            inner: Inner::Bytes(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

/// A request travelling through the pipeline.
///
/// Header names are case-insensitive and inserting a header replaces any
/// previous value for that name.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    /// Gets the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Gets the target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Gets the target URL mutably, e.g. to re-target another host.
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Gets the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets the headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous value.
    pub fn insert_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Sets a header from a string value, replacing any previous value.
    pub fn insert_header_str(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            Error::InvalidArgument(format!("invalid value for header {}: {}", name, e))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Builder-style [`insert_header`](Request::insert_header).
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Gets the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Builder-style [`set_body`](Request::set_body).
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// A copy of the request with its body rewound, if the body is replayable.
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
        })
    }

    /// Converts into the reqwest representation handed to the transport.
    pub fn into_reqwest(self) -> reqwest::Request {
        let length = self.body.len();
        let mut request = reqwest::Request::new(self.method, self.url);
        *request.headers_mut() = self.headers;
        if let Some(length) = length {
            if length > 0 && !request.headers().contains_key(CONTENT_LENGTH) {
                request
                    .headers_mut()
                    .insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
        }
        *request.body_mut() = self.body.into_reqwest();
        request
    }
}
