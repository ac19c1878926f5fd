//! Error identities and the wrap relation.
//!
//! An [`ErrorId`] is a sentinel value: two ids are equal only if one is a
//! clone of the other, regardless of their message. An id may wrap a more
//! general id, and that wrapped id is exposed through
//! [`std::error::Error::source`], so any application error whose source chain
//! reaches an `ErrorId` can be classified with [`matches`].

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::iter;
use std::sync::Arc;

/// Opaque, comparable error identity.
#[derive(Clone)]
pub struct ErrorId {
    inner: Arc<Inner>,
}

struct Inner {
    message: Cow<'static, str>,
    wraps: Option<ErrorId>,
}

impl ErrorId {
    /// Create a root-cause identity.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                message: message.into(),
                wraps: None,
            }),
        }
    }

    /// Create an identity deriving from `inner`.
    pub fn wrap(message: impl Into<Cow<'static, str>>, inner: &ErrorId) -> Self {
        Self {
            inner: Arc::new(Inner {
                message: message.into(),
                wraps: Some(inner.clone()),
            }),
        }
    }

    /// The message this identity was created with, without the wrapped part.
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// The identity directly wrapped by this one.
    pub fn wrapped(&self) -> Option<&ErrorId> {
        self.inner.wraps.as_ref()
    }

    /// Whether `other` is this identity or appears in its wrap chain.
    pub fn matches(&self, other: &ErrorId) -> bool {
        iter::successors(Some(self), |&id| id.wrapped()).any(|id| id == other)
    }

    /// Number of identities this one wraps, transitively.
    pub fn wrap_depth(&self) -> usize {
        iter::successors(self.wrapped(), |&id| id.wrapped()).count()
    }
}

impl PartialEq for ErrorId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ErrorId {}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.wraps {
            Some(inner) => write!(f, "{}: {}", self.inner.message, inner),
            None => f.write_str(&self.inner.message),
        }
    }
}

impl fmt::Debug for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorId")
            .field("message", &self.inner.message)
            .field("wraps", &self.inner.wraps)
            .finish()
    }
}

impl Error for ErrorId {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.wraps.as_ref().map(|id| id as &(dyn Error + 'static))
    }
}

/// Iterate the source chain of `err`, starting with `err` itself.
pub fn chain<'a>(
    err: &'a (dyn Error + 'static),
) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    iter::successors(Some(err), |&e| e.source())
}

/// Whether `err` is `id` or wraps it somewhere along its source chain.
pub fn matches(err: &(dyn Error + 'static), id: &ErrorId) -> bool {
    chain(err).any(|e| e.downcast_ref::<ErrorId>() == Some(id))
}
