use crate::errno::Errno;
use alloc::borrow::Cow;
use core::fmt::{Debug, Display};

/// Error types used throughout the `mmapper` library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request was rejected by the registry itself, before reaching the provider.
    ///
    /// This covers:
    /// * A zero length passed to `map`
    /// * A view whose length differs from its capacity (a sub-view)
    /// * A view that does not correspond to an active mapping of this registry
    InvalidArgument {
        /// Which check failed.
        msg: Cow<'static, str>,
    },

    /// The provider reported an OS error. The code is passed through unchanged.
    Os(Errno),
}

impl Error {
    /// The errno equivalent of this error.
    ///
    /// Locally rejected requests report `EINVAL`, matching what the OS itself
    /// would return for a bad mapping argument.
    #[inline]
    pub fn errno(&self) -> Errno {
        match self {
            Error::InvalidArgument { .. } => Errno::EINVAL,
            Error::Os(errno) => *errno,
        }
    }

    /// Whether the registry rejected the request without calling the provider.
    #[inline]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidArgument { msg } => write!(f, "Invalid argument: {msg}"),
            Error::Os(errno) => write!(f, "{errno}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<Errno> for Error {
    #[inline]
    fn from(errno: Errno) -> Self {
        Error::Os(errno)
    }
}

/// Creates an invalid-argument error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn invalid_argument(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::InvalidArgument { msg: msg.into() }
}
