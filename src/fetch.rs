use crate::error::FetchError;
use std::path::Path;

/// Read side of an object store connection.
///
/// `source` is `bucket` or `bucket/key`. With `recursive` set, everything
/// under `source` is copied into the `destination` directory, otherwise the
/// single object is written to `destination`. Implementations block until the
/// transfer is done.
#[cfg_attr(test, mockall::automock)]
pub trait Fetch {
    fn fetch(&self, source: &str, destination: &Path, recursive: bool) -> Result<(), FetchError>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn fetch(&self, source: &str, destination: &Path, recursive: bool) -> Result<(), FetchError> {
        (**self).fetch(source, destination, recursive)
    }
}
