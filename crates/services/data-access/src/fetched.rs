//! List results that never come back empty-handed.

use common::{AppError, AppResult};

/// Result of a list read: the rows, or an empty collection plus the error.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub error: Option<AppError>,
}

impl<T> Fetched<T> {
    pub fn ok(data: T) -> Self {
        Self { data, error: None }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Back to a `Result` for callers that retry on error
    pub fn into_result(self) -> AppResult<T> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

impl<T: Default> Fetched<T> {
    pub fn failed(error: AppError) -> Self {
        Self {
            data: T::default(),
            error: Some(error),
        }
    }
}

impl<T: Default> From<AppResult<T>> for Fetched<T> {
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(data) => Fetched::ok(data),
            Err(err) => Fetched::failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_empty_collection() {
        let fetched: Fetched<Vec<u8>> = Err(AppError::network("offline")).into();
        assert!(fetched.data.is_empty());
        assert!(!fetched.is_ok());
        assert_eq!(fetched.into_result(), Err(AppError::network("offline")));

        assert_eq!(Fetched::ok(vec![1u8]).into_result(), Ok(vec![1u8]));
    }
}
