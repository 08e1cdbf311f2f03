/// Runtime failures raised by generated loaders

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// The error type installers return.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// One installer failed. Produced by the generated loader by wrapping the
/// error the installer returned, never by installers themselves.
#[derive(Error, Debug)]
#[error("installer `{installer}` failed during execution")]
pub struct InstallerError {
    installer: String,
    #[source]
    source: BoxError,
}

impl InstallerError {
    pub fn wrap(installer: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            installer: installer.into(),
            source: source.into(),
        }
    }

    /// Fully-qualified name of the installer that failed
    pub fn installer(&self) -> &str {
        &self.installer
    }

    /// The error the installer returned
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Every installer failure from one `load_all` call, in invocation order.
#[derive(Error, Debug)]
pub struct AggregateInstallError {
    failures: Vec<InstallerError>,
}

impl AggregateInstallError {
    /// `Ok(())` when nothing failed, otherwise the aggregate.
    pub fn check(failures: Vec<InstallerError>) -> Result<(), Self> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self { failures })
        }
    }

    pub fn failures(&self) -> &[InstallerError] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<InstallerError> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregateInstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} installer(s) failed:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {}", failure.installer, failure.source)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_empty_is_ok() {
        assert!(AggregateInstallError::check(Vec::new()).is_ok());
    }

    #[test]
    fn test_wrap_keeps_name_and_source() {
        let err = InstallerError::wrap("app::DbInstaller", "connection refused");
        assert_eq!(err.installer(), "app::DbInstaller");
        assert_eq!(err.inner().to_string(), "connection refused");
        assert_eq!(
            err.to_string(),
            "installer `app::DbInstaller` failed during execution"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_aggregate_preserves_order() {
        let aggregate = AggregateInstallError::check(vec![
            InstallerError::wrap("a::First", "one"),
            InstallerError::wrap("b::Second", "two"),
        ])
        .unwrap_err();

        let names: Vec<_> = aggregate.failures().iter().map(|f| f.installer()).collect();
        assert_eq!(names, ["a::First", "b::Second"]);
        assert_eq!(aggregate.len(), 2);
        assert_eq!(
            aggregate.to_string(),
            "2 installer(s) failed:\n  - a::First: one\n  - b::Second: two"
        );
    }
}
