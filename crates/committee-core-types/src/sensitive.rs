//! Redaction wrapper for personal data that must not reach the logs
//!
//! Member e-mail addresses travel through log fields as `Sensitive<&str>`;
//! only the domain part survives formatting.

use std::fmt;

/// Wrapper that redacts its value in Debug and Display
///
/// # Example
///
/// ```
/// use committee_core_types::Sensitive;
///
/// let email = Sensitive::new("jane@example.org");
/// assert_eq!(format!("{}", email), "***@example.org");
/// assert_eq!(email.expose(), &"jane@example.org");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: AsRef<str>> Sensitive<T> {
    fn redacted(&self) -> String {
        match self.0.as_ref().rsplit_once('@') {
            Some((_, domain)) if !domain.is_empty() => format!("***@{}", domain),
            _ => "***REDACTED***".to_string(),
        }
    }
}

impl<T: AsRef<str>> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: AsRef<str>> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
