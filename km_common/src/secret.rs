use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A wrapper that keeps sensitive values (bank account numbers, API keys) out of logs.
/// The value is only accessible via [`Secret::reveal`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl Secret<String> {
    /// A redacted rendering that keeps the last four characters, e.g. `****6789`.
    pub fn masked_tail(&self) -> String {
        let tail_at = self.value.char_indices().rev().nth(3).map(|(i, _)| i).unwrap_or(0);
        format!("****{}", &self.value[tail_at..])
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<S: Into<String>> From<S> for Secret<String> {
    fn from(value: S) -> Self {
        Self::new(value.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_do_not_leak_in_logs() {
        let secret = Secret::new("0011223344".to_string());
        assert_eq!(format!("{secret}"), "****");
        assert_eq!(format!("{secret:?}"), "****");
        assert_eq!(secret.masked_tail(), "****3344");
        assert_eq!(secret.reveal(), "0011223344");
    }
}
