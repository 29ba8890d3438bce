use std::fmt;
use std::str;

/// A plaintext secret that overwrites its backing buffer when dropped.
/// The teacher has no zeroizing primitive of its own; this is a narrow,
/// hand-rolled equivalent scoped to exactly the lifetime a signing call
/// needs the plaintext for.
pub struct PlaintextSecret(Vec<u8>);

impl PlaintextSecret {
    pub fn new(value: String) -> Self {
        Self(value.into_bytes())
    }

    pub fn expose(&self) -> &str {
        str::from_utf8(&self.0).expect("PlaintextSecret only ever constructed from a String")
    }
}

impl Drop for PlaintextSecret {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|byte| *byte = 0);
    }
}

impl fmt::Debug for PlaintextSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PlaintextSecret").field(&"***").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let secret = PlaintextSecret::new("top-secret-key".into());
        assert_eq!(format!("{secret:?}"), "PlaintextSecret(\"***\")");
    }

    #[test]
    fn expose_returns_the_original_value() {
        let secret = PlaintextSecret::new("abc123".into());
        assert_eq!(secret.expose(), "abc123");
    }
}
