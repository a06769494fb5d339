//! Cooperative single-owner lock for a port.
//!
//! Acquisition is unconditional: a new owner replaces the previous one
//! without presenting the old handle. Callers that mutate the port are
//! expected to `verify` the handle first.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Default owner handle length
pub const DEFAULT_HANDLE_LEN: usize = 8;

/// Current holder of a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub id: String,
    pub handle: String,
}

/// Tracks which client owns the port
///
/// The handle only exists together with an owner.
#[derive(Debug, Clone)]
pub struct OwnershipLock {
    owner: Option<Owner>,
    handle_len: usize,
}

impl Default for OwnershipLock {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_LEN)
    }
}

impl OwnershipLock {
    /// Lock issuing handles of `handle_len` characters
    ///
    /// A zero length falls back to [`DEFAULT_HANDLE_LEN`]; an empty handle
    /// would verify without proving anything.
    pub fn new(handle_len: usize) -> Self {
        let handle_len = if handle_len == 0 {
            tracing::warn!(
                "Owner handle length 0 is not usable, using {}",
                DEFAULT_HANDLE_LEN
            );
            DEFAULT_HANDLE_LEN
        } else {
            handle_len
        };
        Self {
            owner: None,
            handle_len,
        }
    }

    pub fn handle_len(&self) -> usize {
        self.handle_len
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    /// Take the port for `owner_id`, returning the fresh handle
    pub fn acquire(&mut self, owner_id: impl Into<String>) -> String {
        let handle = generate_handle(self.handle_len);
        let owner = Owner {
            id: owner_id.into(),
            handle: handle.clone(),
        };
        if let Some(previous) = self.owner.replace(owner) {
            tracing::debug!("Ownership taken over from '{}'", previous.id);
        }
        handle
    }

    pub fn release(&mut self) {
        self.owner = None;
    }

    /// True iff the port is owned and `handle` is the current handle
    pub fn verify(&self, handle: &str) -> bool {
        self.owner.as_ref().is_some_and(|o| o.handle == handle)
    }
}

fn generate_handle(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_starts_free() {
        let lock = OwnershipLock::default();
        assert!(lock.is_free());
        assert!(lock.owner().is_none());
        assert!(!lock.verify(""));
    }

    #[test]
    fn test_acquire_verify_release() {
        let mut lock = OwnershipLock::default();
        let handle = lock.acquire("alice");

        assert!(!lock.is_free());
        assert_eq!(handle.len(), DEFAULT_HANDLE_LEN);
        assert!(handle.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(lock.owner().map(|o| o.id.as_str()), Some("alice"));
        assert!(lock.verify(&handle));

        lock.release();
        assert!(lock.is_free());
        assert!(!lock.verify(&handle));
    }

    #[test]
    fn test_reacquire_replaces_handle() {
        let mut lock = OwnershipLock::new(32);
        let first = lock.acquire("alice");
        let second = lock.acquire("bob");

        assert_ne!(first, second);
        assert!(!lock.verify(&first));
        assert!(lock.verify(&second));
        assert_eq!(lock.owner().map(|o| o.id.as_str()), Some("bob"));
    }

    #[test]
    fn test_zero_handle_len_uses_default() {
        let mut lock = OwnershipLock::new(0);
        assert_eq!(lock.handle_len(), DEFAULT_HANDLE_LEN);

        let handle = lock.acquire("alice");
        assert_eq!(handle.len(), DEFAULT_HANDLE_LEN);
        assert!(!lock.verify(""));
        assert!(lock.verify(&handle));
    }

    proptest! {
        #[test]
        fn test_only_current_handle_verifies(guess in "[A-Za-z0-9]{0,12}") {
            let mut lock = OwnershipLock::default();
            let handle = lock.acquire("alice");
            prop_assert_eq!(lock.verify(&guess), guess == handle);
        }
    }
}
