//! Resolve-once identity of the running application.

use std::fmt;

use once_cell::sync::OnceCell;

type Resolver = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Application identifier shared by every connection of a wrapped driver.
///
/// Resolution runs at most once, even when many connections race on first
/// use; concurrent callers wait for that single attempt. A failed attempt
/// leaves the identity empty for good.
pub struct ApplicationIdentity {
    value: OnceCell<String>,
    resolver: Resolver,
}

impl ApplicationIdentity {
    /// Resolve from the name of the running executable.
    pub fn new() -> Self {
        Self::with_resolver(executable_name)
    }

    /// Resolve with a custom function; `None` means "could not determine".
    pub fn with_resolver<F>(resolver: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            value: OnceCell::new(),
            resolver: Box::new(resolver),
        }
    }

    /// An identity known up front. An empty value falls back to resolution.
    pub fn preset(application: impl Into<String>) -> Self {
        let application = application.into();
        if application.is_empty() {
            return Self::new();
        }
        Self {
            value: OnceCell::with_value(application),
            resolver: Box::new(executable_name),
        }
    }

    /// The identity, resolving it on the first call.
    pub fn get(&self) -> &str {
        self.value.get_or_init(|| match (self.resolver)() {
            Some(application) => {
                tracing::debug!(application = %application, "Resolved application identity");
                application
            }
            None => {
                tracing::warn!("Could not resolve application identity, tag will be empty");
                String::new()
            }
        })
    }

    /// Whether resolution has already happened (or the value was preset).
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }
}

impl Default for ApplicationIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ApplicationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationIdentity")
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

fn executable_name() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    exe.file_stem()?.to_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let identity = ApplicationIdentity::with_resolver(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some("billing-api".to_string())
        });

        assert!(!identity.is_resolved());
        assert_eq!(identity.get(), "billing-api");
        assert_eq!(identity.get(), "billing-api");
        assert!(identity.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_resolution_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let identity = ApplicationIdentity::with_resolver(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        assert_eq!(identity.get(), "");
        assert_eq!(identity.get(), "");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let identity = Arc::new(ApplicationIdentity::with_resolver(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(20));
            Some("worker".to_string())
        }));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let identity = identity.clone();
                thread::spawn(move || identity.get().to_string())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "worker");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preset_skips_resolution() {
        let identity = ApplicationIdentity::preset("checkout");
        assert!(identity.is_resolved());
        assert_eq!(identity.get(), "checkout");

        let identity = ApplicationIdentity::preset("");
        assert!(!identity.is_resolved());
    }

    #[test]
    fn test_default_resolver_uses_executable() {
        let identity = ApplicationIdentity::new();
        assert!(!identity.get().is_empty());
    }
}
