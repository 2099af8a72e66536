// External identity provider integration
// The provider's widget is modeled as an injected event source that
// delivers zero or more opaque assertions over time, one per interaction

#[cfg(any(test, feature = "test-utils"))]
use std::collections::VecDeque;
use std::fmt;

/// Signed credential from the external identity provider asserting control
/// of an external identity.
///
/// Held only for the duration of one reconciliation flow, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityAssertion(String);

impl IdentityAssertion {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the raw credential out of logs
impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityAssertion(..)")
    }
}

/// Source of identity assertions.
///
/// The reconciliation core depends only on this one-assertion-per-event
/// contract, not on how the provider widget is initialized or rendered.
pub trait AssertionSource {
    /// Next assertion, or `None` once the source is exhausted or dismissed.
    fn next_assertion(&mut self) -> impl std::future::Future<Output = Option<IdentityAssertion>> + Send;
}

/// Pre-seeded assertion source, used by tests and scripted runs.
#[cfg(any(test, feature = "test-utils"))]
pub struct QueuedAssertions {
    queue: VecDeque<IdentityAssertion>,
}

#[cfg(any(test, feature = "test-utils"))]
impl QueuedAssertions {
    pub fn new(assertions: impl IntoIterator<Item = IdentityAssertion>) -> Self {
        Self {
            queue: assertions.into_iter().collect(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl AssertionSource for QueuedAssertions {
    async fn next_assertion(&mut self) -> Option<IdentityAssertion> {
        self.queue.pop_front()
    }
}
