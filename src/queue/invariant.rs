use core::fmt;

/// A structural invariant found broken by [`MsQueue::validate`].
///
/// Never produced by a correct queue. Seeing one means the algorithm is
/// defective, so callers (test harnesses) should fail rather than recover.
///
/// [`MsQueue::validate`]: crate::MsQueue::validate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The node referenced by `tail` has a successor.
    TailNotLast,
    /// The dummy node referenced by `head` still holds an element.
    DummyHoldsElement,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::TailNotLast => {
                f.write_str("at rest, `tail.next` must be null")
            }
            InvariantViolation::DummyHoldsElement => {
                f.write_str("at rest, the dummy node must not store an element")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}
