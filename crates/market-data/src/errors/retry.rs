/// Classification for failover policy.
///
/// Used to determine how the registry should respond to errors from sources.
///
/// # Behavior Summary
///
/// | Class | Try Backup / Next Source? | Record Health Failure? |
/// |-------|---------------------------|------------------------|
/// | `FailoverWithPenalty` | Yes | Yes (starts or extends backoff) |
/// | `NextProvider` | Next source only | No |
///
/// Sources inside their backoff window never get this far: the registry
/// skips them before any request is made.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Failover and record a health penalty against the source.
    ///
    /// Used for transient errors: timeouts, transport errors, non-2xx
    /// statuses, rate limiting (429) and malformed payloads. The backup
    /// endpoint of the same source is tried once before moving on.
    FailoverWithPenalty,

    /// Move to the next source without recording any penalty.
    ///
    /// Used when this source simply can't serve the request.
    NextProvider,
}
