/// Classification used by the rate-limit retry policy.
///
/// Only a throttling signal from the upstream source is worth waiting for;
/// every other failure ends the attempt loop and propagates as-is.
///
/// | Class | Wait and retry? |
/// |-------|-----------------|
/// | `Backoff` | Yes, linear backoff until attempts run out |
/// | `Abort` | No, surface the failure immediately |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// The source answered "too many requests". Wait `base_delay * attempt`
    /// and try again.
    Backoff,

    /// Anything else: bad symbol, malformed payload, transport failure,
    /// server error. Retrying inside the same provider won't help; the
    /// registry may still fall over to the next provider.
    Abort,
}
