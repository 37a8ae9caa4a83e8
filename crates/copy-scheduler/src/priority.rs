//! Priority model for copy requests.
//!
//! Priority is computed once per request by a pure function of its
//! [`CopyDirection`], [`CopyReason`], retry `attempt` count, and (for pushes)
//! [`ProactiveCopyLocationSource`]. The scheduler never recomputes priority
//! mid-flight; a request keeps the class it was classified into when it was
//! submitted.

/// Direction a copy moves content relative to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyDirection {
    /// Content is being pulled from a remote peer into the local cache.
    OutboundPull,
    /// Content is being pushed from the local cache to a remote peer.
    OutboundPush,
}

impl CopyDirection {
    fn rank(self) -> u32 {
        match self {
            CopyDirection::OutboundPull => 0,
            CopyDirection::OutboundPush => 1,
        }
    }
}

/// Why a copy was requested.
///
/// Variants are listed from most to least important; [`CopyReason::importance_rank`]
/// relies on this declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyReason {
    /// Content must be pinned locally before use.
    Pin,
    /// Content is being placed for a consumer that is waiting on it.
    Place,
    /// Content is being copied to or from central storage.
    CentralStorage,
    /// An async copy triggered as a side effect of a pin.
    AsyncCopyOnPin,
    /// Speculative background replication, no waiting consumer.
    ProactiveBackground,
    /// Proactive copy triggered by a local put.
    ProactiveCopyOnPut,
    /// No reason was supplied by the caller.
    None,
}

impl CopyReason {
    /// Lower values are more important. Used as the dominant term in
    /// [`classify`].
    fn importance_rank(self) -> u32 {
        match self {
            CopyReason::Pin => 0,
            CopyReason::Place => 1,
            CopyReason::CentralStorage => 2,
            CopyReason::AsyncCopyOnPin => 3,
            CopyReason::ProactiveBackground => 4,
            CopyReason::ProactiveCopyOnPut => 5,
            CopyReason::None => 6,
        }
    }
}

/// How a proactive push's destination peer was chosen. Only meaningful for
/// [`CopyDirection::OutboundPush`] requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProactiveCopyLocationSource {
    /// The destination was chosen at random from eligible peers.
    Random,
    /// The destination was chosen by a placement algorithm.
    Designated,
}

impl ProactiveCopyLocationSource {
    fn rank(self) -> u32 {
        match self {
            ProactiveCopyLocationSource::Designated => 0,
            ProactiveCopyLocationSource::Random => 1,
        }
    }
}

const DIRECTION_COUNT: u32 = 2;
const REASON_COUNT: u32 = 7;
const MAX_ATTEMPT: u32 = 4;
pub(crate) const ATTEMPT_BUCKET: u32 = MAX_ATTEMPT + 1;
const SOURCE_BUCKET: u32 = 2;

const REASON_SPAN: u32 = ATTEMPT_BUCKET * SOURCE_BUCKET;
const DIRECTION_SPAN: u32 = REASON_COUNT * REASON_SPAN;

/// Total number of distinct priority classes [`classify`] can produce.
///
/// Queues and admission tables are sized to this constant and index into
/// them directly rather than through a hash map, since the class space is
/// small and fixed.
pub const PRIORITY_CLASS_COUNT: usize = (DIRECTION_COUNT * DIRECTION_SPAN) as usize;

/// Classifies a request into a priority class.
///
/// Lower classes are serviced first. Classes are ordered, most to least
/// significant: [`CopyDirection`] (pulls rank ahead of pushes at equal
/// reason/attempt/source), [`CopyReason`] importance, retry `attempt`
/// (clamped to `[0, 4]`; a freshly submitted request ranks ahead of one
/// that has already been retried), and — for pushes only — `source`
/// (`Designated` ranks ahead of `Random`; pulls and pushes with no location
/// source recorded are treated as `Random` for this purpose, since nothing
/// established a better destination for them).
pub fn classify(
    direction: CopyDirection,
    reason: CopyReason,
    attempt: u32,
    source: Option<ProactiveCopyLocationSource>,
) -> u32 {
    let attempt_rank = attempt.min(MAX_ATTEMPT);
    let source_rank = source.unwrap_or(ProactiveCopyLocationSource::Random).rank();
    direction.rank() * DIRECTION_SPAN
        + reason.importance_rank() * REASON_SPAN
        + attempt_rank * SOURCE_BUCKET
        + source_rank
}

/// Recovers the dominant reason-importance rank a class was derived from.
/// Used to look up reason-scoped admission configuration for a class
/// without storing it per-class.
pub(crate) fn class_reason_rank(class: usize) -> usize {
    ((class as u32 / REASON_SPAN) % REASON_COUNT) as usize
}
