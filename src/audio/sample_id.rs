use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SAMPLE_ID: AtomicU64 = AtomicU64::new(0);
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(pub u64);

/// One triggered instance of a sample; used to cancel it or to learn that it finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

// atomic counters so ids stay unique no matter which thread asks
pub fn next_sample_id() -> SampleId {
    SampleId(NEXT_SAMPLE_ID.fetch_add(1, Ordering::Relaxed))
}

pub fn next_voice_id() -> VoiceId {
    VoiceId(NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed))
}
