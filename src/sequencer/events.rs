//! Notifications the sequencer publishes to observers.
//!
//! Delivery is synchronous: a notification is in every subscriber's channel
//! before the operation that raised it returns, in the order the underlying
//! steps committed.

use crossbeam_channel::{Receiver, Sender};

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Play,
    Pause,
    Stop,
    // column -1 means "nothing active"
    GridCellChanged { column: i64, deadline: f64 },
    BpmChanged(f64),
    TimeSignatureChanged { numerator: u32, denominator: u32 },
    SubdivisionChanged(u32),
    LoopingChanged(bool),
    TrackVolumeChanged { track: String, volume: f32 },
    TrackMuteChanged { track: String, muted: bool },
    MasterVolumeChanged(f32),
    TrackAdded(String),
    TrackRemoved(String),
    AudioAddedToGrid { track: String, column: usize },
    AudioRemovedFromGrid { track: String, column: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Play,
    Pause,
    Stop,
    GridCellChanged,
    BpmChanged,
    TimeSignatureChanged,
    SubdivisionChanged,
    LoopingChanged,
    TrackVolumeChanged,
    TrackMuteChanged,
    MasterVolumeChanged,
    TrackAdded,
    TrackRemoved,
    AudioAddedToGrid,
    AudioRemovedFromGrid,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Play => NotificationKind::Play,
            Notification::Pause => NotificationKind::Pause,
            Notification::Stop => NotificationKind::Stop,
            Notification::GridCellChanged { .. } => NotificationKind::GridCellChanged,
            Notification::BpmChanged(_) => NotificationKind::BpmChanged,
            Notification::TimeSignatureChanged { .. } => NotificationKind::TimeSignatureChanged,
            Notification::SubdivisionChanged(_) => NotificationKind::SubdivisionChanged,
            Notification::LoopingChanged(_) => NotificationKind::LoopingChanged,
            Notification::TrackVolumeChanged { .. } => NotificationKind::TrackVolumeChanged,
            Notification::TrackMuteChanged { .. } => NotificationKind::TrackMuteChanged,
            Notification::MasterVolumeChanged(_) => NotificationKind::MasterVolumeChanged,
            Notification::TrackAdded(_) => NotificationKind::TrackAdded,
            Notification::TrackRemoved(_) => NotificationKind::TrackRemoved,
            Notification::AudioAddedToGrid { .. } => NotificationKind::AudioAddedToGrid,
            Notification::AudioRemovedFromGrid { .. } => NotificationKind::AudioRemovedFromGrid,
        }
    }
}

struct Subscriber {
    tx: Sender<Notification>,
    kinds: Option<Vec<NotificationKind>>, // None = everything
}

impl Subscriber {
    fn wants(&self, kind: NotificationKind) -> bool {
        self.kinds.as_ref().is_none_or(|k| k.contains(&kind))
    }
}

/// One-to-many publisher. Holds only channel ends, never observer objects.
#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Subscriber>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every notification.
    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.add(None)
    }

    /// Receive only the listed kinds.
    pub fn subscribe_to(&mut self, kinds: &[NotificationKind]) -> Receiver<Notification> {
        self.add(Some(kinds.to_vec()))
    }

    fn add(&mut self, kinds: Option<Vec<NotificationKind>>) -> Receiver<Notification> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(Subscriber { tx, kinds });
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn emit(&mut self, note: Notification) {
        let kind = note.kind();
        // dropped receivers are pruned as we go
        self.subscribers
            .retain(|s| !s.wants(kind) || s.tx.send(note.clone()).is_ok());
    }
}
