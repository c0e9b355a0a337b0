use framediff_common::frame::{Dimensions, Phase};
use image::GrayImage;

/// The two most recent preprocessed frames of a session.
///
/// Frames fill in arrival order: the first frame moves the buffer to
/// `Warming`, the second to `Ready`. From then on every push drops the older
/// frame, demotes the newer one and stores the incoming frame as newer.
#[derive(Debug, Clone, Default)]
pub enum HistoryBuffer {
    #[default]
    Empty,
    Warming {
        newer: GrayImage,
    },
    Ready {
        older: GrayImage,
        newer: GrayImage,
    },
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::Empty
    }

    pub fn phase(&self) -> Phase {
        match self {
            HistoryBuffer::Empty => Phase::Empty,
            HistoryBuffer::Warming { .. } => Phase::Warming,
            HistoryBuffer::Ready { .. } => Phase::Ready,
        }
    }

    /// Dimensions established by the first frame of the session, if any.
    pub fn dimensions(&self) -> Option<Dimensions> {
        let newer = match self {
            HistoryBuffer::Empty => return None,
            HistoryBuffer::Warming { newer } | HistoryBuffer::Ready { newer, .. } => newer,
        };
        Some(Dimensions::new(newer.width(), newer.height()))
    }

    /// `(older, newer)` once two frames are held.
    pub fn window(&self) -> Option<(&GrayImage, &GrayImage)> {
        match self {
            HistoryBuffer::Ready { older, newer } => Some((older, newer)),
            _ => None,
        }
    }

    /// Store a new frame, advancing the buffer by one slot.
    pub fn push(&mut self, frame: GrayImage) {
        *self = match std::mem::take(self) {
            HistoryBuffer::Empty => HistoryBuffer::Warming { newer: frame },
            HistoryBuffer::Warming { newer } | HistoryBuffer::Ready { newer, .. } => {
                HistoryBuffer::Ready {
                    older: newer,
                    newer: frame,
                }
            }
        };
    }

    pub fn reset(&mut self) {
        *self = HistoryBuffer::Empty;
    }
}
