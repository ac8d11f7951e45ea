use tracing::{debug, warn};

/// What to do with a chunk delivered while a seek is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Write `silence` zero frames, then consume the chunk from frame `skip`.
    Consume { silence: usize, skip: usize },
    /// The chunk ends before the target; pull another.
    Discard,
}

/// Tracks where the next delivered frame should come from and whether the
/// backend still has to be brought in line with it after a seek.
#[derive(Debug, Clone, Default)]
pub struct SeekState {
    next_frame: i64,
    seeking: bool,
}

impl SeekState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame index the next delivered frame belongs at.
    pub fn next_frame(&self) -> i64 {
        self.next_frame
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Start waiting for the backend to reach `target_frame`.
    pub fn request(&mut self, target_frame: i64) {
        self.next_frame = target_frame;
        self.seeking = true;
    }

    /// Record `frames` frames handed to the caller.
    pub fn advance(&mut self, frames: usize) {
        self.next_frame += frames as i64;
    }

    /// Line up a chunk starting at `buffer_position` with the pending target.
    ///
    /// An overshoot no larger than `frames_needed` is papered over with
    /// silence. A larger one gives up on exactness and takes the chunk as the
    /// new position. Silence frames are already counted in `next_frame` on
    /// return.
    pub fn reconcile(
        &mut self,
        buffer_position: i64,
        chunk_frames: usize,
        frames_needed: usize,
    ) -> Alignment {
        debug!(
            target_frame = self.next_frame,
            buffer_position, chunk_frames, "Reconciling seek"
        );
        let mut silence = 0;

        if self.next_frame < buffer_position {
            let offshoot = buffer_position - self.next_frame;
            if offshoot as u64 <= frames_needed as u64 {
                warn!("Seek landed {} frames late, padding with silence", offshoot);
                silence = offshoot as usize;
                self.next_frame += offshoot;
            } else {
                warn!(
                    "Seek landed {} frames late, taking frame {} as the new position",
                    offshoot, buffer_position
                );
                self.next_frame = buffer_position;
            }
        }

        let chunk_end = buffer_position + chunk_frames as i64;
        if self.next_frame >= buffer_position && self.next_frame < chunk_end {
            self.seeking = false;
            Alignment::Consume {
                silence,
                skip: (self.next_frame - buffer_position) as usize,
            }
        } else {
            Alignment::Discard
        }
    }
}
