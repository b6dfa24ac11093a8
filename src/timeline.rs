//! Playback state of the animation.

/// Current timestep and the controls that move it.
///
/// Every frame advances the timestep by `frame_rate * time_rate`, where
/// `frame_rate` is the frame period while playing and zero while paused.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    timestep: f32,
    first: f32,
    last: f32,
    refresh_rate: u32,
    frame_rate: f32,
    time_rate: f32,
    looping: bool,
}

impl Timeline {
    pub fn new(refresh_rate: u32, time_rate: f32, looping: bool) -> Self {
        Self {
            timestep: 0.0,
            first: 0.0,
            last: 1.0,
            refresh_rate,
            frame_rate: period(refresh_rate),
            time_rate,
            looping,
        }
    }

    pub fn set_bounds(&mut self, first: f32, last: f32) {
        self.first = first;
        self.last = last.max(first);
        self.timestep = self.clamp(self.timestep);
    }

    pub fn advance(&mut self) -> f32 {
        self.timestep += self.frame_rate * self.time_rate;
        if self.looping && self.timestep > self.last {
            self.timestep = self.first;
        }
        self.timestep = self.clamp(self.timestep);
        self.timestep
    }

    pub fn play_pause(&mut self) {
        self.frame_rate = if self.is_paused() {
            period(self.refresh_rate)
        } else {
            0.0
        };
    }

    pub fn is_paused(&self) -> bool {
        self.frame_rate == 0.0
    }

    pub fn restart(&mut self) {
        self.timestep = self.first;
    }

    /// Jumps to the last timestep and pauses there.
    pub fn go_end(&mut self) {
        self.frame_rate = 0.0;
        self.timestep = self.last;
    }

    pub fn set_time_rate(&mut self, time_rate: f32) {
        self.time_rate = time_rate;
    }

    pub fn time_rate(&self) -> f32 {
        self.time_rate
    }

    pub fn toggle_loop(&mut self) {
        self.looping = !self.looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// `position` in 0..=1 maps linearly onto first..=last.
    pub fn set_from_slider(&mut self, position: f32) {
        self.timestep = self.clamp(position * (self.last - self.first) + self.first);
    }

    /// Slider position of the current timestep.
    pub fn slider_position(&self) -> f32 {
        let span = self.last - self.first;
        if span > 0.0 {
            (self.timestep - self.first) / span
        } else {
            0.0
        }
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    pub fn first(&self) -> f32 {
        self.first
    }

    pub fn last(&self) -> f32 {
        self.last
    }

    /// Evenly spaced timesteps `first + k/count * (last - first)` for k in 0..count.
    pub fn snapshots(&self, count: u32) -> impl Iterator<Item = f32> + '_ {
        (0..count).map(move |k| {
            self.first + k as f32 / count as f32 * (self.last - self.first)
        })
    }

    fn clamp(&self, timestep: f32) -> f32 {
        timestep.max(self.first).min(self.last)
    }
}

fn period(refresh_rate: u32) -> f32 {
    if refresh_rate == 0 {
        0.0
    } else {
        1.0 / refresh_rate as f32
    }
}
