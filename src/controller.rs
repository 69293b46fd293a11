//! Transport logic of a media controller
//!
//! The buttons and slider are external widgets; [`MediaController`] holds the
//! state they need and drives a [`Player`].

use serde::{Deserialize, Serialize};

/// Playback state reported by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Something that plays media with a millisecond position
pub trait Player {
    fn playback_state(&self) -> PlaybackState;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_position(&mut self, position: i64);
}

/// Icon the play button should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayIcon {
    #[default]
    Play,
    Pause,
}

/// Range and value of the position slider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliderState {
    pub minimum: i64,
    pub maximum: i64,
    pub value: i64,
}

impl SliderState {
    pub fn set_range(&mut self, minimum: i64, maximum: i64) {
        self.minimum = minimum;
        self.maximum = maximum.max(minimum);
        self.value = self.value.clamp(self.minimum, self.maximum);
    }

    pub fn set_value(&mut self, value: i64) {
        self.value = value.clamp(self.minimum, self.maximum);
    }

    /// Move to the value under pixel `pos` of a groove `span` pixels long
    pub fn click(&mut self, pos: i64, span: i64) {
        self.set_value(slider_value_from_position(
            self.minimum,
            self.maximum,
            pos,
            span,
            false,
        ));
    }
}

/// Controls one player from button and slider events
#[derive(Debug)]
pub struct MediaController<P> {
    player: Option<P>,
    slider: SliderState,
    play_icon: PlayIcon,
    paused_by_slider_press: bool,
}

impl<P: Player> MediaController<P> {
    pub fn new() -> Self {
        Self {
            player: None,
            slider: SliderState::default(),
            play_icon: PlayIcon::Play,
            paused_by_slider_press: false,
        }
    }

    pub fn player(&self) -> Option<&P> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut P> {
        self.player.as_mut()
    }

    /// Replace the controlled player, returning the previous one
    pub fn set_player(&mut self, player: Option<P>) -> Option<P> {
        self.paused_by_slider_press = false;
        std::mem::replace(&mut self.player, player)
    }

    pub fn slider(&self) -> &SliderState {
        &self.slider
    }

    pub fn slider_mut(&mut self) -> &mut SliderState {
        &mut self.slider
    }

    pub fn play_icon(&self) -> PlayIcon {
        self.play_icon
    }

    /// Toggle between playing and paused
    pub fn on_play_button_clicked(&mut self) {
        if let Some(player) = self.player.as_mut() {
            if player.playback_state() == PlaybackState::Playing {
                player.pause();
            } else {
                player.play();
            }
        }
    }

    pub fn on_stop_button_clicked(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.stop();
        }
    }

    /// Pause if playing, then seek to the slider value
    pub fn on_slider_pressed(&mut self) {
        if let Some(player) = self.player.as_mut() {
            if player.playback_state() == PlaybackState::Playing {
                self.paused_by_slider_press = true;
                player.pause();
            }
            player.set_position(self.slider.value);
        }
    }

    pub fn on_slider_moved(&mut self, position: i64) {
        self.slider.set_value(position);
        if let Some(player) = self.player.as_mut() {
            player.set_position(position);
        }
    }

    /// Resume playback only if the press paused it
    pub fn on_slider_released(&mut self) {
        if let Some(player) = self.player.as_mut() {
            if self.paused_by_slider_press {
                player.play();
                self.paused_by_slider_press = false;
            }
        }
    }

    pub fn on_duration_changed(&mut self, duration: i64) {
        self.slider.set_range(0, duration);
    }

    pub fn on_position_changed(&mut self, position: i64) {
        self.slider.set_value(position);
    }

    pub fn on_playback_state_changed(&mut self, state: PlaybackState) {
        self.play_icon = match state {
            PlaybackState::Playing => PlayIcon::Pause,
            _ => PlayIcon::Play,
        };
    }
}

impl<P: Player> Default for MediaController<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Slider value for pixel `pos` along a groove of `span` pixels
///
/// Same rounding as Qt's `QStyle::sliderValueFromPosition`.
pub fn slider_value_from_position(min: i64, max: i64, pos: i64, span: i64, upside_down: bool) -> i64 {
    if span <= 0 || pos <= 0 {
        return if upside_down { max } else { min };
    }
    if pos >= span {
        return if upside_down { min } else { max };
    }
    let range = max - min;
    let offset = if span > range {
        (2 * pos * range + span) / (2 * span)
    } else {
        let div = range / span;
        let rem = range % span;
        pos * div + (2 * pos * rem + span) / (2 * span)
    };
    if upside_down {
        max - offset
    } else {
        min + offset
    }
}
