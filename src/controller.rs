//! Keyboard-driven toggle state machine.
//!
//! The controller is a pure function from one polled key and the current
//! [`ToggleState`] to an [`Action`] and the next state. Each recognised key flips
//! exactly one field (or requests termination); anything else is a no-op.

use crate::constants::{KEY_EMOTIONS, KEY_HELP, KEY_KEYPOINTS, KEY_PAUSE, KEY_QUIT};
use std::fmt;

/// Display and pause flags read by the pipeline and overlay each iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ToggleState {
    /// Stop reading new frames
    pub pause: bool,
    /// Draw facial landmarks into the frame
    pub show_keypoints: bool,
    /// Classify and label emotions
    pub show_emotions: bool,
    /// Show the full message menu instead of the hint bar
    pub show_help: bool,
}

impl fmt::Display for ToggleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pause={} keypoints={} emotions={} help={}",
            self.pause, self.show_keypoints, self.show_emotions, self.show_help
        )
    }
}

/// What the viewer loop should do after handling a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep running
    Continue,
    /// Leave the loop and tear down
    Terminate,
}

/// Closed set of keyboard commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    TogglePause,
    ToggleKeypoints,
    ToggleEmotions,
    ToggleHelp,
}

impl Command {
    /// Every command, in help-menu order
    pub const ALL: [Command; 5] = [
        Command::Quit,
        Command::TogglePause,
        Command::ToggleKeypoints,
        Command::ToggleEmotions,
        Command::ToggleHelp,
    ];

    /// Map a key code to a command; unbound keys map to `None`
    #[must_use]
    pub fn from_key(key: i32) -> Option<Self> {
        match key {
            KEY_QUIT => Some(Self::Quit),
            KEY_PAUSE => Some(Self::TogglePause),
            KEY_KEYPOINTS => Some(Self::ToggleKeypoints),
            KEY_EMOTIONS => Some(Self::ToggleEmotions),
            KEY_HELP => Some(Self::ToggleHelp),
            _ => None,
        }
    }

    /// Key code bound to this command
    #[must_use]
    pub fn key(self) -> i32 {
        match self {
            Self::Quit => KEY_QUIT,
            Self::TogglePause => KEY_PAUSE,
            Self::ToggleKeypoints => KEY_KEYPOINTS,
            Self::ToggleEmotions => KEY_EMOTIONS,
            Self::ToggleHelp => KEY_HELP,
        }
    }

    /// Apply the command to a state
    #[must_use]
    pub fn apply(self, state: ToggleState) -> (Action, ToggleState) {
        match self {
            Self::Quit => (Action::Terminate, state),
            Self::TogglePause => (
                Action::Continue,
                ToggleState {
                    pause: !state.pause,
                    ..state
                },
            ),
            Self::ToggleKeypoints => (
                Action::Continue,
                ToggleState {
                    show_keypoints: !state.show_keypoints,
                    ..state
                },
            ),
            Self::ToggleEmotions => (
                Action::Continue,
                ToggleState {
                    show_emotions: !state.show_emotions,
                    ..state
                },
            ),
            Self::ToggleHelp => (
                Action::Continue,
                ToggleState {
                    show_help: !state.show_help,
                    ..state
                },
            ),
        }
    }
}

/// Compute the next action and state for one polled key
#[must_use]
pub fn next_state(key: Option<i32>, state: ToggleState) -> (Action, ToggleState) {
    match key.and_then(Command::from_key) {
        Some(command) => command.apply(state),
        None => (Action::Continue, state),
    }
}
