// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Directory name used under the user's config and cache directories
pub const APP_DIR_NAME: &str = "effect-cam";

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Log file written while the terminal front end owns the screen
pub const TERMINAL_LOG_FILE_NAME: &str = "terminal.log";

/// Preview stream defaults
pub mod preview {
    /// Default preview width in pixels
    pub const DEFAULT_WIDTH: u32 = 640;
    /// Default preview height in pixels
    pub const DEFAULT_HEIGHT: u32 = 480;
    /// Default preview framerate
    pub const DEFAULT_FRAMERATE: u32 = 30;
    /// Bounded frame channel size; frames are dropped when the consumer lags
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;
}

/// Effect parameter defaults shared by every catalog entry
pub mod effect_parameter {
    /// Lowest accepted parameter value
    pub const MIN: f32 = 0.0;
    /// Highest accepted parameter value
    pub const MAX: f32 = 1.0;
    /// Value used when an entry is first selected
    pub const DEFAULT: f32 = 0.5;
    /// Step applied by one key press in the terminal front end
    pub const STEP: f32 = 0.05;
}

/// V4L2 backend tuning
pub mod v4l2 {
    /// Number of memory-mapped capture buffers
    pub const BUFFER_COUNT: u32 = 4;
    /// Consecutive read errors tolerated before the device is considered lost
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;
}

/// Interval between UI redraws in terminal mode
pub const TERMINAL_TICK: Duration = Duration::from_millis(16);

/// Interval between statistics lines in headless preview mode
pub const PREVIEW_REPORT_INTERVAL: Duration = Duration::from_secs(1);
