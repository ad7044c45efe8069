//! Grab Game - a two-player grab-and-deposit arcade game
//!
//! Core modules:
//! - `input`: Controller/keyboard sampling and speed quantization
//! - `sim`: Deterministic simulation (entities, timers, game state machine)
//! - `relay`: Line-delimited JSON score relay (game server + scoreboard client)
//! - `scoreboard`: Ranked high-score view built from relayed records
//! - `hud`: Render-facing summary of a frame
//! - `settings`: Tunables loaded from JSON / environment

pub mod controller;
pub mod hud;
pub mod input;
pub mod relay;
pub mod scoreboard;
pub mod settings;
pub mod sim;

pub use scoreboard::Scoreboard;
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Playfield dimensions
    pub const WIDTH: f32 = 1280.0;
    pub const HEIGHT: f32 = 720.0;

    /// Target tick rate of the main loop
    pub const TICK_RATE_HZ: u32 = 60;

    /// Per-tick full speeds (pixels / degrees per tick)
    pub const PLAYER_MOVE_SPEED: f32 = 5.0;
    pub const PLAYER_ROTATE_SPEED: f32 = 5.0;
    /// Player body bounding box (square, centered on position)
    pub const PLAYER_SIZE: f32 = 80.0;

    /// Gripper sits this far ahead of the player's center
    pub const GRIPPER_OFFSET: f32 = 40.0;
    pub const GRIPPER_WIDTH: f32 = 8.0;
    pub const GRIPPER_LENGTH: f32 = 20.0;

    pub const ITEM_SIZE: f32 = 30.0;

    pub const BASKET_WIDTH: f32 = 70.0;
    pub const BASKET_HEIGHT: f32 = 100.0;
    /// Distance from the left/right screen edge to the basket
    pub const BASKET_MARGIN: f32 = 50.0;

    /// Item pool (circle centered on screen)
    pub const POOL_RADIUS: f32 = 200.0;
    /// Spawned items stay this far inside the pool edge
    pub const POOL_SPAWN_INSET: f32 = 35.0;
    /// Players start this far outside the pool edge
    pub const PLAYER_START_GAP: f32 = 100.0;

    /// Default timings
    pub const ITEM_SPAWN_INTERVAL_MS: u64 = 2000;
    pub const GAME_OVER_RESET_DELAY_MS: u64 = 5000;
    pub const COUNTDOWN_SECS: f32 = 4.0;
    pub const ROUND_SECS: f32 = 60.0;

    /// Score relay
    pub const RELAY_PORT: u16 = 12345;
}

/// Wrap a heading in degrees into [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Unit vector for a heading in degrees (screen coordinates, y down)
#[inline]
pub fn heading_vector(degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

/// Center of the playfield
#[inline]
pub fn screen_center() -> Vec2 {
    Vec2::new(consts::WIDTH / 2.0, consts::HEIGHT / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(365.0), 5.0);
        assert_eq!(wrap_degrees(-5.0), 355.0);
        assert!(wrap_degrees(-1e-7) < 360.0);
    }

    #[test]
    fn test_heading_vector() {
        let v = heading_vector(90.0);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
