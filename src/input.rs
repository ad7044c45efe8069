//! Input normalization
//!
//! Turns raw controller samples (or keyboard state when no sample is
//! available) into per-player speed commands for a single tick.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{PLAYER_MOVE_SPEED, PLAYER_ROTATE_SPEED};

/// Resting value of an analog axis (10-bit ADC midpoint)
pub const AXIS_CENTER: f32 = 511.5;
/// Offsets below this read as centered
pub const DEAD_ZONE: f32 = 50.0;
/// Upper bound (exclusive) of the 30% tier
pub const TIER_LOW: f32 = 150.0;
/// Upper bound (exclusive) of the 60% tier
pub const TIER_MID: f32 = 300.0;

/// Number of integers in one controller line
pub const SAMPLE_FIELDS: usize = 10;

/// Map a raw analog reading in [0, 1023] to a signed, tiered speed.
pub fn map_axis_to_speed(raw: i32, max_speed: f32) -> f32 {
    quantize_offset(raw as f32 - AXIS_CENTER, max_speed)
}

/// Quantize a signed offset from the axis center into one of four speed bands.
///
/// A boundary offset belongs to the higher tier: exactly 50 is already outside
/// the dead zone, exactly 150 is 60% speed and exactly 300 is full speed.
pub fn quantize_offset(offset: f32, max_speed: f32) -> f32 {
    let magnitude = offset.abs();

    if magnitude < DEAD_ZONE {
        return 0.0;
    }

    let speed = if magnitude < TIER_LOW {
        max_speed * 0.3
    } else if magnitude < TIER_MID {
        max_speed * 0.6
    } else {
        max_speed
    };

    if offset > 0.0 { speed } else { -speed }
}

/// Player slot (1 or 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const ALL: [PlayerId; 2] = [PlayerId::One, PlayerId::Two];

    /// Zero-based slot index
    pub fn index(self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    /// One-based player number as shown to players
    pub fn number(self) -> u8 {
        match self {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }

    /// Team colour used on the game-over screen
    pub fn team_name(self) -> &'static str {
        match self {
            PlayerId::One => "Blue",
            PlayerId::Two => "Red",
        }
    }
}

/// Why a controller line was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("expected 10 fields, got {0}")]
    FieldCount(usize),

    #[error("non-integer field {0:?}")]
    NotAnInteger(String),
}

/// One analog stick triple for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickSample {
    /// Left/right deflection (strafe)
    pub x: i32,
    /// Forward/back deflection
    pub y: i32,
    /// Rotation knob
    pub rotate: i32,
}

/// A decoded controller line
///
/// Wire order: `p1x,p1y,p1rot,p2x,p2y,p2rot,p1ready,p1grab,p2ready,p2grab`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerSample {
    pub sticks: [StickSample; 2],
    /// Ready button levels (true while held)
    pub ready: [bool; 2],
    /// Grab button levels (true while held)
    pub grab: [bool; 2],
}

impl FromStr for ControllerSample {
    type Err = SampleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields = line
            .trim()
            .split(',')
            .map(|token| {
                let token = token.trim();
                token
                    .parse::<i32>()
                    .map_err(|_| SampleError::NotAnInteger(token.to_string()))
            })
            .collect::<Result<Vec<i32>, _>>()?;

        if fields.len() != SAMPLE_FIELDS {
            return Err(SampleError::FieldCount(fields.len()));
        }

        Ok(Self {
            sticks: [
                StickSample {
                    x: fields[0],
                    y: fields[1],
                    rotate: fields[2],
                },
                StickSample {
                    x: fields[3],
                    y: fields[4],
                    rotate: fields[5],
                },
            ],
            ready: [fields[6] == 1, fields[8] == 1],
            grab: [fields[7] == 1, fields[9] == 1],
        })
    }
}

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    F,
    M,
    Up,
    Down,
    Left,
    Right,
    Keypad4,
    Keypad6,
    LeftShift,
    RightShift,
    Escape,
}

impl Key {
    /// Console name of a key: letters, arrow names, `kp4`/`kp6`, `lshift`/`rshift`
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name.trim().to_ascii_lowercase().as_str() {
            "w" => Key::W,
            "a" => Key::A,
            "s" => Key::S,
            "d" => Key::D,
            "q" => Key::Q,
            "e" => Key::E,
            "f" => Key::F,
            "m" => Key::M,
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "kp4" => Key::Keypad4,
            "kp6" => Key::Keypad6,
            "lshift" => Key::LeftShift,
            "rshift" => Key::RightShift,
            "esc" | "escape" => Key::Escape,
            _ => return None,
        };
        Some(key)
    }
}

/// Per-player keyboard fallback bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub forward: Key,
    pub back: Key,
    pub left: Key,
    pub right: Key,
    pub rotate_ccw: Key,
    pub rotate_cw: Key,
    pub grab: Key,
    pub ready: Key,
}

impl KeyBindings {
    pub fn for_player(id: PlayerId) -> Self {
        match id {
            PlayerId::One => Self {
                forward: Key::W,
                back: Key::S,
                left: Key::A,
                right: Key::D,
                rotate_ccw: Key::Q,
                rotate_cw: Key::E,
                grab: Key::F,
                ready: Key::LeftShift,
            },
            PlayerId::Two => Self {
                forward: Key::Up,
                back: Key::Down,
                left: Key::Left,
                right: Key::Right,
                rotate_ccw: Key::Keypad4,
                rotate_cw: Key::Keypad6,
                grab: Key::M,
                ready: Key::RightShift,
            },
        }
    }
}

/// Keyboard state for one tick: keys currently held plus keys that went
/// down since the previous tick.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: Vec<Key>,
    pressed: Vec<Key>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key-down event (held until released)
    pub fn key_down(&mut self, key: Key) {
        if !self.held.contains(&key) {
            self.held.push(key);
        }
        self.pressed.push(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.held.retain(|k| *k != key);
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn was_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    /// Forget this tick's key-down edges (held keys stay held)
    pub fn end_tick(&mut self) {
        self.pressed.clear();
    }
}

/// Where this tick's movement came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputSource {
    Controller,
    #[default]
    Keyboard,
}

/// Normalized commands for one player for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerCommand {
    /// Forward (+) / backward (-) speed along the heading
    pub forward: f32,
    /// Right (+) / left (-) speed perpendicular to the heading
    pub strafe: f32,
    /// Clockwise (+) / counter-clockwise (-) degrees this tick
    pub rotate: f32,
    /// Grab edge: one pick-up or drop
    pub grab: bool,
    /// Ready edge: sets the menu ready flag
    pub ready: bool,
    /// Ready toggle (menu button click)
    pub toggle_ready: bool,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub players: [PlayerCommand; 2],
    pub source: InputSource,
    /// Quit requested (Escape)
    pub quit: bool,
}

impl TickInput {
    pub fn player(&self, id: PlayerId) -> &PlayerCommand {
        &self.players[id.index()]
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut PlayerCommand {
        &mut self.players[id.index()]
    }
}

/// Stateful normalizer: quantizes sticks and turns button levels into edges.
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    pub move_speed: f32,
    pub rotate_speed: f32,
    bindings: [KeyBindings; 2],
    prev_ready: [bool; 2],
    prev_grab: [bool; 2],
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new(PLAYER_MOVE_SPEED, PLAYER_ROTATE_SPEED)
    }
}

impl InputNormalizer {
    pub fn new(move_speed: f32, rotate_speed: f32) -> Self {
        Self {
            move_speed,
            rotate_speed,
            bindings: [
                KeyBindings::for_player(PlayerId::One),
                KeyBindings::for_player(PlayerId::Two),
            ],
            prev_ready: [false; 2],
            prev_grab: [false; 2],
        }
    }

    pub fn with_bindings(mut self, bindings: [KeyBindings; 2]) -> Self {
        self.bindings = bindings;
        self
    }

    /// Build this tick's commands.
    ///
    /// Movement comes from the controller when a sample is present and from
    /// the keyboard otherwise. Key-down edges for grab/ready are honoured
    /// from the keyboard in either case.
    pub fn normalize(
        &mut self,
        sample: Option<&ControllerSample>,
        keys: &KeyboardState,
    ) -> TickInput {
        let mut input = TickInput {
            quit: keys.was_pressed(Key::Escape),
            ..Default::default()
        };

        match sample {
            Some(sample) => {
                input.source = InputSource::Controller;
                for id in PlayerId::ALL {
                    let i = id.index();
                    let stick = sample.sticks[i];
                    let cmd = &mut input.players[i];
                    cmd.forward = map_axis_to_speed(stick.y, self.move_speed);
                    cmd.strafe = map_axis_to_speed(stick.x, self.move_speed);
                    cmd.rotate = map_axis_to_speed(stick.rotate, self.rotate_speed);
                    cmd.ready = sample.ready[i] && !self.prev_ready[i];
                    cmd.grab = sample.grab[i] && !self.prev_grab[i];
                }
                self.prev_ready = sample.ready;
                self.prev_grab = sample.grab;
            }
            None => {
                input.source = InputSource::Keyboard;
                for id in PlayerId::ALL {
                    input.players[id.index()] = self.keyboard_command(id, keys);
                }
            }
        }

        for id in PlayerId::ALL {
            let bindings = &self.bindings[id.index()];
            let cmd = input.player_mut(id);
            cmd.grab |= keys.was_pressed(bindings.grab);
            cmd.ready |= keys.was_pressed(bindings.ready);
        }

        input
    }

    fn keyboard_command(&self, id: PlayerId, keys: &KeyboardState) -> PlayerCommand {
        let b = &self.bindings[id.index()];
        let axis = |pos: Key, neg: Key, speed: f32| {
            if keys.is_held(pos) {
                speed
            } else if keys.is_held(neg) {
                -speed
            } else {
                0.0
            }
        };

        PlayerCommand {
            forward: axis(b.forward, b.back, self.move_speed),
            strafe: axis(b.right, b.left, self.move_speed),
            rotate: axis(b.rotate_cw, b.rotate_ccw, self.rotate_speed),
            ..Default::default()
        }
    }
}
