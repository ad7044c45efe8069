//! Entities: players, grippers, items and baskets
//!
//! Every entity exposes an axis-aligned bounding box; collisions are plain
//! box overlaps.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::input::PlayerId;
use crate::{heading_vector, screen_center, wrap_degrees};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size / 2.0;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn from_top_left(top_left: Vec2, size: Vec2) -> Self {
        Self {
            min: top_left,
            max: top_left + size,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Strict overlap (touching edges do not count)
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Bounding box of a `width` x `length` bar rotated to `heading` degrees.
///
/// The bar's long side is perpendicular to the heading, like a claw held
/// across the nose of the player.
fn rotated_extent(width: f32, length: f32, heading: f32) -> Vec2 {
    let rad = heading.to_radians();
    let (sin, cos) = (rad.sin().abs(), rad.cos().abs());
    Vec2::new(width * cos + length * sin, width * sin + length * cos)
}

/// A player's avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Center position (pixels)
    pub pos: Vec2,
    /// Heading in degrees, always in [0, 360)
    pub heading: f32,
    pub move_speed: f32,
    pub rotate_speed: f32,
    /// Mirrors the gripper; drives the "gripped" sprite
    pub has_item: bool,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            pos: Self::spawn_position(id),
            heading: Self::spawn_heading(id),
            move_speed: PLAYER_MOVE_SPEED,
            rotate_speed: PLAYER_ROTATE_SPEED,
            has_item: false,
        }
    }

    /// Players start level with the pool, one on each side of it
    pub fn spawn_position(id: PlayerId) -> Vec2 {
        let center = screen_center();
        let dx = POOL_RADIUS + PLAYER_START_GAP;
        match id {
            PlayerId::One => Vec2::new(center.x - dx, center.y),
            PlayerId::Two => Vec2::new(center.x + dx, center.y),
        }
    }

    /// Both players start facing the pool
    pub fn spawn_heading(id: PlayerId) -> f32 {
        match id {
            PlayerId::One => 0.0,
            PlayerId::Two => 180.0,
        }
    }

    /// Rotate, then translate relative to the new heading, then clamp on-screen.
    pub fn advance(&mut self, forward: f32, strafe: f32, rotate: f32) {
        self.heading = wrap_degrees(self.heading + rotate);

        let ahead = heading_vector(self.heading);
        let side = heading_vector(self.heading + 90.0);
        self.pos += ahead * forward + side * strafe;

        self.clamp_to_screen();
    }

    fn clamp_to_screen(&mut self) {
        let half = PLAYER_SIZE / 2.0;
        self.pos.x = self.pos.x.clamp(half, WIDTH - half);
        self.pos.y = self.pos.y.clamp(half, HEIGHT - half);
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_center(self.pos, Vec2::splat(PLAYER_SIZE))
    }
}

/// What a grab press did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GripOutcome {
    /// No press pending, or nothing to pick up
    #[default]
    Idle,
    /// Picked up the item with this id
    PickedUp(u32),
    /// Dropped the held item as a new item with this id
    Dropped(u32),
}

/// Claw attached to the front of a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gripper {
    /// Player this gripper follows
    pub owner: PlayerId,
    pub pos: Vec2,
    pub heading: f32,
    pub has_item: bool,
    /// One-shot grab request, consumed by `handle_grip`
    pub press_pending: bool,
}

impl Gripper {
    pub fn new(owner: &Player) -> Self {
        let mut gripper = Self {
            owner: owner.id,
            pos: owner.pos,
            heading: owner.heading,
            has_item: false,
            press_pending: false,
        };
        gripper.place(owner);
        gripper
    }

    fn place(&mut self, owner: &Player) {
        self.heading = owner.heading;
        self.pos = owner.pos + heading_vector(owner.heading) * GRIPPER_OFFSET;
    }

    /// Snap to the owner's nose and mirror the held state onto it
    pub fn follow(&mut self, owner: &mut Player) {
        debug_assert_eq!(owner.id, self.owner);
        self.place(owner);
        owner.has_item = self.has_item;
    }

    pub fn press(&mut self) {
        self.press_pending = true;
    }

    /// Resolve a pending press against the item list.
    ///
    /// Empty-handed: take the first overlapping item. Holding: drop a fresh
    /// item (id from `new_id`) at the gripper. The press is consumed either way.
    pub fn handle_grip(
        &mut self,
        items: &mut Vec<Item>,
        new_id: impl FnOnce() -> u32,
    ) -> GripOutcome {
        if !self.press_pending {
            return GripOutcome::Idle;
        }
        self.press_pending = false;

        if self.has_item {
            let id = new_id();
            items.push(Item::new(id, self.pos));
            self.has_item = false;
            return GripOutcome::Dropped(id);
        }

        let bounds = self.bounds();
        match items.iter().position(|item| item.bounds().intersects(&bounds)) {
            Some(index) => {
                let item = items.remove(index);
                self.has_item = true;
                GripOutcome::PickedUp(item.id)
            }
            None => GripOutcome::Idle,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_center(
            self.pos,
            rotated_extent(GRIPPER_WIDTH, GRIPPER_LENGTH, self.heading),
        )
    }
}

/// A collectable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub pos: Vec2,
}

impl Item {
    pub fn new(id: u32, pos: Vec2) -> Self {
        Self { id, pos }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_center(self.pos, Vec2::splat(ITEM_SIZE))
    }
}

/// A player's scoring basket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basket {
    pub owner: PlayerId,
    /// Top-left corner
    pub pos: Vec2,
    pub score: u32,
}

impl Basket {
    pub fn new(owner: PlayerId) -> Self {
        let y = HEIGHT / 2.0 - BASKET_HEIGHT / 2.0;
        let x = match owner {
            PlayerId::One => BASKET_MARGIN,
            PlayerId::Two => WIDTH - BASKET_MARGIN - BASKET_WIDTH,
        };
        Self {
            owner,
            pos: Vec2::new(x, y),
            score: 0,
        }
    }

    /// Remove every overlapping item, scoring one point each.
    /// Returns the number of items collected.
    pub fn collect(&mut self, items: &mut Vec<Item>) -> u32 {
        let bounds = self.bounds();
        let before = items.len();
        items.retain(|item| !item.bounds().intersects(&bounds));
        let collected = (before - items.len()) as u32;
        self.score += collected;
        collected
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_top_left(self.pos, Vec2::new(BASKET_WIDTH, BASKET_HEIGHT))
    }
}

/// Kind tag for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Gripper,
    Item,
    Basket,
}

/// Borrowed view over any entity, for renderers and hit-testing
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Player(&'a Player),
    Gripper(&'a Gripper),
    Item(&'a Item),
    Basket(&'a Basket),
}

impl Entity<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Player(_) => EntityKind::Player,
            Entity::Gripper(_) => EntityKind::Gripper,
            Entity::Item(_) => EntityKind::Item,
            Entity::Basket(_) => EntityKind::Basket,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Entity::Player(p) => p.bounds(),
            Entity::Gripper(g) => g.bounds(),
            Entity::Item(i) => i.bounds(),
            Entity::Basket(b) => b.bounds(),
        }
    }

    /// Owning player, for entities that have one
    pub fn owner(&self) -> Option<PlayerId> {
        match self {
            Entity::Player(p) => Some(p.id),
            Entity::Gripper(g) => Some(g.owner),
            Entity::Item(_) => None,
            Entity::Basket(b) => Some(b.owner),
        }
    }

    /// Heading in degrees, for entities drawn rotated
    pub fn heading(&self) -> Option<f32> {
        match self {
            Entity::Player(p) => Some(p.heading),
            Entity::Gripper(g) => Some(g.heading),
            Entity::Item(_) | Entity::Basket(_) => None,
        }
    }
}
