//! The simulation world: every entity in a round plus the spawn RNG

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::entity::{Basket, Entity, GripOutcome, Gripper, Item, Player};
use crate::consts::{POOL_RADIUS, POOL_SPAWN_INSET};
use crate::input::PlayerId;
use crate::screen_center;

/// All round entities, owned by the game loop and passed to every update
#[derive(Debug, Clone)]
pub struct SimulationWorld {
    pub players: [Player; 2],
    pub grippers: [Gripper; 2],
    pub baskets: [Basket; 2],
    /// Loose items (sorted by id for deterministic collision order)
    pub items: Vec<Item>,
    rng: Pcg32,
    next_item_id: u32,
}

impl SimulationWorld {
    pub fn new(seed: u64) -> Self {
        let players = [Player::new(PlayerId::One), Player::new(PlayerId::Two)];
        let grippers = [Gripper::new(&players[0]), Gripper::new(&players[1])];
        Self {
            players,
            grippers,
            baskets: [Basket::new(PlayerId::One), Basket::new(PlayerId::Two)],
            items: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            next_item_id: 1,
        }
    }

    /// Put every entity back at its round-start state.
    ///
    /// The RNG keeps its stream so consecutive rounds spawn differently.
    pub fn reset(&mut self) {
        self.players = [Player::new(PlayerId::One), Player::new(PlayerId::Two)];
        self.grippers = [
            Gripper::new(&self.players[0]),
            Gripper::new(&self.players[1]),
        ];
        self.baskets = [Basket::new(PlayerId::One), Basket::new(PlayerId::Two)];
        self.items.clear();
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    pub fn gripper(&self, id: PlayerId) -> &Gripper {
        &self.grippers[id.index()]
    }

    pub fn basket(&self, id: PlayerId) -> &Basket {
        &self.baskets[id.index()]
    }

    /// Allocate a new item ID
    pub fn next_item_id(&mut self) -> u32 {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }

    /// Resolve `id`'s pending grab press and mirror the result onto the player
    pub fn resolve_grip(&mut self, id: PlayerId) -> GripOutcome {
        let i = id.index();
        let next_item_id = &mut self.next_item_id;
        let outcome = self.grippers[i].handle_grip(&mut self.items, || {
            let fresh = *next_item_id;
            *next_item_id += 1;
            fresh
        });
        self.players[i].has_item = self.grippers[i].has_item;
        outcome
    }

    /// Spawn an item at a fixed position (e.g. a dropped item)
    pub fn spawn_item_at(&mut self, pos: Vec2) -> u32 {
        let id = self.next_item_id();
        self.items.push(Item::new(id, pos));
        id
    }

    /// Spawn an item uniformly inside the pool, kept clear of its rim
    pub fn spawn_item_in_pool(&mut self) -> u32 {
        let radius = POOL_RADIUS - POOL_SPAWN_INSET;
        // sqrt keeps the density uniform over the disc area
        let r = radius * self.rng.random::<f32>().sqrt();
        let theta = self.rng.random::<f32>() * TAU;
        let pos = screen_center() + Vec2::new(r * theta.cos(), r * theta.sin());
        self.spawn_item_at(pos)
    }

    /// Sum of both baskets
    pub fn total_score(&self) -> u32 {
        self.baskets.iter().map(|b| b.score).sum()
    }

    pub fn scores(&self) -> [u32; 2] {
        [self.baskets[0].score, self.baskets[1].score]
    }

    /// Every entity in draw order: baskets, items, then each player and its gripper
    pub fn entities(&self) -> Vec<Entity<'_>> {
        let mut out = Vec::with_capacity(6 + self.items.len());
        out.extend(self.baskets.iter().map(Entity::Basket));
        out.extend(self.items.iter().map(Entity::Item));
        for (player, gripper) in self.players.iter().zip(&self.grippers) {
            out.push(Entity::Player(player));
            out.push(Entity::Gripper(gripper));
        }
        out
    }
}
