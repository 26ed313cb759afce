//! Player identities, colours and capacity.
//!
//! Departed players keep their record (inactive) so that orphaned pieces can
//! still be traced to an owner until the orphan sweep forgets them.

use crate::utils::{display_name, player_color};
use log::info;
use shared::{Coord, GameError, Player, PlayerId};
use std::collections::{BTreeMap, HashMap};

pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    /// Active players in join order
    active: BTreeMap<u32, PlayerId>,
    next_player_id: u32,
    next_color_index: u32,
    max_players: usize,
}

impl PlayerRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            players: HashMap::new(),
            active: BTreeMap::new(),
            next_player_id: 1,
            next_color_index: 0,
            max_players,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active.len() < self.max_players
    }

    /// Registers a new active player anchored at `anchor`.
    pub fn join(
        &mut self,
        name: Option<&str>,
        anchor: Coord,
        now: u64,
    ) -> Result<Player, GameError> {
        if !self.has_capacity() {
            return Err(GameError::CapacityExceeded);
        }

        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let color_index = self.next_color_index;
        self.next_color_index += 1;

        let player = Player {
            id,
            name: display_name(name),
            color: player_color(color_index),
            color_index,
            active: true,
            joined_at: now,
            anchor,
        };

        info!(
            "Player {} '{}' joined with colour {} at {}",
            id, player.name, player.color, anchor
        );
        self.active.insert(color_index, id);
        self.players.insert(id, player.clone());
        Ok(player)
    }

    /// Marks a player inactive. Returns the player only on the first call.
    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.get_mut(&id)?;
        if !player.active {
            return None;
        }
        player.active = false;
        self.active.remove(&player.color_index);
        info!("Player {} '{}' left", id, player.name);
        Some(player.clone())
    }

    /// Drops an inactive player's record entirely.
    pub fn forget(&mut self, id: PlayerId) -> bool {
        match self.players.get(&id) {
            Some(player) if !player.active => {
                self.players.remove(&id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn is_active(&self, id: PlayerId) -> bool {
        self.players.get(&id).map_or(false, |player| player.active)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_players(&self) -> Vec<Player> {
        self.active
            .values()
            .filter_map(|id| self.players.get(id))
            .cloned()
            .collect()
    }

    pub fn active_anchors(&self) -> Vec<Coord> {
        self.active
            .values()
            .filter_map(|id| self.players.get(id))
            .map(|player| player.anchor)
            .collect()
    }

    pub fn inactive_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .players
            .values()
            .filter(|player| !player.active)
            .map(|player| player.id)
            .collect();
        ids.sort();
        ids
    }
}
