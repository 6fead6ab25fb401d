use std::collections::HashMap;

use tracing::trace;

use crate::codec::{GridPoint, TileState};

/// Session-lifetime store of every tile seen so far.
///
/// Merging never regresses a known color to unknown: an incoming `None` at an
/// index leaves the cached color alone, an incoming color always overwrites.
#[derive(Debug, Clone, Default)]
pub struct TileCache {
    tiles: HashMap<GridPoint, TileState>,
}

impl TileCache {
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
        }
    }

    pub fn get(&self, point: GridPoint) -> Option<&TileState> {
        self.tiles.get(&point)
    }

    pub fn get_mut(&mut self, point: GridPoint) -> Option<&mut TileState> {
        self.tiles.get_mut(&point)
    }

    pub fn contains(&self, point: GridPoint) -> bool {
        self.tiles.contains_key(&point)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Store or merge `tile`. Returns whether the cache changed.
    pub fn put(&mut self, tile: TileState) -> bool {
        let point = tile.point();
        let Some(cached) = self.tiles.get_mut(&point) else {
            trace!(%point, "caching new tile");
            self.tiles.insert(point, tile);
            return true;
        };

        let mut modified = false;
        for (ix, incoming) in tile.buttons.into_iter().enumerate() {
            match cached.buttons.get_mut(ix) {
                Some(button) => {
                    if incoming.hex.is_some() && button.hex != incoming.hex {
                        button.hex = incoming.hex;
                        modified = true;
                    }
                }
                None => {
                    cached.buttons.push(incoming);
                    modified = true;
                }
            }
        }

        if modified {
            cached.next = tile.next;
        }
        trace!(%point, modified, "merged tile");
        modified
    }
}
