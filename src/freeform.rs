//! Freeform placement engine.
//!
//! Cells are picked up into floating blocks and placed anywhere, displacing
//! whatever was there. The engine mutates the session's working copy in
//! place; the persisted option is never touched.
//!
//! A block has at most one pending placement. Several placements may target
//! the same cell: the latest one is shown in the grid and validation reports
//! the cell as a teacher conflict until the stack is resolved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{EditError, EditResult};
use crate::models::{Entry, ScheduleOption, StudyHallAssignment, TimeSlot};
use crate::swap::{entry_at, CellRef};

/// Identifier of a floating block, unique within one freeform session.
pub type BlockId = u32;

/// A detached grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingBlock {
    /// Block id.
    pub id: BlockId,
    /// Cell the block was lifted from.
    pub source: CellRef,
    /// Group label of the lifted entry.
    pub group: String,
    /// Subject of the lifted entry, if it was a class.
    pub subject: Option<String>,
    /// The lifted entry itself.
    pub payload: Entry,
}

/// Where a block currently sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlacement {
    /// Placed block.
    pub block: BlockId,
    /// Destination cell.
    pub dest: CellRef,
    /// What the destination shows once no placement covers it.
    pub replaced: Entry,
}

/// Floating blocks, their placements, and the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeformState {
    blocks: BTreeMap<BlockId, FloatingBlock>,
    /// Oldest first; the last placement on a cell is the visible one.
    placements: Vec<PendingPlacement>,
    selected: Option<BlockId>,
    next_id: BlockId,
}

impl FreeformState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// All blocks, by id.
    pub fn blocks(&self) -> impl Iterator<Item = &FloatingBlock> {
        self.blocks.values()
    }

    /// A block by id.
    pub fn block(&self, id: BlockId) -> Option<&FloatingBlock> {
        self.blocks.get(&id)
    }

    /// All pending placements, oldest first.
    pub fn placements(&self) -> &[PendingPlacement] {
        &self.placements
    }

    /// Placement of a block.
    pub fn placement(&self, id: BlockId) -> Option<&PendingPlacement> {
        self.placements.iter().find(|p| p.block == id)
    }

    /// Selected block.
    pub fn selected(&self) -> Option<BlockId> {
        self.selected
    }

    /// Blocks with no placement.
    pub fn unplaced(&self) -> impl Iterator<Item = &FloatingBlock> {
        self.blocks
            .values()
            .filter(|b| self.placement(b.id).is_none())
    }

    /// Whether nothing is floating or placed.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Cells targeted by more than one placement, with the blocks on them.
    pub fn stacked_cells(&self) -> Vec<(CellRef, Vec<BlockId>)> {
        let mut by_cell: BTreeMap<(String, TimeSlot), (CellRef, Vec<BlockId>)> = BTreeMap::new();
        for p in &self.placements {
            let key = (p.dest.teacher.clone(), p.dest.slot);
            by_cell
                .entry(key)
                .or_insert_with(|| (p.dest.clone(), Vec::new()))
                .1
                .push(p.block);
        }
        by_cell
            .into_values()
            .filter(|(_, blocks)| blocks.len() > 1)
            .collect()
    }

    fn alloc_id(&mut self) -> BlockId {
        self.next_id += 1;
        self.next_id
    }

    fn block_or_err(&self, id: BlockId) -> EditResult<&FloatingBlock> {
        self.blocks.get(&id).ok_or(EditError::UnknownBlock(id))
    }

    fn lift(&mut self, option: &mut ScheduleOption, cell: &CellRef) -> EditResult<BlockId> {
        let entry = entry_at(option, cell)?.clone();
        let id = self.alloc_id();
        let group = entry.label().to_string();
        write_cell(option, cell, Entry::open_for(group.clone()))?;
        option.mirror_clear(&cell.teacher, cell.slot, &group);
        self.blocks.insert(
            id,
            FloatingBlock {
                id,
                source: cell.clone(),
                group,
                subject: entry.subject().map(String::from),
                payload: entry,
            },
        );
        Ok(id)
    }

    /// Picks up the entry at `cell` into a new selected block.
    ///
    /// The cell becomes `Open(group)` and its mirror entry is removed.
    pub fn pick_up(&mut self, option: &mut ScheduleOption, cell: &CellRef) -> EditResult<BlockId> {
        let entry = entry_at(option, cell)?;
        if self.placements.iter().any(|p| p.dest == *cell) {
            return Err(EditError::PlacedCell {
                teacher: cell.teacher.clone(),
                slot: cell.slot,
            });
        }
        if self.blocks.values().any(|b| b.source == *cell) {
            return Err(EditError::AlreadyPickedUp {
                teacher: cell.teacher.clone(),
                slot: cell.slot,
            });
        }
        if entry.is_open() {
            return Err(EditError::OpenSlot {
                teacher: cell.teacher.clone(),
                slot: cell.slot,
            });
        }

        let id = self.lift(option, cell)?;
        self.selected = Some(id);
        debug!(block = id, teacher = %cell.teacher, slot = %cell.slot, "picked up");
        Ok(id)
    }

    /// Places the selected block at `dest`.
    ///
    /// Original content at `dest` is lifted into a new block and the
    /// selection moves to it. Returns the displaced block id.
    pub fn place(
        &mut self,
        option: &mut ScheduleOption,
        dest: &CellRef,
    ) -> EditResult<Option<BlockId>> {
        let id = self.selected.ok_or(EditError::NoSelection)?;
        let payload = self.block_or_err(id)?.payload.clone();
        entry_at(option, dest)?;

        if self.placement(id).is_some() {
            self.clear_placement(option, id)?;
        }

        let beneath = self.placements.iter().rev().find(|p| p.dest == *dest).cloned();
        let mut displaced = None;
        let replaced = match beneath {
            Some(under) => {
                // Stacking onto another placement; the grid shows the newest.
                option.mirror_clear(&dest.teacher, dest.slot, under.replaced.label());
                if let Some(b) = self.blocks.get(&under.block) {
                    option.mirror_clear(&dest.teacher, dest.slot, b.payload.label());
                }
                under.replaced
            }
            None => {
                let current = entry_at(option, dest)?;
                if current.is_open() {
                    current.clone()
                } else {
                    let new_id = self.lift(option, dest)?;
                    displaced = Some(new_id);
                    entry_at(option, dest)?.clone()
                }
            }
        };

        write_cell(option, dest, payload.clone())?;
        option.mirror_write(&dest.teacher, dest.slot, &payload);
        self.placements.push(PendingPlacement {
            block: id,
            dest: dest.clone(),
            replaced,
        });
        self.selected = displaced;
        debug!(
            block = id,
            teacher = %dest.teacher,
            slot = %dest.slot,
            displaced = ?displaced,
            "placed"
        );
        Ok(displaced)
    }

    /// Removes a placement and restores what its cell should now show.
    fn clear_placement(&mut self, option: &mut ScheduleOption, id: BlockId) -> EditResult<()> {
        let Some(pos) = self.placements.iter().position(|p| p.block == id) else {
            return Ok(());
        };
        let removed = self.placements.remove(pos);
        let dest = &removed.dest;
        if let Some(block) = self.blocks.get(&id) {
            option.mirror_clear(&dest.teacher, dest.slot, block.payload.label());
        }

        let uncovered = self
            .placements
            .iter()
            .rev()
            .find(|p| p.dest == *dest)
            .and_then(|p| self.blocks.get(&p.block))
            .map(|b| b.payload.clone());
        match uncovered {
            Some(payload) => {
                write_cell(option, dest, payload.clone())?;
                option.mirror_write(&dest.teacher, dest.slot, &payload);
            }
            None => {
                write_cell(option, dest, removed.replaced.clone())?;
            }
        }
        Ok(())
    }

    /// Puts a block back where it was picked up.
    ///
    /// Placements sitting on the block's source are evicted first and their
    /// blocks float again, unplaced.
    pub fn return_block(
        &mut self,
        option: &mut ScheduleOption,
        id: BlockId,
    ) -> EditResult<Vec<BlockId>> {
        let block = self.block_or_err(id)?.clone();
        self.clear_placement(option, id)?;

        let evicted: Vec<BlockId> = self
            .placements
            .iter()
            .filter(|p| p.dest == block.source)
            .map(|p| p.block)
            .collect();
        for other in &evicted {
            self.clear_placement(option, *other)?;
        }

        write_cell(option, &block.source, block.payload.clone())?;
        option.mirror_write(&block.source.teacher, block.source.slot, &block.payload);
        self.blocks.remove(&id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        debug!(block = id, evicted = ?evicted, "returned");
        Ok(evicted)
    }

    /// Clears a block's placement and selects it.
    pub fn unplace(&mut self, option: &mut ScheduleOption, id: BlockId) -> EditResult<()> {
        self.block_or_err(id)?;
        self.clear_placement(option, id)?;
        self.selected = Some(id);
        debug!(block = id, "unplaced");
        Ok(())
    }

    /// Toggles selection of a floating block.
    ///
    /// Returns the new selection.
    pub fn select(&mut self, id: BlockId) -> EditResult<Option<BlockId>> {
        self.block_or_err(id)?;
        if self.placement(id).is_some() {
            return Err(EditError::BlockPlaced(id));
        }
        self.selected = if self.selected == Some(id) { None } else { Some(id) };
        Ok(self.selected)
    }

    /// Moves study-hall records along with their placed blocks.
    ///
    /// Called once when the working copy is committed.
    pub fn sync_study_halls(&self, option: &mut ScheduleOption) {
        for p in &self.placements {
            let Some(block) = self.blocks.get(&p.block) else {
                continue;
            };
            let Entry::StudyHall { group } = &block.payload else {
                continue;
            };
            if let Some(i) =
                option.study_hall_record(group, &block.source.teacher, block.source.slot)
            {
                option.study_hall_assignments[i] =
                    StudyHallAssignment::placed(group.clone(), p.dest.teacher.clone(), p.dest.slot);
            }
        }
    }
}

fn write_cell(option: &mut ScheduleOption, cell: &CellRef, entry: Entry) -> EditResult<()> {
    option
        .teacher_schedules
        .get_mut(&cell.teacher)
        .ok_or_else(|| EditError::UnknownTeacher(cell.teacher.clone()))?
        .set(cell.slot, entry)
        .map(|_| ())
        .ok_or(EditError::SlotOutOfRange(cell.slot))
}
