use crate::shape::{Shape, ShapeId};

/// Committed shapes (back to front) and the shapes removed by undo.
///
/// Undo and redo move whole shapes between the two stacks, so a shape is
/// always in exactly one of them and keeps its attributes.
#[derive(Clone, Debug, Default)]
pub struct History {
    committed: Vec<Shape>,
    redo: Vec<Shape>,
}

/// One row of the layer list; `index` is in display order (0 = newest).
#[derive(Clone, Debug, PartialEq)]
pub struct LayerEntry {
    pub index: usize,
    pub id: ShapeId,
    pub kind: &'static str,
    pub label: String,
}

impl History {
    pub fn shapes(&self) -> &[Shape] {
        &self.committed
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.committed.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn commit(&mut self, shape: Shape) {
        self.committed.push(shape);
        self.redo.clear();
    }

    pub fn undo(&mut self) -> bool {
        match self.committed.pop() {
            Some(shape) => {
                self.redo.push(shape);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(shape) => {
                self.committed.push(shape);
                true
            }
            None => false,
        }
    }

    /// Removes the shape at `index` in display order (0 = most recent).
    pub fn delete_at(&mut self, index: usize) -> Option<Shape> {
        let position = self.committed.len().checked_sub(index)?.checked_sub(1)?;
        Some(self.committed.remove(position))
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.redo.clear();
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.committed.iter_mut().find(|shape| shape.id == id)
    }

    pub fn layer_entries(&self) -> Vec<LayerEntry> {
        self.committed
            .iter()
            .rev()
            .enumerate()
            .map(|(index, shape)| LayerEntry {
                index,
                id: shape.id,
                kind: shape.kind.name(),
                label: shape.label(),
            })
            .collect()
    }
}
