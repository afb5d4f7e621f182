//! Cell handles
//!
//! Cells live in the graph arena and are referenced by index plus
//! generation, so a handle to a removed cell is detected instead of
//! dereferenced.

use std::fmt;
use std::marker::PhantomData;

/// Untyped cell handle - arena index plus slot generation
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    index: u32,
    generation: u32,
}

impl CellId {
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        CellId { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Typed handle to a computed cell producing values of type `T`
pub struct Signal<T> {
    id: CellId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Signal<T> {
    #[inline]
    pub(crate) fn new(id: CellId) -> Self {
        Signal {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn id(self) -> CellId {
        self.id
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({})", self.id)
    }
}

impl<T> From<Signal<T>> for CellId {
    fn from(signal: Signal<T>) -> Self {
        signal.id
    }
}
