//! The list node type and its traversal.

use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use rawmem_core::layout::{LayoutBuilder, TypeLayout};
use rawmem_core::MemError;
use rawmem_heap::pointer::{PointerCache, PtrField};
use rawmem_heap::{MemoryView, Struct};

/// One node of a singly-linked list, and through its head, the list.
///
/// Layout: `current` pointer at offset 0, `next` pointer at offset 4.
/// Elements are referenced, not copied: the list stores each element's
/// heap offset, and element identity is that offset.
pub struct List<T> {
    view: MemoryView,
    pointers: PointerCache,
    _element: PhantomData<fn() -> T>,
}

impl<T: Struct> Struct for List<T> {
    fn layout() -> &'static TypeLayout {
        // Shared by every element type: the two cells do not depend on T.
        static LAYOUT: OnceLock<TypeLayout> = OnceLock::new();
        LAYOUT.get_or_init(|| {
            let mut builder = LayoutBuilder::new("List");
            builder.pointer("current", "element").pointer("next", "List");
            builder.finish()
        })
    }

    fn bind(view: MemoryView) -> Self {
        Self {
            view,
            pointers: PointerCache::default(),
            _element: PhantomData,
        }
    }

    fn view(&self) -> &MemoryView {
        &self.view
    }

    fn pointer_cache(&self) -> &PointerCache {
        &self.pointers
    }
}

impl<T: Struct> List<T> {
    /// The element held by this node.
    pub fn current(&self) -> PtrField<'_, T> {
        PtrField::new(
            &self.view,
            &self.pointers,
            Self::layout().descriptor("current"),
        )
    }

    /// The following node.
    pub fn next(&self) -> PtrField<'_, List<T>> {
        PtrField::new(&self.view, &self.pointers, Self::layout().descriptor("next"))
    }

    /// Append `value`.
    ///
    /// The first node with an empty `current` takes the value; otherwise a
    /// new node is allocated from the tail node's heap and linked after
    /// it. Fails with [`MemError::InvalidTarget`] if `value` does not live
    /// in the list's heap, and with [`MemError::HeapUnavailable`] if the
    /// list has no live heap to grow into.
    pub fn add(&self, value: &T) -> Result<&Self, MemError> {
        let mut node = self.clone();
        loop {
            if node.current().is_null() {
                node.current().set(Some(value))?;
                return Ok(self);
            }
            match node.next().get()? {
                Some(next) => node = next,
                None => {
                    let heap = node.heap().ok_or(MemError::HeapUnavailable)?;
                    let tail = Self::new_in(&heap)?;
                    if let Err(err) = tail.current().set(Some(value)) {
                        heap.free(&tail);
                        return Err(err);
                    }
                    node.next().set(Some(&tail))?;
                    return Ok(self);
                }
            }
        }
    }

    /// Walk the list, yielding each element with the node holding it.
    ///
    /// The iterator is lazy and finite, and each call starts again from
    /// this node. It stops after the first dereference error.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            cursor: Some(self.clone()),
        }
    }

    /// Call `f` with every element in order.
    pub fn for_each<F>(&self, mut f: F) -> Result<(), MemError>
    where
        F: FnMut(T),
    {
        for item in self.iter() {
            let (value, _) = item?;
            f(value);
        }
        Ok(())
    }

    /// All elements in order.
    pub fn values(&self) -> Result<Vec<T>, MemError> {
        self.iter().map(|item| item.map(|(value, _)| value)).collect()
    }

    /// Number of elements.
    pub fn len(&self) -> Result<usize, MemError> {
        self.iter().try_fold(0, |n, item| item.map(|_| n + 1))
    }

    /// Whether the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.current().is_null() && self.next().is_null()
    }

    /// Whether the element at `value`'s heap offset is in the list.
    pub fn contains(&self, value: &T) -> Result<bool, MemError> {
        let Some(target) = value.heap_offset() else {
            return Ok(false);
        };
        for item in self.iter() {
            let (_, node) = item?;
            if node.current().offset() == target {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Unlink the first node holding `value`.
    ///
    /// Elements match by heap offset. Removing the head copies the
    /// second node into the head, so the list value keeps its identity.
    /// Unlinked nodes are not freed. Returns whether a node was unlinked;
    /// removing an absent value changes nothing.
    pub fn remove(&self, value: &T) -> Result<bool, MemError> {
        let target = match value.heap_offset() {
            Some(offset) if offset != 0 => offset,
            _ => return Ok(false),
        };
        let mut last: Option<List<T>> = None;
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            let next = node.next().get()?;
            if node.current().offset() == target {
                match (&last, &next) {
                    (Some(prev), Some(succ)) => prev.next().set(Some(succ))?,
                    (None, Some(succ)) => {
                        node.current().set_offset(succ.current().offset())?;
                        node.next().set_offset(succ.next().offset())?;
                    }
                    (Some(prev), None) => prev.next().set(None)?,
                    (None, None) => node.current().set(None)?,
                }
                return Ok(true);
            }
            last = Some(node);
            cursor = next;
        }
        Ok(false)
    }
}

impl<T> Clone for List<T> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            pointers: self.pointers.clone(),
            _element: PhantomData,
        }
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("offset", &self.view.heap_offset())
            .finish()
    }
}

impl<'a, T: Struct> IntoIterator for &'a List<T> {
    type Item = Result<(T, List<T>), MemError>;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        self.iter()
    }
}

/// Iterator over `(element, node)` pairs; see [`List::iter`].
pub struct Iter<T> {
    cursor: Option<List<T>>,
}

impl<T: Struct> Iterator for Iter<T> {
    type Item = Result<(T, List<T>), MemError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.cursor.take()?;
            match node.next().get() {
                Ok(next) => self.cursor = next,
                Err(err) => return Some(Err(err)),
            }
            match node.current().get() {
                Ok(Some(value)) => return Some(Ok((value, node))),
                Ok(None) => continue,
                Err(err) => {
                    self.cursor = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

impl<T> fmt::Debug for Iter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("cursor", &self.cursor)
            .finish()
    }
}
