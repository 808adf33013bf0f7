//! Nodes of tree-backed collections.
//!
//! Subtrees are shared between clones through [`triomphe::Arc`] and each
//! internal node memoizes its root, so mutating one element copies and
//! re-hashes only the path from the root to the affected chunk.

use std::sync::OnceLock;

use ethereum_types::H256;
use hashing::hash_256_256;
use triomphe::Arc;
use typenum::Unsigned;

use crate::{
    error::IndexError,
    merkle::{zero_subtree_root, BYTES_PER_CHUNK},
    porcelain::{SszHash, SszWrite},
    size::Size,
};

#[derive(Clone, Debug)]
pub enum Node<T> {
    Internal {
        left: Arc<Node<T>>,
        right: Arc<Node<T>>,
        cached_root: OnceLock<H256>,
    },
    /// A single chunk's worth of elements. The final leaf of a collection may
    /// be partially filled; chunk hashing pads it with zero bytes.
    Leaf { elements: Box<[T]> },
    /// An absent (all-zero) subtree to the right of the last element.
    Zero,
}

impl<T> Node<T> {
    pub fn internal(left: Arc<Self>, right: Arc<Self>) -> Self {
        Self::Internal {
            left,
            right,
            cached_root: OnceLock::new(),
        }
    }
}

/// Number of elements per chunk for `T`.
pub fn packing_factor<T: SszHash>() -> u64 {
    T::PackingFactor::U64
}

/// Number of elements covered by a subtree `depth` levels above the chunks.
fn subtree_capacity<T: SszHash>(depth: u8) -> u64 {
    (1_u64 << depth) * packing_factor::<T>()
}

pub fn node_root<T: SszHash + SszWrite>(node: &Node<T>, depth: u8) -> H256 {
    match node {
        Node::Zero => zero_subtree_root(depth),
        Node::Leaf { elements } => leaf_chunk(elements),
        Node::Internal {
            left,
            right,
            cached_root,
        } => *cached_root.get_or_init(|| {
            hash_256_256(node_root(left, depth - 1), node_root(right, depth - 1))
        }),
    }
}

fn leaf_chunk<T: SszHash + SszWrite>(elements: &[T]) -> H256 {
    if packing_factor::<T>() == 1 {
        return elements[0].hash_tree_root();
    }

    let Size::Fixed { size } = T::SIZE else {
        unreachable!("only fixed-size types have packing factors above 1")
    };

    let mut chunk = H256::zero();
    for (index, element) in elements.iter().enumerate() {
        element.write_fixed(&mut chunk[index * size..(index + 1) * size]);
    }
    debug_assert!(elements.len() * size <= BYTES_PER_CHUNK);
    chunk
}

pub fn node_get<T: SszHash>(node: &Node<T>, depth: u8, index: u64) -> Result<&T, IndexError> {
    match node {
        Node::Leaf { elements } => usize::try_from(index)
            .ok()
            .and_then(|index| elements.get(index))
            .ok_or(IndexError::ShapeMismatch),
        Node::Internal { left, right, .. } => {
            if depth == 0 {
                return Err(IndexError::ShapeMismatch);
            }

            let half = subtree_capacity::<T>(depth - 1);

            if index < half {
                node_get(left, depth - 1, index)
            } else {
                node_get(right, depth - 1, index - half)
            }
        }
        Node::Zero => Err(IndexError::ShapeMismatch),
    }
}

pub fn node_get_mut<T: SszHash + Clone>(
    node: &mut Arc<Node<T>>,
    depth: u8,
    index: u64,
) -> Result<&mut T, IndexError> {
    match Arc::make_mut(node) {
        Node::Leaf { elements } => usize::try_from(index)
            .ok()
            .and_then(|index| elements.get_mut(index))
            .ok_or(IndexError::ShapeMismatch),
        Node::Internal {
            left,
            right,
            cached_root,
        } => {
            if depth == 0 {
                return Err(IndexError::ShapeMismatch);
            }

            *cached_root = OnceLock::new();

            let half = subtree_capacity::<T>(depth - 1);

            if index < half {
                node_get_mut(left, depth - 1, index)
            } else {
                node_get_mut(right, depth - 1, index - half)
            }
        }
        Node::Zero => Err(IndexError::ShapeMismatch),
    }
}

/// Appends an element at `index`, materializing the path to it.
/// `index` must be the current element count of the subtree.
pub fn node_push<T: SszHash + Clone>(node: &mut Arc<Node<T>>, depth: u8, index: u64, value: T) {
    match Arc::make_mut(node) {
        node_mut @ Node::Zero => {
            debug_assert_eq!(index, 0);

            if depth == 0 {
                *node_mut = Node::Leaf {
                    elements: vec![value].into(),
                };
            } else {
                let mut left = Arc::new(Node::Zero);
                node_push(&mut left, depth - 1, index, value);
                *node_mut = Node::internal(left, Arc::new(Node::Zero));
            }
        }
        Node::Leaf { elements } => {
            debug_assert_eq!(index, elements.len() as u64);

            let mut grown = elements.to_vec();
            grown.push(value);
            *elements = grown.into();
        }
        Node::Internal {
            left,
            right,
            cached_root,
        } => {
            *cached_root = OnceLock::new();

            let half = subtree_capacity::<T>(depth - 1);

            if index < half {
                node_push(left, depth - 1, index, value);
            } else {
                node_push(right, depth - 1, index - half, value);
            }
        }
    }
}

/// Builds a left-packed subtree holding `count` copies of `element`.
pub fn node_repeat<T: SszHash + Clone>(element: &T, depth: u8, count: u64) -> Arc<Node<T>> {
    if count == 0 {
        return Arc::new(Node::Zero);
    }

    let pack = packing_factor::<T>();

    if depth == 0 {
        let count = usize::try_from(count).expect("chunk element counts fit in usize");
        debug_assert!(count as u64 <= pack);
        return Arc::new(Node::Leaf {
            elements: vec![element.clone(); count].into(),
        });
    }

    let half = subtree_capacity::<T>(depth - 1);

    if count <= half {
        Arc::new(Node::internal(
            node_repeat(element, depth - 1, count),
            Arc::new(Node::Zero),
        ))
    } else if count == half * 2 {
        // A full subtree can share one child for both halves.
        let child = node_repeat(element, depth - 1, half);
        Arc::new(Node::internal(child.clone(), child))
    } else {
        Arc::new(Node::internal(
            node_repeat(element, depth - 1, half),
            node_repeat(element, depth - 1, count - half),
        ))
    }
}

/// Borrowing iterator over the elements of a subtree, left to right.
#[derive(Clone)]
pub struct NodeIter<'tree, T> {
    stack: Vec<&'tree Node<T>>,
    current: std::slice::Iter<'tree, T>,
    remaining: u64,
}

impl<'tree, T> NodeIter<'tree, T> {
    pub fn new(root: &'tree Node<T>, length: u64) -> Self {
        Self {
            stack: vec![root],
            current: [].iter(),
            remaining: length,
        }
    }
}

impl<'tree, T> Iterator for NodeIter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        loop {
            if let Some(element) = self.current.next() {
                self.remaining -= 1;
                return Some(element);
            }

            match self.stack.pop()? {
                Node::Internal { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
                Node::Leaf { elements } => self.current = elements.iter(),
                Node::Zero => {}
            }
        }
    }
}
