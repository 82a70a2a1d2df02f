//! Fixed-bucket hash table with separate chaining, keyed by caller-chosen integers.
//!
//! Nodes live in one arena and chains link them by index. Items are never
//! removed one by one; the whole table is released by [`HealthRegistry::clear`]
//! or on drop. There is no rehashing, so the bucket count chosen at
//! construction bounds the load factor.

use std::collections::TryReserveError;

use thiserror::Error;

/// Bucket count used when zero is requested
pub const DEFAULT_BUCKETS: usize = 32;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Invoked once per item when the table is cleared or dropped
pub type RemoveCallback<V> = Box<dyn FnMut(u32, V)>;

struct Node<V> {
    key: u32,
    value: V,
    next: Option<usize>,
}

pub struct HealthRegistry<V> {
    heads: Vec<Option<usize>>,
    nodes: Vec<Node<V>>,
    on_remove: Option<RemoveCallback<V>>,
}

impl<V> HealthRegistry<V> {
    pub fn new(bucket_count: usize) -> Self {
        let bucket_count = if bucket_count == 0 {
            DEFAULT_BUCKETS
        } else {
            bucket_count
        };
        Self {
            heads: vec![None; bucket_count],
            nodes: Vec::new(),
            on_remove: None,
        }
    }

    pub fn with_on_remove(mut self, on_remove: RemoveCallback<V>) -> Self {
        self.on_remove = Some(on_remove);
        self
    }

    pub fn bucket_count(&self) -> usize {
        self.heads.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn bucket_of(&self, key: u32) -> usize {
        key as usize % self.heads.len()
    }

    /// Insert `value` under `key`, returning the value it replaced.
    ///
    /// An existing key is updated in place; a new key is appended to the
    /// tail of its bucket's chain.
    pub fn add(&mut self, key: u32, value: V) -> Result<Option<V>, RegistryError> {
        let bucket = self.bucket_of(key);
        let mut cursor = self.heads[bucket];
        let mut tail = None;

        while let Some(idx) = cursor {
            let node = &mut self.nodes[idx];
            if node.key == key {
                return Ok(Some(std::mem::replace(&mut node.value, value)));
            }
            tail = Some(idx);
            cursor = node.next;
        }

        self.nodes.try_reserve(1)?;
        let idx = self.nodes.len();
        self.nodes.push(Node {
            key,
            value,
            next: None,
        });
        match tail {
            Some(last) => self.nodes[last].next = Some(idx),
            None => self.heads[bucket] = Some(idx),
        }
        Ok(None)
    }

    #[allow(dead_code)]
    pub fn lookup(&self, key: u32) -> Option<&V> {
        let mut cursor = self.heads[self.bucket_of(key)];
        while let Some(idx) = cursor {
            let node = &self.nodes[idx];
            if node.key == key {
                return Some(&node.value);
            }
            cursor = node.next;
        }
        None
    }

    /// Entries in bucket-then-chain order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            registry: self,
            bucket: 0,
            cursor: None,
        }
    }

    /// Release every item, handing each to the remove callback in iteration order.
    pub fn clear(&mut self) {
        let mut slots: Vec<Option<Node<V>>> = self.nodes.drain(..).map(Some).collect();
        let heads = std::mem::replace(&mut self.heads, Vec::new());

        for head in &heads {
            let mut cursor = *head;
            while let Some(idx) = cursor {
                let Some(node) = slots[idx].take() else {
                    break;
                };
                cursor = node.next;
                if let Some(on_remove) = self.on_remove.as_mut() {
                    on_remove(node.key, node.value);
                }
            }
        }

        self.heads = vec![None; heads.len()];
    }
}

impl<V> Drop for HealthRegistry<V> {
    fn drop(&mut self) {
        if self.on_remove.is_some() && !self.nodes.is_empty() {
            self.clear();
        }
    }
}

/// One-shot walk over a registry; the borrow keeps the table unchanged meanwhile.
pub struct Iter<'a, V> {
    registry: &'a HealthRegistry<V>,
    bucket: usize,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor.is_none() {
            if self.bucket >= self.registry.heads.len() {
                return None;
            }
            self.cursor = self.registry.heads[self.bucket];
            self.bucket += 1;
        }

        let idx = self.cursor?;
        let node = &self.registry.nodes[idx];
        self.cursor = node.next;
        Some((node.key, &node.value))
    }
}

impl<'a, V> IntoIterator for &'a HealthRegistry<V> {
    type Item = (u32, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
