// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Circular singly-linked list over an index arena.
//!
//! The list keeps one handle, `tail`, whose `next` is always the head. That gives
//! O(1) push at the tail and O(1) access to both ends. Links are slot indices into
//! a growable vector, so splicing two rings only rebases the indices of the second.

use alloc::vec::Vec;

#[derive(Clone, Debug)]
struct Link<T> {
    value: T,
    next: usize,
}

#[derive(Clone, Debug)]
pub(crate) struct Ring<T> {
    links: Vec<Link<T>>,
    tail: Option<usize>,
}

impl<T> Default for Ring<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Ring<T> {
    pub(crate) const fn new() -> Self {
        Self {
            links: Vec::new(),
            tail: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tail.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    fn head(&self) -> Option<usize> {
        self.tail.map(|tail| self.links[tail].next)
    }

    pub(crate) fn last(&self) -> Option<&T> {
        self.tail.map(|tail| &self.links[tail].value)
    }

    /// Insert `value` as the new tail.
    pub(crate) fn push(&mut self, value: T) {
        let idx = self.links.len();
        let next = match self.tail {
            Some(tail) => core::mem::replace(&mut self.links[tail].next, idx),
            None => idx,
        };
        self.links.push(Link { value, next });
        self.tail = Some(idx);
    }

    /// Splice `other` in after the tail of `self`.
    ///
    /// The first element of `self` stays first; the old tail now points at the
    /// head of `other` and the tail of `other` closes the ring back to the head.
    pub(crate) fn append(&mut self, other: Self) {
        let Some(other_tail) = other.tail else {
            return;
        };
        let Some(tail) = self.tail else {
            *self = other;
            return;
        };
        let offset = self.links.len();
        let head = self.links[tail].next;
        let other_head = other.links[other_tail].next + offset;
        self.links.extend(other.links.into_iter().map(|link| Link {
            value: link.value,
            next: link.next + offset,
        }));
        self.links[tail].next = other_head;
        self.links[other_tail + offset].next = head;
        self.tail = Some(other_tail + offset);
    }

    pub(crate) fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Walk once around the ring, starting at the head.
    pub(crate) fn iter(&self) -> RingIter<'_, T> {
        let head = self.head();
        RingIter {
            ring: self,
            head: head.unwrap_or(0),
            cursor: head,
        }
    }
}

pub(crate) struct RingIter<'a, T> {
    ring: &'a Ring<T>,
    head: usize,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for RingIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let at = self.cursor?;
        let link = &self.ring.links[at];
        self.cursor = (link.next != self.head).then_some(link.next);
        Some(&link.value)
    }
}
