//! Lookups over a comment forest.
//!
//! Traversal is pre-order depth-first: a root is checked, then its whole
//! reply subtree, then the next root. An explicit stack is used instead of
//! recursion so arbitrarily deep reply chains cannot exhaust the call stack.

use std::slice;

use crate::{Comment, CommentId};

pub fn find<'a>(forest: &'a [Comment], id: &CommentId) -> Option<&'a Comment> {
    let mut stack: Vec<slice::Iter<'a, Comment>> = vec![forest.iter()];
    while let Some(level) = stack.last_mut() {
        match level.next() {
            None => {
                stack.pop();
            }
            Some(c) if c.id == *id => return Some(c),
            Some(c) => stack.push(c.children.iter()),
        }
    }
    None
}

pub fn find_mut<'a>(forest: &'a mut [Comment], id: &CommentId) -> Option<&'a mut Comment> {
    let mut stack: Vec<slice::IterMut<'a, Comment>> = vec![forest.iter_mut()];
    while let Some(level) = stack.last_mut() {
        let c = match level.next() {
            None => {
                stack.pop();
                continue;
            }
            Some(c) => c,
        };
        if c.id == *id {
            return Some(c);
        }
        stack.push(c.children.iter_mut());
    }
    None
}

pub fn contains(forest: &[Comment], id: &CommentId) -> bool {
    find(forest, id).is_some()
}

/// Total number of nodes, replies included.
pub fn count(forest: &[Comment]) -> usize {
    let mut total = 0;
    let mut stack: Vec<&Comment> = forest.iter().collect();
    while let Some(c) = stack.pop() {
        total += 1;
        stack.extend(c.children.iter());
    }
    total
}

/// Visits every node in pre-order.
pub fn walk_mut(forest: &mut [Comment], mut f: impl FnMut(&mut Comment)) {
    let mut stack: Vec<slice::IterMut<'_, Comment>> = vec![forest.iter_mut()];
    while let Some(level) = stack.last_mut() {
        match level.next() {
            None => {
                stack.pop();
            }
            Some(c) => {
                f(c);
                stack.push(c.children.iter_mut());
            }
        }
    }
}
