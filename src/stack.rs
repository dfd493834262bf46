//! Named navigation stacks
//!
//! Each stack is a doubly linked list threaded through a shared node arena, so pushing and
//! popping at the tail and removing from the middle are all O(1). A handler carries a
//! [`StackBinding`] naming its stack and arena node; the binding is present exactly while the
//! handler is a member of one stack.
//!
//! This module only maintains membership and order. Show/hide/focus side effects of navigation
//! are applied by the manager from the values these operations return.

use std::collections::HashMap;

use slab::Slab;

use crate::panel::{HandlerId, HandlerPool, StackBinding};

#[derive(Debug)]
struct StackNode {
    handler: HandlerId,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Default)]
struct NamedStack {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

/// Result of taking a panel out of its stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRemoval {
    pub stack: String,
    /// Whether the panel was the top of its stack
    pub was_top: bool,
    /// Top of the stack after the removal
    pub new_top: Option<HandlerId>,
}

#[derive(Debug, Default)]
pub struct StackSet {
    stacks: HashMap<String, NamedStack>,
    nodes: Slab<StackNode>,
}

impl StackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to `name`, first taking it out of whatever stack holds it
    ///
    /// Returns the top of `name` before the append.
    pub(crate) fn push(
        &mut self,
        id: HandlerId,
        name: &str,
        pool: &mut HandlerPool,
    ) -> Option<HandlerId> {
        if let Some(removal) = self.remove(id, pool) {
            tracing::debug!("Moving {} from stack {} to {}", id, removal.stack, name);
        }
        let Some(handler) = pool.get_mut(id) else {
            return None;
        };
        let previous_top = self.peek(name);

        let stack = self.stacks.entry(name.to_string()).or_default();
        let node = self.nodes.insert(StackNode {
            handler: id,
            prev: stack.tail,
            next: None,
        });
        match stack.tail {
            Some(tail) => self.nodes[tail].next = Some(node),
            None => stack.head = Some(node),
        }
        stack.tail = Some(node);
        stack.len += 1;

        handler.stack = Some(StackBinding {
            stack: name.to_string(),
            node,
        });
        previous_top
    }

    /// Take the top off `name`, returning it and the new top
    pub(crate) fn pop(
        &mut self,
        name: &str,
        pool: &mut HandlerPool,
    ) -> Option<(HandlerId, Option<HandlerId>)> {
        let top = self.peek(name)?;
        let removal = self.remove(top, pool)?;
        Some((top, removal.new_top))
    }

    /// Take `id` out of its stack wherever it sits
    pub(crate) fn remove(&mut self, id: HandlerId, pool: &mut HandlerPool) -> Option<StackRemoval> {
        let binding = pool.get_mut(id)?.stack.take()?;
        let was_top = self
            .stacks
            .get(&binding.stack)
            .and_then(|stack| stack.tail)
            == Some(binding.node);
        self.unlink(&binding.stack, binding.node);
        let new_top = self.peek(&binding.stack);
        Some(StackRemoval {
            stack: binding.stack,
            was_top,
            new_top,
        })
    }

    fn unlink(&mut self, name: &str, node: usize) {
        let Some(StackNode { prev, next, .. }) = self.nodes.try_remove(node) else {
            tracing::warn!("Stack {} lost track of node {}", name, node);
            return;
        };
        let Some(stack) = self.stacks.get_mut(name) else {
            return;
        };
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => stack.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => stack.tail = prev,
        }
        stack.len -= 1;
        if stack.len == 0 {
            self.stacks.remove(name);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn peek(&self, name: &str) -> Option<HandlerId> {
        let tail = self.stacks.get(name)?.tail?;
        self.nodes.get(tail).map(|node| node.handler)
    }

    pub fn depth(&self, name: &str) -> usize {
        self.stacks.get(name).map(|stack| stack.len).unwrap_or(0)
    }

    /// Members of `name`, bottom first
    pub fn members(&self, name: &str) -> Vec<HandlerId> {
        let mut members = Vec::new();
        let mut cursor = self.stacks.get(name).and_then(|stack| stack.head);
        while let Some(index) = cursor {
            let Some(node) = self.nodes.get(index) else {
                break;
            };
            members.push(node.handler);
            cursor = node.next;
        }
        members
    }

    /// Names of non-empty stacks, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stacks.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn clear(&mut self, pool: &mut HandlerPool) {
        for (_, node) in self.nodes.iter() {
            if let Some(handler) = pool.get_mut(node.handler) {
                handler.stack = None;
            }
        }
        self.nodes.clear();
        self.stacks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelKey;

    fn handlers(pool: &mut HandlerPool, count: usize) -> Vec<HandlerId> {
        (0..count)
            .map(|i| pool.allocate(PanelKey::new(format!("p{}", i))))
            .collect()
    }

    #[test]
    fn test_push_pop_lifo() {
        let mut pool = HandlerPool::new();
        let mut stacks = StackSet::new();
        let ids = handlers(&mut pool, 3);

        assert_eq!(stacks.push(ids[0], "main", &mut pool), None);
        assert_eq!(stacks.push(ids[1], "main", &mut pool), Some(ids[0]));
        assert_eq!(stacks.push(ids[2], "main", &mut pool), Some(ids[1]));
        assert_eq!(stacks.depth("main"), 3);

        assert_eq!(stacks.pop("main", &mut pool), Some((ids[2], Some(ids[1]))));
        assert_eq!(stacks.pop("main", &mut pool), Some((ids[1], Some(ids[0]))));
        assert_eq!(stacks.pop("main", &mut pool), Some((ids[0], None)));
        assert_eq!(stacks.pop("main", &mut pool), None);
        assert!(pool.iter().all(|h| h.stack_name().is_none()));
    }

    #[test]
    fn test_remove_from_middle_keeps_links() {
        let mut pool = HandlerPool::new();
        let mut stacks = StackSet::new();
        let ids = handlers(&mut pool, 3);
        for id in &ids {
            stacks.push(*id, "main", &mut pool);
        }

        let removal = stacks.remove(ids[1], &mut pool).unwrap();
        assert!(!removal.was_top);
        assert_eq!(removal.new_top, Some(ids[2]));
        assert_eq!(stacks.members("main"), vec![ids[0], ids[2]]);

        stacks.push(ids[1], "main", &mut pool);
        assert_eq!(stacks.members("main"), vec![ids[0], ids[2], ids[1]]);
    }

    #[test]
    fn test_push_moves_between_stacks() {
        let mut pool = HandlerPool::new();
        let mut stacks = StackSet::new();
        let ids = handlers(&mut pool, 1);

        stacks.push(ids[0], "a", &mut pool);
        stacks.push(ids[0], "b", &mut pool);

        assert_eq!(stacks.depth("a"), 0);
        assert_eq!(stacks.members("b"), vec![ids[0]]);
        assert_eq!(pool.get(ids[0]).unwrap().stack_name(), Some("b"));
        assert_eq!(stacks.names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_repush_same_stack_moves_to_top() {
        let mut pool = HandlerPool::new();
        let mut stacks = StackSet::new();
        let ids = handlers(&mut pool, 2);
        stacks.push(ids[0], "main", &mut pool);
        stacks.push(ids[1], "main", &mut pool);

        let previous = stacks.push(ids[0], "main", &mut pool);
        assert_eq!(previous, Some(ids[1]));
        assert_eq!(stacks.members("main"), vec![ids[1], ids[0]]);
    }
}
