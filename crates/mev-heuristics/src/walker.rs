//! Call-graph traversal.
//!
//! Every component that needs to look at the call tree goes through these two
//! entry points: [`walk`] yields frames in pre-order, [`fold_calls`] threads an
//! owned accumulator through the same order. Traversal uses an explicit stack
//! so deeply nested traces cannot overflow the thread stack.

use crate::model::CallFrame;

/// A frame together with its depth below the root (root is depth 0).
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub frame: &'a CallFrame,
    pub depth: usize,
}

/// Pre-order iterator over a call tree.
pub struct CallIter<'a> {
    stack: Vec<Visit<'a>>,
}

impl<'a> Iterator for CallIter<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.stack.pop()?;
        // Reverse so the first child is visited first
        for child in visit.frame.calls.iter().rev() {
            self.stack.push(Visit {
                frame: child,
                depth: visit.depth + 1,
            });
        }
        Some(visit)
    }
}

/// Visit the root and every nested call, parents before children.
pub fn walk(root: &CallFrame) -> CallIter<'_> {
    CallIter {
        stack: vec![Visit {
            frame: root,
            depth: 0,
        }],
    }
}

/// Fold over every call in pre-order, returning the final accumulator.
pub fn fold_calls<A, F>(root: &CallFrame, init: A, mut f: F) -> A
where
    F: FnMut(A, &CallFrame) -> A,
{
    walk(root).fold(init, |acc, visit| f(acc, visit.frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = CallFrame::new(addr(1), addr(2), U256::ZERO)
            .with_call(
                CallFrame::new(addr(2), addr(3), U256::ZERO)
                    .with_call(CallFrame::new(addr(3), addr(4), U256::ZERO)),
            )
            .with_call(CallFrame::new(addr(2), addr(5), U256::ZERO));

        let order: Vec<(Address, usize)> = walk(&tree).map(|v| (v.frame.to, v.depth)).collect();
        assert_eq!(
            order,
            vec![(addr(2), 0), (addr(3), 1), (addr(4), 2), (addr(5), 1)]
        );
    }

    #[test]
    fn test_fold_counts_every_call() {
        let tree = CallFrame::new(addr(1), addr(2), U256::from(7u64))
            .with_call(CallFrame::new(addr(2), addr(3), U256::from(5u64)));

        let total = fold_calls(&tree, U256::ZERO, |acc, call| acc + call.value);
        assert_eq!(total, U256::from(12u64));
    }

    #[test]
    fn test_deep_tree_does_not_recurse() {
        let mut tree = CallFrame::new(addr(1), addr(2), U256::ZERO);
        for _ in 0..2_000 {
            tree = CallFrame::new(addr(1), addr(2), U256::ZERO).with_call(tree);
        }
        let deepest = walk(&tree).map(|v| v.depth).max();
        assert_eq!(walk(&tree).count(), 2_001);
        assert_eq!(deepest, Some(2_000));
    }
}
