//! Reducers and the nested-reducer combinator
//!
//! A reducer is a pure function `(state, action) -> state`. Large state trees
//! are split into `Arc`-held subtrees, each with its own sub-reducer. The
//! [`Mutation`] combinator runs those sub-reducers and tracks whether anything
//! changed, so the root reducer can hand back the *previous* root when an
//! action touched nothing:
//!
//! ```text
//! root ─┬─ counter   (changed → new Arc)
//!       └─ user      (unchanged → same Arc as before)
//! ```

use std::sync::Arc;

/// Root reducer - computes the next state from the current state and an action
///
/// Returning the same `Arc` signals "no change". Returning an error aborts the
/// transition; the store keeps its previous state.
pub trait Reducer<S, A>: Send + Sync {
    fn reduce(&self, state: &Arc<S>, action: &A) -> anyhow::Result<Arc<S>>;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(&Arc<S>, &A) -> anyhow::Result<Arc<S>> + Send + Sync,
{
    fn reduce(&self, state: &Arc<S>, action: &A) -> anyhow::Result<Arc<S>> {
        self(state, action)
    }
}

/// Adapt a reducer that cannot fail
pub fn infallible<S, A, F>(reducer: F) -> impl Reducer<S, A>
where
    F: Fn(&Arc<S>, &A) -> Arc<S> + Send + Sync,
{
    move |state: &Arc<S>, action: &A| -> anyhow::Result<Arc<S>> { Ok(reducer(state, action)) }
}

/// Change tracker threaded through one top-to-bottom reduction pass
///
/// Every `mutate*` call runs a nested reducer against one subtree. If the
/// result differs from the previous subtree, the new value is returned and
/// the pass is marked changed. Otherwise the *previous* value is returned,
/// even when the reducer produced a distinct-but-equal object.
#[derive(Debug, Default)]
pub struct Mutation {
    changed: bool,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run an infallible nested reducer, comparing subtrees by reference
    pub fn mutate<T, A, R>(&mut self, previous: &Arc<T>, action: &A, reducer: R) -> Arc<T>
    where
        R: FnOnce(&Arc<T>, &A) -> Arc<T>,
    {
        let candidate = reducer(previous, action);
        self.keep_or_replace(previous, candidate, |a, b| Arc::ptr_eq(a, b))
    }

    /// Run a fallible nested reducer, comparing subtrees by reference
    pub fn try_mutate<T, A, R>(
        &mut self,
        previous: &Arc<T>,
        action: &A,
        reducer: R,
    ) -> anyhow::Result<Arc<T>>
    where
        R: FnOnce(&Arc<T>, &A) -> anyhow::Result<Arc<T>>,
    {
        self.mutate_with(previous, action, reducer, |a, b| Arc::ptr_eq(a, b))
    }

    /// Run a fallible nested reducer with a custom equality policy
    pub fn mutate_with<T, A, R, E>(
        &mut self,
        previous: &Arc<T>,
        action: &A,
        reducer: R,
        equal: E,
    ) -> anyhow::Result<Arc<T>>
    where
        R: FnOnce(&Arc<T>, &A) -> anyhow::Result<Arc<T>>,
        E: FnOnce(&Arc<T>, &Arc<T>) -> bool,
    {
        let candidate = reducer(previous, action)?;
        Ok(self.keep_or_replace(previous, candidate, equal))
    }

    /// Run a nested reducer over a plain value type, comparing by value
    pub fn mutate_value<T, A, R>(&mut self, previous: &T, action: &A, reducer: R) -> T
    where
        T: PartialEq + Clone,
        R: FnOnce(&T, &A) -> T,
    {
        let candidate = reducer(previous, action);
        if candidate == *previous {
            previous.clone()
        } else {
            self.changed = true;
            candidate
        }
    }

    /// Whether any subtree changed during this pass
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Finish the pass: allocate a new root only if something changed
    pub fn finish<S>(self, previous: &Arc<S>, build: impl FnOnce() -> S) -> Arc<S> {
        if self.changed {
            Arc::new(build())
        } else {
            Arc::clone(previous)
        }
    }

    fn keep_or_replace<T>(
        &mut self,
        previous: &Arc<T>,
        candidate: Arc<T>,
        equal: impl FnOnce(&Arc<T>, &Arc<T>) -> bool,
    ) -> Arc<T> {
        if equal(&candidate, previous) {
            Arc::clone(previous)
        } else {
            self.changed = true;
            candidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tree {
        left: Arc<Leaf>,
        right: Arc<Leaf>,
        depth: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Leaf {
        value: i64,
    }

    enum Op {
        AddLeft(i64),
        Rebuild,
        Deepen,
        Nothing,
    }

    fn reduce_leaf(leaf: &Arc<Leaf>, op: &Op) -> Arc<Leaf> {
        match op {
            Op::AddLeft(n) if *n != 0 => Arc::new(Leaf {
                value: leaf.value + n,
            }),
            // Distinct allocation with identical content
            Op::Rebuild => Arc::new((**leaf).clone()),
            _ => Arc::clone(leaf),
        }
    }

    fn reduce_tree(tree: &Arc<Tree>, op: &Op) -> Arc<Tree> {
        let mut mutation = Mutation::new();
        let left = mutation.mutate(&tree.left, op, reduce_leaf);
        let right = mutation.mutate(&tree.right, op, |leaf, op| match op {
            Op::AddLeft(_) => Arc::clone(leaf),
            _ => reduce_leaf(leaf, op),
        });
        let depth = mutation.mutate_value(&tree.depth, op, |depth, op| match op {
            Op::Deepen => depth + 1,
            _ => *depth,
        });
        mutation.finish(tree, || Tree { left, right, depth })
    }

    fn tree() -> Arc<Tree> {
        Arc::new(Tree {
            left: Arc::new(Leaf { value: 1 }),
            right: Arc::new(Leaf { value: 2 }),
            depth: 0,
        })
    }

    #[test]
    fn test_unchanged_pass_returns_previous_root() {
        let root = tree();
        let next = reduce_tree(&root, &Op::Nothing);
        assert!(Arc::ptr_eq(&root, &next));
    }

    #[test]
    fn test_changed_subtree_keeps_sibling_identity() {
        let root = tree();
        let next = reduce_tree(&root, &Op::AddLeft(5));

        assert!(!Arc::ptr_eq(&root, &next));
        assert_eq!(next.left.value, 6);
        assert!(Arc::ptr_eq(&root.right, &next.right));
    }

    #[test]
    fn test_distinct_but_equal_candidate_is_changed_under_reference_equality() {
        let root = tree();
        let next = reduce_tree(&root, &Op::Rebuild);
        assert!(!Arc::ptr_eq(&root, &next));
        assert_eq!(*root, *next);
    }

    #[test]
    fn test_value_equality_discards_equal_candidate() {
        let previous = Arc::new(Leaf { value: 7 });
        let mut mutation = Mutation::new();
        let result = mutation
            .mutate_with(
                &previous,
                &(),
                |leaf, _| Ok(Arc::new((**leaf).clone())),
                |a, b| a == b,
            )
            .unwrap();

        assert!(Arc::ptr_eq(&previous, &result));
        assert!(!mutation.changed());
    }

    #[test]
    fn test_value_field_change_marks_pass() {
        let root = tree();
        let next = reduce_tree(&root, &Op::Deepen);
        assert_eq!(next.depth, 1);
        assert!(Arc::ptr_eq(&root.left, &next.left));
        assert!(Arc::ptr_eq(&root.right, &next.right));
    }

    #[test]
    fn test_try_mutate_propagates_error_without_marking_change() {
        let previous = Arc::new(Leaf { value: 1 });
        let mut mutation = Mutation::new();
        let result = mutation.try_mutate(&previous, &(), |_, _| anyhow::bail!("invalid leaf"));

        assert!(result.is_err());
        assert!(!mutation.changed());
    }

    #[test]
    fn test_infallible_adapter() {
        let reducer = infallible(|state: &Arc<i64>, delta: &i64| Arc::new(**state + delta));
        let next = reducer.reduce(&Arc::new(40), &2).unwrap();
        assert_eq!(*next, 42);
    }
}
