//! Matches a tuple of produced types against a module's inputs in any order.
use crate::type_system::{TypeContext, TypeExpr};
use smallvec::SmallVec;

type Order = SmallVec<[usize; 8]>;

/// Finds an assignment of `candidates` to `slots` such that every slot can
/// accept the candidate placed on it.
///
/// The returned vector maps slot index to candidate index: `order[i]` is the
/// candidate that feeds slot `i`. Orderings are tried in lexicographic order
/// starting from the identity, so the identity wins whenever it fits. A
/// length mismatch is never compatible; two empty tuples are (with the empty
/// order).
///
/// Worst case this checks all `n!` orderings with up to `n` assignability
/// tests each. Callers should keep `n` small; module arities in practice are.
pub fn find_assignment(cx: &dyn TypeContext, slots: &[&TypeExpr], candidates: &[TypeExpr]) -> Option<Vec<usize>> {
    if slots.len() != candidates.len() {
        return None;
    }
    let mut order: Order = (0..candidates.len()).collect();
    loop {
        let fits = order
            .iter()
            .zip(slots)
            .all(|(&candidate, slot)| cx.is_assignable(slot, &candidates[candidate]));
        if fits {
            return Some(order.into_vec());
        }
        if !next_permutation(&mut order) {
            return None;
        }
    }
}

/// Advances `order` to its lexicographic successor. Returns false (leaving
/// `order` sorted ascending again) once the last permutation has been passed.
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(pivot) = order.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        order.reverse();
        return false;
    };
    let Some(successor) = order.iter().rposition(|&value| value > order[pivot]) else {
        return false;
    };
    order.swap(pivot, successor);
    order[pivot + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_system::{FreeVariableContext, GenericDeclarationContext};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ty(name: &str) -> TypeExpr {
        TypeExpr::concrete(name)
    }

    #[test]
    fn test_next_permutation_enumerates_all() {
        let mut order = vec![0, 1, 2];
        let mut seen = vec![order.clone()];
        while next_permutation(&mut order) {
            seen.push(order.clone());
        }
        assert_eq!(
            seen,
            vec![vec![0, 1, 2], vec![0, 2, 1], vec![1, 0, 2], vec![1, 2, 0], vec![2, 0, 1], vec![2, 1, 0]]
        );
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[rstest]
    #[case(&["String", "Number"], &["String", "Number"], Some(vec![0, 1]))]
    #[case(&["String", "Number"], &["Number", "String"], Some(vec![1, 0]))]
    #[case(&["String", "Number"], &["String", "String"], None)]
    #[case(&["String"], &["String", "Number"], None)]
    #[case(&[], &[], Some(vec![]))]
    #[case(&["A", "B", "C"], &["C", "A", "B"], Some(vec![1, 2, 0]))]
    fn test_find_assignment(#[case] slots: &[&str], #[case] candidates: &[&str], #[case] expected: Option<Vec<usize>>) {
        let cx = FreeVariableContext::new();
        let slots: Vec<TypeExpr> = slots.iter().map(|name| ty(name)).collect();
        let slot_refs: Vec<&TypeExpr> = slots.iter().collect();
        let candidates: Vec<TypeExpr> = candidates.iter().map(|name| ty(name)).collect();
        assert_eq!(find_assignment(&cx, &slot_refs, &candidates), expected);
    }

    #[test]
    fn test_free_variables_accept_anything_in_identity_order() {
        let cx = FreeVariableContext::new();
        let t: TypeExpr = GenericDeclarationContext::new().variable("T").into();
        let slots = [&t, &t];
        let candidates = [ty("String"), ty("Number")];
        assert_eq!(find_assignment(&cx, &slots, &candidates), Some(vec![0, 1]));
    }

    #[test]
    fn test_result_is_a_valid_assignment() {
        let cx = FreeVariableContext::new();
        let slots: Vec<TypeExpr> = ["A", "B", "C", "D"].into_iter().map(ty).collect();
        let slot_refs: Vec<&TypeExpr> = slots.iter().collect();
        let candidates: Vec<TypeExpr> = ["D", "B", "A", "C"].into_iter().map(ty).collect();
        let order = find_assignment(&cx, &slot_refs, &candidates).unwrap();
        for (slot, &candidate) in slots.iter().zip(&order) {
            assert!(cx.is_assignable(slot, &candidates[candidate]));
        }
    }
}
