use collatz_symbolic::*;
use num_bigint::BigUint;

fn big(n: u64) -> BigUint {
    BigUint::from(n)
}

fn seed(n: u64) -> TerminalSeed {
    TerminalSeed::new(big(n)).unwrap()
}

/// 木の構造的な性質を検証するヘルパー
fn verify_tree_shape(tree: &TerminalFamilyTree) {
    let root = TerminalSeed::root();
    assert!(tree.contains(root.value()));
    assert_eq!(tree.depth(root.value()), Some(0));

    for node in tree.nodes() {
        match &node.parent {
            None => assert!(node.seed.is_root(), "non-root {} without parent", node.seed),
            Some(p) => {
                assert_eq!(tree.depth(p.value()).map(|d| d + 1), Some(node.depth), "depth of {}", node.seed);
                assert!(
                    tree.children_of(p.value()).unwrap().contains(&node.seed),
                    "{} missing from children of {}",
                    node.seed,
                    p
                );
                let t = node.transition.as_ref().unwrap();
                assert_eq!(&t.to, p);
                assert_eq!(t.exit_tag, StepTag::K, "family {} exits by {}", node.seed, t.exit_tag);
            }
        }
        let path = tree.path_to_root(node.seed.value()).unwrap();
        assert_eq!(path.len(), node.depth + 1);
        assert_eq!(path.last(), Some(&root));
        assert_eq!(tree.terminal_chain(node.seed.value()).unwrap().len(), node.depth);
    }
}

// ===== 規模 =====

#[test]
fn test_tree_sizes() {
    let check = |bound: u64, nodes: usize, enumerated: usize, max_depth: usize| {
        let tree = build_tree(bound).unwrap();
        assert_eq!(tree.len(), nodes, "nodes for bound={}", bound);
        assert_eq!(tree.enumerated_count(), enumerated, "enumerated for bound={}", bound);
        assert_eq!(tree.max_depth(), max_depth, "max depth for bound={}", bound);
        verify_tree_shape(&tree);
    };
    check(1, 1, 1, 0);
    check(3, 2, 2, 1);
    check(100, 22, 19, 9);
    check(1000, 190, 179, 14);
}

#[test]
fn test_tree_10000() {
    let tree = build_tree(10000).unwrap();
    assert_eq!(tree.len(), 1876);
    assert_eq!(tree.enumerated_count(), 1783);
    assert_eq!(tree.max_depth(), 19);
    verify_tree_shape(&tree);
}

// ===== 問い合わせ =====

#[test]
fn test_children_and_parents() {
    let tree = build_tree(100).unwrap();
    assert_eq!(tree.children_of(&big(1)).unwrap(), &[seed(3)]);
    assert_eq!(tree.children_of(&big(3)).unwrap(), &[seed(9), seed(75)]);
    assert_eq!(tree.parent_of(&big(75)), Some(&seed(3)));
    assert_eq!(tree.parent_of(&big(1)), None);
    assert!(tree.node(&big(21)).is_none());
    assert!(tree.children_of(&big(5)).is_none());
}

#[test]
fn test_paths_through_9() {
    let tree = build_tree(100).unwrap();
    for s in [15u64, 33, 57] {
        let path: Vec<BigUint> = tree.path_to_root(&big(s)).unwrap().into_iter().map(|x| x.into_inner()).collect();
        assert_eq!(path, vec![big(s), big(9), big(3), big(1)], "path for {}", s);
    }
}

#[test]
fn test_non_enumerated_families_lie_on_paths() {
    let tree = build_tree(100).unwrap();
    for node in tree.nodes().filter(|n| !n.enumerated) {
        assert!(node.seed.value() > &big(100), "{} should have been enumerated", node.seed);
        assert!(!node.children.is_empty(), "{} is a leaf", node.seed);
    }
}

/// 上限以下の奇数はすべて自分の族の元に含まれる
#[test]
fn test_partition() {
    let tree = build_tree(2000).unwrap();
    for n in (1u64..=2000).step_by(2) {
        let node = tree.family_of(&big(n)).unwrap().unwrap();
        assert!(node.enumerated);
        let members = family_members(&node.seed).unwrap();
        assert!(members.contains(&big(n)), "{} not in family {}", n, node.seed);
    }
}

#[test]
fn test_family_of_rejects_even() {
    let tree = build_tree(10).unwrap();
    assert!(matches!(tree.family_of(&big(4)), Err(Error::InvalidDomain { .. })));
}

// ===== 決定性と上限 =====

#[test]
fn test_rebuild_is_identical() {
    let a = build_tree(500).unwrap();
    let b = build_tree(500).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_larger_bound_extends_tree() {
    let small = build_tree(200).unwrap();
    let large = build_tree(1000).unwrap();
    for node in small.nodes() {
        let other = large.node(node.seed.value()).unwrap();
        assert_eq!(other.parent, node.parent);
        assert_eq!(other.depth, node.depth);
    }
}

#[test]
fn test_hop_bound() {
    let err = build_tree_with(27, &Limits::default().with_max_family_hops(3)).unwrap_err();
    match err {
        Error::ChainBoundExceeded { start, bound, reached, .. } => {
            assert_eq!(start, big(27));
            assert_eq!(bound, 3);
            assert_eq!(reached, big(81));
        }
        other => panic!("expected ChainBoundExceeded, got {:?}", other),
    }
    let tree = build_tree_with(27, &Limits::default().with_max_family_hops(8)).unwrap();
    assert_eq!(tree.len(), 11);
}
