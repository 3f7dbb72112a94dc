//! 終端族木。
//!
//! 節点は終端族（種子で識別）、辺は族遷移の逆向き。族の前進後者が木での親になる。
//! 種子 → 親種子の索引表現なので循環参照は持たない。上限を変えたら作り直す。

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigUint;
use tracing::{debug, info};

use crate::canonical::{classify_with, PredecessorChain, TerminalSeed};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::successor::{family_successor_with, FamilyTransition};

/// 族木の節点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyNode {
    pub seed: TerminalSeed,
    /// 親（前進後者の族）。根は None
    pub parent: Option<TerminalSeed>,
    pub transition: Option<FamilyTransition>,
    /// 子（昇順）
    pub children: Vec<TerminalSeed>,
    /// 根からの距離
    pub depth: usize,
    /// 上限以下の奇数から直接分類された族か（false なら根への経路上で見つかった族）
    pub enumerated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalFamilyTree {
    bound: u64,
    /// 構築時の上限。family_of もこれで分類する
    limits: Limits,
    nodes: BTreeMap<TerminalSeed, FamilyNode>,
}

pub fn build_tree(bound: u64) -> Result<TerminalFamilyTree> {
    build_tree_with(bound, &Limits::default())
}

/// bound 以下の全奇数を分類して族を集め、族遷移を根まで辿って木を組む。
pub fn build_tree_with(bound: u64, limits: &Limits) -> Result<TerminalFamilyTree> {
    if bound == 0 {
        return Err(Error::invalid_domain(0, "tree bound must be positive"));
    }
    info!(bound, "building terminal family tree");

    let mut enumerated: BTreeSet<TerminalSeed> = BTreeSet::new();
    for n in (1..=bound).step_by(2) {
        enumerated.insert(classify_with(&BigUint::from(n), limits)?.seed);
    }

    // 族遷移を根に届くまで展開する: (種子, 起点の列挙族, 遷移回数)
    let mut edges: BTreeMap<TerminalSeed, Option<FamilyTransition>> = BTreeMap::new();
    let mut pending: Vec<(TerminalSeed, TerminalSeed, usize)> =
        enumerated.iter().map(|s| (s.clone(), s.clone(), 0)).collect();
    while let Some((seed, origin, hops)) = pending.pop() {
        if edges.contains_key(&seed) {
            continue;
        }
        if hops > limits.max_family_hops {
            return Err(Error::ChainBoundExceeded {
                start: origin.into_inner(),
                bound: limits.max_family_hops,
                reached: seed.into_inner(),
                chain: PredecessorChain::new(),
            });
        }
        let transition = family_successor_with(&seed, limits)?;
        if let Some(t) = &transition {
            if !edges.contains_key(&t.to) {
                pending.push((t.to.clone(), origin, hops + 1));
            }
        }
        edges.insert(seed, transition);
    }

    let depths = compute_depths(&edges)?;

    let mut nodes: BTreeMap<TerminalSeed, FamilyNode> = BTreeMap::new();
    for (seed, transition) in edges {
        let depth = depths.get(&seed).copied().unwrap_or_default();
        let node = FamilyNode {
            parent: transition.as_ref().map(|t| t.to.clone()),
            enumerated: enumerated.contains(&seed),
            seed: seed.clone(),
            transition,
            children: Vec::new(),
            depth,
        };
        nodes.insert(seed, node);
    }

    let links: Vec<(TerminalSeed, TerminalSeed)> = nodes
        .values()
        .filter_map(|n| n.parent.clone().map(|p| (n.seed.clone(), p)))
        .collect();
    for (child, parent) in links {
        match nodes.get_mut(&parent) {
            Some(p) => p.children.push(child),
            None => return Err(Error::invariant(child.value(), format!("parent family {} is missing", parent))),
        }
    }

    let tree = TerminalFamilyTree { bound, limits: *limits, nodes };
    info!(
        bound,
        families = tree.len(),
        enumerated = tree.enumerated_count(),
        max_depth = tree.max_depth(),
        "terminal family tree built"
    );
    Ok(tree)
}

/// 親をたどって各族の深さを求める。閉路や根以外の親なし族は InvariantViolation。
fn compute_depths(edges: &BTreeMap<TerminalSeed, Option<FamilyTransition>>) -> Result<BTreeMap<TerminalSeed, usize>> {
    let root = TerminalSeed::root();
    if !edges.contains_key(&root) {
        return Err(Error::invariant(root.value(), "root family is missing"));
    }

    let mut depths: BTreeMap<TerminalSeed, usize> = BTreeMap::new();
    depths.insert(root, 0);

    for seed in edges.keys() {
        let mut path: Vec<TerminalSeed> = Vec::new();
        let mut cur = seed.clone();
        while !depths.contains_key(&cur) {
            if path.len() > edges.len() {
                return Err(Error::invariant(seed.value(), "cycle in terminal family tree"));
            }
            let parent = match edges.get(&cur) {
                Some(Some(t)) => t.to.clone(),
                _ => return Err(Error::invariant(cur.value(), "non-root family without a parent")),
            };
            path.push(cur);
            cur = parent;
        }
        let mut d = depths.get(&cur).copied().unwrap_or_default();
        for s in path.into_iter().rev() {
            d += 1;
            depths.insert(s, d);
        }
    }
    debug!(families = depths.len(), "depths computed");
    Ok(depths)
}

impl TerminalFamilyTree {
    pub fn bound(&self) -> u64 {
        self.bound
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 根は必ずあるので常に false
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, seed: &BigUint) -> bool {
        self.nodes.contains_key(seed)
    }

    pub fn node(&self, seed: &BigUint) -> Option<&FamilyNode> {
        self.nodes.get(seed)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FamilyNode> {
        self.nodes.values()
    }

    pub fn seeds(&self) -> impl Iterator<Item = &TerminalSeed> {
        self.nodes.keys()
    }

    pub fn parent_of(&self, seed: &BigUint) -> Option<&TerminalSeed> {
        self.node(seed)?.parent.as_ref()
    }

    pub fn children_of(&self, seed: &BigUint) -> Option<&[TerminalSeed]> {
        self.node(seed).map(|n| n.children.as_slice())
    }

    pub fn depth(&self, seed: &BigUint) -> Option<usize> {
        self.node(seed).map(|n| n.depth)
    }

    /// 族から根までの種子列（両端を含む）
    pub fn path_to_root(&self, seed: &BigUint) -> Option<Vec<TerminalSeed>> {
        let mut node = self.node(seed)?;
        let mut path = vec![node.seed.clone()];
        while let Some(parent) = &node.parent {
            node = self.node(parent.value())?;
            path.push(node.seed.clone());
        }
        Some(path)
    }

    /// 族から根までの族遷移列
    pub fn terminal_chain(&self, seed: &BigUint) -> Option<Vec<&FamilyTransition>> {
        let mut node = self.node(seed)?;
        let mut chain = Vec::with_capacity(node.depth);
        while let Some(t) = &node.transition {
            chain.push(t);
            node = self.node(t.to.value())?;
        }
        Some(chain)
    }

    /// n（奇数）の属する族。族が木に無ければ None。
    pub fn family_of(&self, n: &BigUint) -> Result<Option<&FamilyNode>> {
        let seed = classify_with(n, &self.limits)?.seed;
        Ok(self.nodes.get(&seed))
    }

    pub fn enumerated_count(&self) -> usize {
        self.nodes.values().filter(|n| n.enumerated).count()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.values().map(|n| n.depth).max().unwrap_or(0)
    }
}
