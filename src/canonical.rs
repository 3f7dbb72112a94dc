//! 終端種子への分類（最小前者鎖を終端種子まで辿る）。
//!
//! 正準終端種子は m ≡ 3, 9, 15 (mod 24) の奇数。加えて不動点 1 を
//! 根の種子として扱う（A′(1) = 1 なので前者規則では 1 から抜けられない）。
//!
//! mod 6 規則の終端 n ≡ 3 (mod 6) のうち n ≡ 21 (mod 24) は正準でないので、
//! 01-lift n → 4n+1（K 分岐）で1段持ち上げて探索を続ける。

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::One;
use tracing::trace;

use crate::arith::{ensure_odd_positive, residue};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::predecessor::{lift, predecessor, Predecessor};
use crate::step::StepTag;

const CANONICAL_RESIDUES_MOD_24: [u32; 3] = [3, 9, 15];

/// m ≡ 3, 9, 15 (mod 24) か
pub fn is_canonical_seed(m: &BigUint) -> bool {
    CANONICAL_RESIDUES_MOD_24.contains(&residue::<24>(m))
}

/// 終端種子。正準種子か根 1 のどちらか。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalSeed(BigUint);

impl TerminalSeed {
    pub fn new(m: BigUint) -> Result<Self> {
        if m.is_one() || is_canonical_seed(&m) {
            Ok(TerminalSeed(m))
        } else {
            Err(Error::invalid_domain(m, "terminal seed must be 1 or ≡ 3, 9, 15 (mod 24)"))
        }
    }

    /// 種子 1（族木の根）
    pub fn root() -> Self {
        TerminalSeed(BigUint::one())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_one()
    }

    pub fn value(&self) -> &BigUint {
        &self.0
    }

    pub fn into_inner(self) -> BigUint {
        self.0
    }
}

impl Borrow<BigUint> for TerminalSeed {
    fn borrow(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for TerminalSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 前者鎖のタグ列（01-tower）。開始値から種子へ向かう順。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PredecessorChain(Vec<StepTag>);

impl PredecessorChain {
    pub fn new() -> Self {
        PredecessorChain(Vec::new())
    }

    pub fn tags(&self) -> &[StepTag] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepTag> {
        self.0.iter()
    }

    pub(crate) fn push(&mut self, tag: StepTag) {
        self.0.push(tag);
    }

    /// 連長圧縮: 同じタグの連続を (タグ, 回数) にまとめる
    pub fn runs(&self) -> Vec<(StepTag, usize)> {
        let mut runs: Vec<(StepTag, usize)> = Vec::new();
        for &tag in &self.0 {
            match runs.last_mut() {
                Some((last, count)) if *last == tag => *count += 1,
                _ => runs.push((tag, 1)),
            }
        }
        runs
    }

    /// 圧縮表記。例: AAC → "A^2 C"
    pub fn tower(&self) -> String {
        if self.is_empty() {
            return "-".to_string();
        }
        self.runs()
            .iter()
            .map(|&(tag, count)| if count == 1 { tag.to_string() } else { format!("{}^{}", tag, count) })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<StepTag>> for PredecessorChain {
    fn from(tags: Vec<StepTag>) -> Self {
        PredecessorChain(tags)
    }
}

impl FromIterator<StepTag> for PredecessorChain {
    fn from_iter<I: IntoIterator<Item = StepTag>>(iter: I) -> Self {
        PredecessorChain(iter.into_iter().collect())
    }
}

impl fmt::Display for PredecessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for tag in &self.0 {
            write!(f, "{}", tag)?;
        }
        Ok(())
    }
}

impl FromStr for PredecessorChain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "-" {
            return Ok(PredecessorChain::new());
        }
        s.chars()
            .map(|c| StepTag::from_symbol(c).ok_or_else(|| Error::decode(s, format!("unknown branch symbol {:?}", c))))
            .collect()
    }
}

/// 分類結果: 終端種子と前者鎖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub seed: TerminalSeed,
    pub chain: PredecessorChain,
}

impl Classification {
    pub fn depth(&self) -> usize {
        self.chain.len()
    }
}

/// 分類器の1段: 非正準の奇数 n ≥ 3 から (分岐タグ, 前者) を返す。
pub(crate) fn walk_back(n: &BigUint) -> Result<(StepTag, BigUint)> {
    match predecessor(n)? {
        Predecessor::Branch { tag, value } => Ok((tag, value)),
        // 非正準の n ≡ 3 (mod 6) は n ≡ 21 (mod 24)
        Predecessor::Terminal => Ok((StepTag::K, lift(n))),
    }
}

/// 種子まで辿る。values は開始値から種子までの値列。
fn walk(n: &BigUint, limits: &Limits, mut values: Option<&mut Vec<BigUint>>) -> Result<Classification> {
    ensure_odd_positive(n)?;
    if let Some(ref mut vs) = values {
        vs.push(n.clone());
    }
    if n.is_one() {
        return Ok(Classification { seed: TerminalSeed::root(), chain: PredecessorChain::new() });
    }

    let mut chain = PredecessorChain::new();
    let mut cur = n.clone();
    while !is_canonical_seed(&cur) {
        if chain.len() >= limits.max_chain_len {
            return Err(Error::ChainBoundExceeded {
                start: n.clone(),
                bound: limits.max_chain_len,
                reached: cur,
                chain,
            });
        }
        let (tag, prev) = walk_back(&cur)?;
        chain.push(tag);
        if let Some(ref mut vs) = values {
            vs.push(prev.clone());
        }
        cur = prev;
    }

    trace!(start = %n, seed = %cur, depth = chain.len(), "classified");
    Ok(Classification { seed: TerminalSeed(cur), chain })
}

/// 既定の上限で分類する
pub fn classify(n: &BigUint) -> Result<Classification> {
    classify_with(n, &Limits::default())
}

/// 奇数 n の最小前者鎖を終端種子まで辿り、(種子, 鎖) を返す。
/// 鎖長が limits.max_chain_len を超えたら ChainBoundExceeded。
pub fn classify_with(n: &BigUint, limits: &Limits) -> Result<Classification> {
    walk(n, limits, None)
}

/// 開始値から種子までの値列（両端を含む）
pub fn canonical_chain(n: &BigUint, limits: &Limits) -> Result<Vec<BigUint>> {
    let mut values = Vec::new();
    walk(n, limits, Some(&mut values))?;
    Ok(values)
}

pub fn canonical_seed(n: &BigUint) -> Result<TerminalSeed> {
    Ok(classify(n)?.seed)
}

/// (種子, 深さ)。深さは前者ステップ数。
pub fn canonical_signature(n: &BigUint) -> Result<(TerminalSeed, usize)> {
    let c = classify(n)?;
    let depth = c.depth();
    Ok((c.seed, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn check(n: u64, seed: u64, chain: &str) {
        let c = classify(&big(n)).unwrap();
        assert_eq!(c.seed.value(), &big(seed), "seed for n={}", n);
        assert_eq!(c.chain.to_string(), chain, "chain for n={}", n);
    }

    #[test]
    fn test_classify_examples() {
        check(1, 1, "-");
        check(3, 3, "-");
        check(5, 3, "C");
        check(7, 9, "A");
        check(11, 9, "CA");
        check(21, 75, "KAC");
        check(45, 321, "KAA");
        check(955, 1131, "AAC");
    }

    #[test]
    fn test_classify_rejects_even() {
        assert!(matches!(classify(&big(10)), Err(Error::InvalidDomain { .. })));
    }

    #[test]
    fn test_chain_bound() {
        let limits = Limits::default().with_max_chain_len(2);
        match classify_with(&big(955), &limits) {
            Err(Error::ChainBoundExceeded { start, bound, reached, chain }) => {
                assert_eq!(start, big(955));
                assert_eq!(bound, 2);
                assert_eq!(reached, big(1697));
                assert_eq!(chain.to_string(), "AA");
            }
            other => panic!("expected ChainBoundExceeded, got {:?}", other),
        }
        let limits = Limits::default().with_max_chain_len(3);
        assert!(classify_with(&big(955), &limits).is_ok());
    }

    #[test]
    fn test_canonical_chain_values() {
        let values = canonical_chain(&big(955), &Limits::default()).unwrap();
        assert_eq!(values, vec![big(955), big(1273), big(1697), big(1131)]);
        assert_eq!(canonical_chain(&big(1), &Limits::default()).unwrap(), vec![big(1)]);
    }

    #[test]
    fn test_signature() {
        let (seed, depth) = canonical_signature(&big(21)).unwrap();
        assert_eq!(seed.value(), &big(75));
        assert_eq!(depth, 3);
    }

    #[test]
    fn test_terminal_seed_validation() {
        assert!(TerminalSeed::new(big(1)).is_ok());
        assert!(TerminalSeed::new(big(1131)).is_ok());
        assert!(TerminalSeed::new(big(21)).is_err());
        assert!(TerminalSeed::new(big(5)).is_err());
        assert!(TerminalSeed::root().is_root());
    }

    #[test]
    fn test_chain_text() {
        let chain: PredecessorChain = "KAAC".parse().unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain.tower(), "K A^2 C");
        assert_eq!(chain.runs(), vec![(StepTag::K, 1), (StepTag::A, 2), (StepTag::C, 1)]);
        assert!("-".parse::<PredecessorChain>().unwrap().is_empty());
        assert!(matches!("AXC".parse::<PredecessorChain>(), Err(Error::DecodeError { .. })));
    }
}
