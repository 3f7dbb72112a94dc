//! 後者写像（整数レベルと族レベル）。
//!
//! 族は種子から後者写像で前進する1本の鎖になる。前者規則は単射なので、
//! 後者 y の選ばれた前者が現在値 x と一致する間は同じ族に留まる。

use num_bigint::BigUint;
use num_traits::One;
use tracing::debug;

use crate::arith::odd_part;
use crate::canonical::{classify_with, is_canonical_seed, walk_back, PredecessorChain, TerminalSeed};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::step::{step, Step, StepTag};

/// 加速後者（タグで選ばれる A′/C′/K′ の1ステップ）
pub fn successor(n: &BigUint) -> Result<BigUint> {
    Ok(step(n)?.next)
}

/// Syracuse 写像: n の奇数部 m について (3m+1) の奇数部と、除いた 2 の冪 d を返す。
/// 正の整数なら偶数も受け付ける。
pub fn accelerated_successor(n: &BigUint) -> Result<(BigUint, u64)> {
    let (m, _) = odd_part(n)?;
    odd_part(&(m * 3u32 + 1u32))
}

/// 族レベルの遷移（族木の1辺）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyTransition {
    pub from: TerminalSeed,
    /// 族の最後の元
    pub exit: BigUint,
    /// exit に適用された規則
    pub exit_tag: StepTag,
    /// exit の後者。遷移先の族に属する
    pub entry: BigUint,
    pub to: TerminalSeed,
    /// 族の元の数
    pub family_len: usize,
}

fn stays_in_family(x: &BigUint, y: &BigUint) -> Result<bool> {
    if y.is_one() || is_canonical_seed(y) {
        return Ok(false);
    }
    Ok(walk_back(y)?.1 == *x)
}

struct FamilyWalk {
    members: Vec<BigUint>,
    exit_step: Step,
}

fn family_walk(seed: &TerminalSeed, limits: &Limits) -> Result<FamilyWalk> {
    let mut members = vec![seed.value().clone()];
    let mut tags = PredecessorChain::new();
    let mut cur = seed.value().clone();
    loop {
        let s = step(&cur)?;
        if !stays_in_family(&cur, &s.next)? {
            return Ok(FamilyWalk { members, exit_step: s });
        }
        if tags.len() >= limits.max_chain_len {
            return Err(Error::ChainBoundExceeded {
                start: seed.value().clone(),
                bound: limits.max_chain_len,
                reached: s.next,
                chain: tags,
            });
        }
        tags.push(s.tag);
        members.push(s.next.clone());
        cur = s.next;
    }
}

/// 族の元を種子から前進順に列挙する
pub fn family_members(seed: &TerminalSeed) -> Result<Vec<BigUint>> {
    family_members_with(seed, &Limits::default())
}

pub fn family_members_with(seed: &TerminalSeed, limits: &Limits) -> Result<Vec<BigUint>> {
    Ok(family_walk(seed, limits)?.members)
}

pub fn family_successor(seed: &TerminalSeed) -> Result<Option<FamilyTransition>> {
    family_successor_with(seed, &Limits::default())
}

/// 族を前進で抜けたとき、どの族に入るかを返す。根（種子 1）は None。
/// 種子の値だけで決まる純関数。
pub fn family_successor_with(seed: &TerminalSeed, limits: &Limits) -> Result<Option<FamilyTransition>> {
    if seed.is_root() {
        return Ok(None);
    }

    let FamilyWalk { members, exit_step } = family_walk(seed, limits)?;
    let family_len = members.len();
    let exit = members[family_len - 1].clone();
    let to = classify_with(&exit_step.next, limits)?.seed;
    if to == *seed {
        return Err(Error::invariant(
            seed.value(),
            format!("family re-enters itself at {}", exit_step.next),
        ));
    }

    debug!(from = %seed, to = %to, exit = %exit, entry = %exit_step.next, family_len, "family transition");
    Ok(Some(FamilyTransition {
        from: seed.clone(),
        exit,
        exit_tag: exit_step.tag,
        entry: exit_step.next,
        to,
        family_len,
    }))
}
