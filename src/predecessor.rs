use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;

use crate::arith::{ensure_odd_positive, residue};
use crate::error::{Error, Result};
use crate::step::StepTag;
use crate::successor::accelerated_successor;

/// 前者規則の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predecessor {
    /// 分岐 tag の順方向規則を value に適用すると n に戻る
    Branch { tag: StepTag, value: BigUint },
    /// n ≡ 3 (mod 6): これ以上 mod 6 規則で遡れない
    Terminal,
}

/// 最小前者 p = (((n - 3) mod 6)·n - 1) / 3。
///
/// 係数 c = (n - 3) mod 6 が分岐を選ぶ:
/// - c = 4 (n ≡ 1 mod 6): A 分岐、p = (4n-1)/3、A′(p) = n
/// - c = 2 (n ≡ 5 mod 6): C 分岐、p = (2n-1)/3、C′(p) = n
/// - c = 0 (n ≡ 3 mod 6): 終端
///
/// 奇数 n ≥ 3 で定義される。
pub fn predecessor(n: &BigUint) -> Result<Predecessor> {
    ensure_odd_positive(n)?;
    if *n < BigUint::from(3u32) {
        return Err(Error::invalid_domain(n.clone(), "predecessor is defined for odd n >= 3"));
    }

    let c = (residue::<6>(n) + 3) % 6;
    if c == 0 {
        return Ok(Predecessor::Terminal);
    }

    let (p, r) = (n * c - 1u32).div_rem(&BigUint::from(3u32));
    if !r.is_zero() {
        return Err(Error::invariant(n, "c·n - 1 is not divisible by 3"));
    }
    let tag = if c == 4 { StepTag::A } else { StepTag::C };
    Ok(Predecessor::Branch { tag, value: p })
}

/// 01-lift: K 分岐の前者 4n+1。K′(4n+1) = n。
pub fn lift(n: &BigUint) -> BigUint {
    n * 4u32 + 1u32
}

/// accelerated_successor(p) == n となる奇数 p を search_limit まで総当たりで列挙する。
/// 小さな範囲での照合用。
pub fn odd_predecessors(n: &BigUint, search_limit: u64) -> Result<Vec<BigUint>> {
    ensure_odd_positive(n)?;
    let mut preds = Vec::new();
    for p in (1..=search_limit).step_by(2) {
        let p = BigUint::from(p);
        if accelerated_successor(&p)?.0 == *n {
            preds.push(p);
        }
    }
    Ok(preds)
}

/// 総当たりでの最小の奇数前者。見つからなければ None。
pub fn min_odd_predecessor(n: &BigUint, search_limit: u64) -> Result<Option<BigUint>> {
    Ok(odd_predecessors(n, search_limit)?.into_iter().next())
}
