use std::fmt;

use num_bigint::BigUint;
use num_integer::Integer;

use crate::arith::{ensure_odd_positive, residue};
use crate::error::{Error, Result};

/// 加速ステップ規則のタグ。奇数 n に対して n mod 8 だけで一意に決まる。
///
/// | n mod 8 | タグ | 規則 |
/// |---|---|---|
/// | 1 | A′ | (3n+1)/4 |
/// | 3, 7 | C′ | (3n+1)/2 |
/// | 5 | K′ | (n-1)/4 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepTag {
    A,
    C,
    K,
}

impl StepTag {
    /// 正の奇数 n に適用される規則のタグ
    pub fn of(n: &BigUint) -> Result<StepTag> {
        ensure_odd_positive(n)?;
        Ok(Self::from_residue8(residue::<8>(n)))
    }

    /// 奇数の mod 8 剰余から。偶数剰余は呼び出し側で排除済み。
    #[inline]
    fn from_residue8(r: u32) -> StepTag {
        match r {
            1 => StepTag::A,
            5 => StepTag::K,
            _ => StepTag::C,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            StepTag::A => 'A',
            StepTag::C => 'C',
            StepTag::K => 'K',
        }
    }

    pub fn from_symbol(c: char) -> Option<StepTag> {
        match c {
            'A' => Some(StepTag::A),
            'C' => Some(StepTag::C),
            'K' => Some(StepTag::K),
            _ => None,
        }
    }

    /// 論文表記 (A′, C′, K′)
    pub fn label(self) -> &'static str {
        match self {
            StepTag::A => "A′",
            StepTag::C => "C′",
            StepTag::K => "K′",
        }
    }

    fn domain(self) -> &'static str {
        match self {
            StepTag::A => "A′ requires n ≡ 1 (mod 8)",
            StepTag::C => "C′ requires n ≡ 3 (mod 4)",
            StepTag::K => "K′ requires n ≡ 5 (mod 8)",
        }
    }
}

impl fmt::Display for StepTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 1ステップの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub tag: StepTag,
    pub next: BigUint,
}

/// 乗算・加算・2の冪除去をまとめた1回の演算。
/// 定義域はタグごとに固定なので、除去する2の冪も固定（A′:2, C′:1, K′:2）。
#[inline]
fn raw(tag: StepTag, n: &BigUint) -> BigUint {
    match tag {
        StepTag::A => (n * 3u32 + 1u32) >> 2u32,
        StepTag::C => (n * 3u32 + 1u32) >> 1u32,
        StepTag::K => (n - 1u32) >> 2u32,
    }
}

fn checked_odd(n: &BigUint, next: BigUint) -> Result<BigUint> {
    if next.is_even() {
        return Err(Error::invariant(n, format!("accelerated step produced even value {}", next)));
    }
    Ok(next)
}

/// タグ指定でステップを適用する。タグが n の剰余類と合わなければ InvalidDomain。
pub fn apply(tag: StepTag, n: &BigUint) -> Result<BigUint> {
    let actual = StepTag::of(n)?;
    if actual != tag {
        return Err(Error::invalid_domain(n.clone(), tag.domain()));
    }
    checked_odd(n, raw(tag, n))
}

/// A′(n) = (3n+1)/4
pub fn a_prime(n: &BigUint) -> Result<BigUint> {
    apply(StepTag::A, n)
}

/// C′(n) = (3n+1)/2
pub fn c_prime(n: &BigUint) -> Result<BigUint> {
    apply(StepTag::C, n)
}

/// K′(n) = (n-1)/4
pub fn k_prime(n: &BigUint) -> Result<BigUint> {
    apply(StepTag::K, n)
}

/// 剰余類で選ばれる規則を適用し (タグ, 次の奇数) を返す。
pub fn step(n: &BigUint) -> Result<Step> {
    let tag = StepTag::of(n)?;
    let next = checked_odd(n, raw(tag, n))?;
    Ok(Step { tag, next })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_tag_by_residue() {
        assert_eq!(StepTag::of(&big(1)).unwrap(), StepTag::A);
        assert_eq!(StepTag::of(&big(3)).unwrap(), StepTag::C);
        assert_eq!(StepTag::of(&big(5)).unwrap(), StepTag::K);
        assert_eq!(StepTag::of(&big(7)).unwrap(), StepTag::C);
        assert_eq!(StepTag::of(&big(9)).unwrap(), StepTag::A);
        assert!(StepTag::of(&big(10)).is_err());
    }

    #[test]
    fn test_step_values() {
        let check = |n: u64, tag: StepTag, next: u64| {
            let s = step(&big(n)).unwrap();
            assert_eq!(s.tag, tag, "tag for n={}", n);
            assert_eq!(s.next, big(next), "next for n={}", n);
        };
        check(1, StepTag::A, 1);
        check(3, StepTag::C, 5);
        check(5, StepTag::K, 1);
        check(7, StepTag::C, 11);
        check(9, StepTag::A, 7);
        check(13, StepTag::K, 3);
        check(27, StepTag::C, 41);
    }

    #[test]
    fn test_apply_rejects_wrong_class() {
        // 5 ≡ 5 (mod 8): A′ は整数になるが偶数なので定義域外
        assert!(matches!(a_prime(&big(5)), Err(Error::InvalidDomain { .. })));
        assert!(matches!(k_prime(&big(9)), Err(Error::InvalidDomain { .. })));
        assert!(matches!(c_prime(&big(1)), Err(Error::InvalidDomain { .. })));
        assert_eq!(c_prime(&big(11)).unwrap(), big(17));
    }

    #[test]
    fn test_symbol_roundtrip() {
        for tag in [StepTag::A, StepTag::C, StepTag::K] {
            assert_eq!(StepTag::from_symbol(tag.symbol()), Some(tag));
        }
        assert_eq!(StepTag::from_symbol('B'), None);
    }
}
