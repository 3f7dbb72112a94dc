//! 算術プリミティブ: 2進付値と剰余。
//!
//! すべて任意精度の純関数。固定幅整数は大きな入力で黙って壊れるので使わない。

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::Zero;

use crate::error::{Error, Result};

/// 2進付値 ν2(n)。n = 0 では定義されない。
pub fn nu2(n: &BigUint) -> Result<u64> {
    n.trailing_zeros()
        .ok_or_else(|| Error::invalid_domain(0, "2-adic valuation is undefined for 0"))
}

/// n = k·2^v (k 奇数) に分解して (k, v) を返す。
pub fn odd_part(n: &BigUint) -> Result<(BigUint, u64)> {
    let v = nu2(n)?;
    Ok((n >> v, v))
}

/// 最下位 32bit
#[inline]
fn low_u32(n: &BigUint) -> u32 {
    n.iter_u32_digits().next().unwrap_or(0)
}

fn residue_unchecked(n: &BigUint, m: u32) -> u32 {
    if m.is_power_of_two() {
        return low_u32(n) & (m - 1);
    }
    low_u32(&(n % m))
}

/// n mod m。m = 0 は InvalidDomain。
pub fn residue_mod(n: &BigUint, m: u32) -> Result<u32> {
    if m == 0 {
        return Err(Error::invalid_domain(0, "modulus must be positive"));
    }
    Ok(residue_unchecked(n, m))
}

/// 法が定数の剰余。M = 0 はコンパイル時に弾く。
#[inline]
pub(crate) fn residue<const M: u32>(n: &BigUint) -> u32 {
    const { assert!(M > 0, "modulus must be positive") };
    residue_unchecked(n, M)
}

#[inline]
pub fn is_odd(n: &BigUint) -> bool {
    n.is_odd()
}

pub fn ensure_positive(n: &BigUint) -> Result<()> {
    if n.is_zero() {
        return Err(Error::invalid_domain(0, "expected a positive integer"));
    }
    Ok(())
}

/// 力学の対象（正の奇数）であることを確認する
pub fn ensure_odd_positive(n: &BigUint) -> Result<()> {
    ensure_positive(n)?;
    if n.is_even() {
        return Err(Error::invalid_domain(n.clone(), "expected an odd integer"));
    }
    Ok(())
}

/// 符号付き整数を正の整数に変換する。0 以下は InvalidDomain。
pub fn to_positive(n: &BigInt) -> Result<BigUint> {
    n.to_biguint()
        .filter(|u| !u.is_zero())
        .ok_or_else(|| Error::invalid_domain(n.clone(), "expected a positive integer"))
}
