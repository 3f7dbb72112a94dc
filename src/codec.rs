//! 軌道コードの符号化と復号。
//!
//! n = k·2^v について、v と、奇数部 k の (前者鎖, 終端種子) を記録する。
//! 復号は種子から鎖を逆順に辿り、各タグの順方向規則を適用してから 2^v を掛ける。

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;

use crate::arith::{odd_part, residue};
use crate::canonical::{classify_with, Classification, PredecessorChain, TerminalSeed};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::step::{apply, StepTag};

/// 軌道コード。テキスト表現は `(v, TAGS, seed)`、空の鎖は `-`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrbitCode {
    two_adic: u64,
    chain: PredecessorChain,
    seed: TerminalSeed,
}

impl OrbitCode {
    /// 整合性は decode 時に検査する
    pub fn new(two_adic: u64, chain: PredecessorChain, seed: TerminalSeed) -> Self {
        OrbitCode { two_adic, chain, seed }
    }

    /// 2進指数 v
    pub fn two_adic(&self) -> u64 {
        self.two_adic
    }

    pub fn chain(&self) -> &PredecessorChain {
        &self.chain
    }

    pub fn seed(&self) -> &TerminalSeed {
        &self.seed
    }

    pub fn depth(&self) -> usize {
        self.chain.len()
    }
}

impl fmt::Display for OrbitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.two_adic, self.chain, self.seed)
    }
}

/// 数値欄は ASCII 数字のみ（符号や `_` 区切りは受け付けない）
fn is_decimal(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for OrbitCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| Error::decode(s, "expected \"(v, TAGS, seed)\""))?;

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let &[v, chain, seed] = parts.as_slice() else {
            return Err(Error::decode(s, format!("expected 3 fields, found {}", parts.len())));
        };

        let two_adic = Some(v)
            .filter(|v| is_decimal(v))
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| Error::decode(s, format!("2-adic exponent {:?} is not a non-negative integer", v)))?;
        let chain: PredecessorChain = chain.parse()?;
        let seed = Some(seed)
            .filter(|t| is_decimal(t))
            .and_then(|t| BigUint::from_str(t).ok())
            .ok_or_else(|| Error::decode(s, format!("seed {:?} is not an integer", seed)))?;
        let seed = TerminalSeed::new(seed)
            .map_err(|_| Error::decode(s, "seed must be 1 or ≡ 3, 9, 15 (mod 24)"))?;

        Ok(OrbitCode { two_adic, chain, seed })
    }
}

pub fn encode(n: &BigUint) -> Result<OrbitCode> {
    encode_with(n, &Limits::default())
}

/// 正の整数 n を軌道コードに符号化する。
pub fn encode_with(n: &BigUint, limits: &Limits) -> Result<OrbitCode> {
    let (k, v) = odd_part(n)?;
    let Classification { seed, chain } = classify_with(&k, limits)?;
    Ok(OrbitCode { two_adic: v, chain, seed })
}

/// 符号化した直後に復号して一致を確認する。不一致は InvariantViolation。
pub fn encode_verified(n: &BigUint) -> Result<OrbitCode> {
    let code = encode(n)?;
    let back = decode_with(&code, &Limits::default().with_max_two_adic(code.two_adic))
        .map_err(|e| Error::invariant(n, format!("own code {} does not decode: {}", code, e)))?;
    if back != *n {
        return Err(Error::invariant(n, format!("code {} decodes to {}", code, back)));
    }
    Ok(code)
}

/// 奇数部の復元: 種子から鎖を逆順に展開する。
pub fn expand(code: &OrbitCode) -> Result<BigUint> {
    if code.seed.is_root() && !code.chain.is_empty() {
        return Err(Error::decode(code, "root seed 1 carries no chain"));
    }

    let mut cur = code.seed.value().clone();
    for &tag in code.chain.iter().rev() {
        let selected = StepTag::of(&cur)?;
        if selected != tag {
            return Err(Error::decode(
                code,
                format!("tag {} does not match {}, whose residue class selects {}", tag, cur, selected),
            ));
        }
        let next = apply(tag, &cur)?;
        if tag == StepTag::K && residue::<24>(&next) != 21 {
            return Err(Error::decode(
                code,
                format!("K step lands on {}, which is not ≡ 21 (mod 24)", next),
            ));
        }
        cur = next;
    }
    Ok(cur)
}

/// 軌道コードを整数に復号する。decode(encode(n)) == n。
pub fn decode(code: &OrbitCode) -> Result<BigUint> {
    decode_with(code, &Limits::default())
}

/// 2^v を掛ける前に v を limits.max_two_adic と照合する。
pub fn decode_with(code: &OrbitCode, limits: &Limits) -> Result<BigUint> {
    if code.two_adic > limits.max_two_adic {
        return Err(Error::decode(
            code,
            format!("2-adic exponent too large (limit {})", limits.max_two_adic),
        ));
    }
    Ok(expand(code)? << code.two_adic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn test_encode_examples() {
        assert_eq!(encode(&big(955)).unwrap().to_string(), "(0, AAC, 1131)");
        assert_eq!(encode(&big(3820)).unwrap().to_string(), "(2, AAC, 1131)");
        assert_eq!(encode(&big(1)).unwrap().to_string(), "(0, -, 1)");
        assert_eq!(encode(&big(2)).unwrap().to_string(), "(1, -, 1)");
        assert_eq!(encode(&big(21)).unwrap().to_string(), "(0, KAC, 75)");
    }

    #[test]
    fn test_encode_zero_rejected() {
        assert!(matches!(encode(&big(0)), Err(Error::InvalidDomain { .. })));
    }

    #[test]
    fn test_roundtrip_1_to_2000() {
        for n in 1u64..=2000 {
            let code = encode(&big(n)).unwrap();
            assert_eq!(decode(&code).unwrap(), big(n), "n={} code={}", n, code);
        }
    }

    #[test]
    fn test_text_roundtrip() {
        let code = encode(&big(3820)).unwrap();
        let parsed: OrbitCode = code.to_string().parse().unwrap();
        assert_eq!(parsed, code);
        let parsed: OrbitCode = " ( 0 , - , 3 ) ".parse().unwrap();
        assert_eq!(decode(&parsed).unwrap(), big(3));
    }

    #[test]
    fn test_malformed_text() {
        for bad in ["0, AAC, 1131", "(x, AAC, 1131)", "(0, AAC)", "(0, AAC, 21)", "(0, ABC, 1131)", "(-1, A, 9)"] {
            assert!(
                matches!(bad.parse::<OrbitCode>(), Err(Error::DecodeError { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    fn decode_text(s: &str) -> Result<BigUint> {
        decode(&s.parse::<OrbitCode>().unwrap())
    }

    #[test]
    fn test_inconsistent_codes() {
        // 根は鎖を持たない
        assert!(matches!(decode_text("(0, A, 1)"), Err(Error::DecodeError { .. })));
        // 9 ≡ 1 (mod 8) は A′ を選ぶ
        assert!(matches!(decode_text("(0, C, 9)"), Err(Error::DecodeError { .. })));
        assert!(matches!(decode_text("(0, K, 3)"), Err(Error::DecodeError { .. })));
        // A′(81) = 61, K′(61) = 15 は 21 (mod 24) ではない
        assert!(matches!(decode_text("(0, KA, 81)"), Err(Error::DecodeError { .. })));
        assert_eq!(decode_text("(0, KAC, 75)").unwrap(), big(21));
    }

    #[test]
    fn test_numeric_fields_are_plain_digits() {
        for bad in ["(+0, AAC, 1131)", "(0, AAC, 1_131)", "(0, AAC, +1131)", "(0_0, AAC, 1131)", "(, AAC, 1131)"] {
            assert!(
                matches!(bad.parse::<OrbitCode>(), Err(Error::DecodeError { .. })),
                "{} should be rejected",
                bad
            );
        }
        assert!("(00, AAC, 01131)".parse::<OrbitCode>().is_ok());
    }

    #[test]
    fn test_huge_two_adic_rejected() {
        // 2^(2^64-1) は確保できないので、シフト前にエラーで返す
        let code: OrbitCode = "(18446744073709551615, -, 1)".parse().unwrap();
        assert!(matches!(decode(&code), Err(Error::DecodeError { .. })));

        let code: OrbitCode = "(41, -, 1)".parse().unwrap();
        let limits = Limits::default().with_max_two_adic(40);
        assert!(matches!(decode_with(&code, &limits), Err(Error::DecodeError { .. })));
        let limits = Limits::default().with_max_two_adic(41);
        assert_eq!(decode_with(&code, &limits).unwrap(), BigUint::from(1u64) << 41u32);
    }

    #[test]
    fn test_encode_verified() {
        let code = encode_verified(&big(955)).unwrap();
        assert_eq!(code.depth(), 3);
        assert_eq!(code.seed().value(), &big(1131));
    }
}
