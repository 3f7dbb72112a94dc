//! エラー型。
//!
//! 全演算は純関数なので、どのエラーも再試行しても結果は変わらない。
//! 呼び出し側がそのまま再現できるよう、問題の値と途中までの鎖を保持する。

use num_bigint::{BigInt, BigUint};
use thiserror::Error;

use crate::canonical::PredecessorChain;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 入力が正でない、または奇数専用の演算に偶数が渡された
    #[error("invalid domain: {value} ({reason})")]
    InvalidDomain { value: BigInt, reason: &'static str },

    /// 前者鎖の探索が安全上限を超えた
    #[error("chain bound exceeded: start={start}, bound={bound}, reached={reached}, chain={chain}")]
    ChainBoundExceeded {
        start: BigUint,
        bound: usize,
        reached: BigUint,
        chain: PredecessorChain,
    },

    /// 軌道コードが構造的に矛盾している
    #[error("decode error: {reason} (code {code})")]
    DecodeError { code: String, reason: String },

    /// 内部整合性の破れ。実装の欠陥か論文の証明との食い違いを意味する
    #[error("invariant violation at {value}: {reason}")]
    InvariantViolation { value: BigUint, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_domain(value: impl Into<BigInt>, reason: &'static str) -> Self {
        Self::InvalidDomain {
            value: value.into(),
            reason,
        }
    }

    pub fn decode(code: impl ToString, reason: impl Into<String>) -> Self {
        Self::DecodeError {
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invariant(value: &BigUint, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            value: value.clone(),
            reason: reason.into(),
        }
    }

    /// 安全上限超過か（上限の設定ミスか実装欠陥のどちらか）
    pub fn is_bound_exceeded(&self) -> bool {
        matches!(self, Self::ChainBoundExceeded { .. })
    }
}
