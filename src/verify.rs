use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::arith::odd_part;
use crate::canonical::{canonical_chain, TerminalSeed};
use crate::codec::{decode_with, encode_with};
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::successor::successor;

/// 検証に失敗した数とその理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFailure {
    pub n: BigUint,
    pub error: Error,
}

/// 範囲検証の結果
#[derive(Debug, Clone)]
pub struct VerifyResult {
    /// 検証した整数の総数
    pub total_checked: u64,
    /// 全て往復できたか
    pub all_ok: bool,
    /// 最大の鎖長
    pub max_depth: usize,
    /// 最大の鎖長を持つ数
    pub max_depth_number: BigUint,
    pub failures: Vec<VerifyFailure>,
    /// 種子ごとの出現数
    pub seed_counts: BTreeMap<TerminalSeed, u64>,
}

impl VerifyResult {
    fn empty(start: BigUint) -> Self {
        VerifyResult {
            total_checked: 0,
            all_ok: true,
            max_depth: 0,
            max_depth_number: start,
            failures: Vec::new(),
            seed_counts: BTreeMap::new(),
        }
    }

    fn record(&mut self, n: BigUint, outcome: Result<(TerminalSeed, usize)>) {
        self.total_checked += 1;
        match outcome {
            Ok((seed, depth)) => {
                if depth > self.max_depth {
                    self.max_depth = depth;
                    self.max_depth_number = n;
                }
                *self.seed_counts.entry(seed).or_insert(0) += 1;
            }
            Err(error) => {
                warn!(n = %n, error = %error, "verification failed");
                self.all_ok = false;
                self.failures.push(VerifyFailure { n, error });
            }
        }
    }

    /// 出現数の多い種子を上位 k 件。同数なら種子の小さい順
    pub fn top_seeds(&self, k: usize) -> Vec<(&TerminalSeed, u64)> {
        let mut counts: Vec<(&TerminalSeed, u64)> = self.seed_counts.iter().map(|(s, &c)| (s, c)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts.truncate(k);
        counts
    }

    fn merge(&mut self, other: VerifyResult) {
        self.total_checked += other.total_checked;
        self.all_ok &= other.all_ok;
        if other.max_depth > self.max_depth
            || (other.max_depth == self.max_depth && other.max_depth_number < self.max_depth_number)
        {
            self.max_depth = other.max_depth;
            self.max_depth_number = other.max_depth_number;
        }
        self.failures.extend(other.failures);
        for (seed, count) in other.seed_counts {
            *self.seed_counts.entry(seed).or_insert(0) += count;
        }
    }
}

/// 1つの数を検証する。
/// decode(encode(n)) == n と、奇数部の前者鎖の各段で後者写像が1つ前の値に戻ることを確かめる。
pub fn check_number(n: &BigUint, limits: &Limits) -> Result<(TerminalSeed, usize)> {
    let code = encode_with(n, limits)?;
    let back = decode_with(&code, limits)?;
    if back != *n {
        return Err(Error::invariant(n, format!("code {} decodes to {}", code, back)));
    }

    let (k, _) = odd_part(n)?;
    let values = canonical_chain(&k, limits)?;
    for pair in values.windows(2) {
        let forward = successor(&pair[1])?;
        if forward != pair[0] {
            return Err(Error::invariant(
                n,
                format!("successor of predecessor {} is {}, expected {}", pair[1], forward, pair[0]),
            ));
        }
    }
    Ok((code.seed().clone(), code.depth()))
}

/// [start, end] の全整数を検証する（シングルスレッド版）。0 は飛ばす。
/// progress_callback: (完了数, 総数) を定期的に呼ぶ。
pub fn verify_range(
    start: &BigUint,
    end: &BigUint,
    limits: &Limits,
    progress_callback: impl Fn(u64, u64),
) -> VerifyResult {
    let mut n = if start.is_zero() { BigUint::one() } else { start.clone() };
    let total_estimate: u64 = if *end >= n {
        (end - &n).to_u64().map_or(u64::MAX, |r| r.saturating_add(1))
    } else {
        0
    };
    info!(start = %n, end = %end, "verifying range");

    let mut result = VerifyResult::empty(n.clone());
    while n <= *end {
        let outcome = check_number(&n, limits);
        result.record(n.clone(), outcome);
        if result.total_checked % 1000 == 0 {
            progress_callback(result.total_checked, total_estimate);
        }
        n += 1u32;
    }
    progress_callback(result.total_checked, total_estimate);

    info!(
        checked = result.total_checked,
        failures = result.failures.len(),
        max_depth = result.max_depth,
        "range verified"
    );
    result
}

/// [start, end] の全整数を検証する（並列版）。
/// u64 に収まる範囲は Rayon でチャンク分割、それ以外はシングルスレッド版に任せる。
/// progress_callback はスレッドセーフであること。
pub fn verify_range_parallel(
    start: &BigUint,
    end: &BigUint,
    limits: &Limits,
    progress_callback: impl Fn(u64, u64) + Sync,
) -> VerifyResult {
    match (start.to_u64(), end.to_u64()) {
        (Some(s), Some(e)) => verify_range_parallel_u64(s.max(1), e, limits, &progress_callback),
        _ => verify_range(start, end, limits, progress_callback),
    }
}

fn verify_range_parallel_u64(
    start: u64,
    end: u64,
    limits: &Limits,
    progress_callback: &(impl Fn(u64, u64) + Sync),
) -> VerifyResult {
    if start > end {
        return VerifyResult::empty(BigUint::from(start));
    }
    info!(start, end, threads = rayon::current_num_threads(), "verifying range in parallel");

    // start >= 1 なので u64::MAX を超えない
    let total = end - start + 1;
    let chunk_size: u64 = 10000;
    let num_chunks = total.div_ceil(chunk_size);

    let global_done = AtomicU64::new(0);
    let merged = Mutex::new(VerifyResult::empty(BigUint::from(start)));

    (0..num_chunks).into_par_iter().for_each(|chunk_idx| {
        // chunk_idx * chunk_size <= end - start
        let chunk_start = start + chunk_idx * chunk_size;
        let chunk_end = chunk_start.saturating_add(chunk_size - 1).min(end);

        let mut local = VerifyResult::empty(BigUint::from(chunk_start));
        let mut unreported = 0u64;
        for n in chunk_start..=chunk_end {
            let n = BigUint::from(n);
            let outcome = check_number(&n, limits);
            local.record(n, outcome);
            unreported += 1;

            if unreported >= 100 {
                let done = global_done.fetch_add(unreported, Ordering::Relaxed) + unreported;
                progress_callback(done, total);
                unreported = 0;
            }
        }
        if unreported > 0 {
            let done = global_done.fetch_add(unreported, Ordering::Relaxed) + unreported;
            progress_callback(done, total);
        }

        merged.lock().unwrap_or_else(PoisonError::into_inner).merge(local);
    });

    let mut result = merged.into_inner().unwrap_or_else(PoisonError::into_inner);
    result.failures.sort_by(|a, b| a.n.cmp(&b.n));
    info!(
        checked = result.total_checked,
        failures = result.failures.len(),
        max_depth = result.max_depth,
        "range verified"
    );
    result
}
