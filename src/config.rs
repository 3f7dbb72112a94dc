/// 探索の安全上限。
///
/// 論文の停止定理の範囲内の入力では上限に達することはない。
/// 達した場合は上限が低すぎるか実装の欠陥なので、必ずエラーとして報告する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// 前者鎖（01-tower）の最大長。族内の前進歩数にも使う
    pub max_chain_len: usize,
    /// 木構築時、列挙した族から根へ向かう族遷移の最大回数
    pub max_family_hops: usize,
    /// ω(n) 計算で 1 に到達するまでの最大ステップ数
    pub max_orbit_steps: usize,
    /// 復号で掛ける 2^v の最大指数（結果のビット長をこの程度に抑える）
    pub max_two_adic: u64,
}

/// 既定の上限
pub const DEFAULT_MAX_STEPS: usize = 100_000;

/// 既定の 2進指数上限。2^30 ビット = 128 MiB
pub const DEFAULT_MAX_TWO_ADIC: u64 = 1 << 30;

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_chain_len: DEFAULT_MAX_STEPS,
            max_family_hops: DEFAULT_MAX_STEPS,
            max_orbit_steps: DEFAULT_MAX_STEPS,
            max_two_adic: DEFAULT_MAX_TWO_ADIC,
        }
    }
}

impl Limits {
    pub fn with_max_chain_len(mut self, n: usize) -> Self {
        self.max_chain_len = n;
        self
    }

    pub fn with_max_family_hops(mut self, n: usize) -> Self {
        self.max_family_hops = n;
        self
    }

    pub fn with_max_orbit_steps(mut self, n: usize) -> Self {
        self.max_orbit_steps = n;
        self
    }

    pub fn with_max_two_adic(mut self, v: u64) -> Self {
        self.max_two_adic = v;
        self
    }
}
