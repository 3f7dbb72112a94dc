//! 加速コラッツ写像の記号的符号化
//!
//! 奇数 n に対する3つの加速ステップ規則
//! A′(n) = (3n+1)/4 (n ≡ 1 mod 8), C′(n) = (3n+1)/2 (n ≡ 3, 7 mod 8), K′(n) = (n-1)/4 (n ≡ 5 mod 8)
//! を使い、正の整数 n = k·2^v を軌道コード (v, 前者鎖, 終端種子) に可逆に符号化する。
//!
//! 終端種子は m ≡ 3, 9, 15 (mod 24) の奇数と根 1。
//! 種子ごとの族は族遷移で結ばれ、根 1 を頂点とする終端族木をなす。

pub mod arith;
pub mod canonical;
pub mod codec;
pub mod config;
pub mod error;
pub mod predecessor;
pub mod route;
pub mod step;
pub mod successor;
pub mod tree;
pub mod verify;

pub use canonical::{classify, classify_with, Classification, PredecessorChain, TerminalSeed};
pub use codec::{decode, decode_with, encode, encode_verified, encode_with, OrbitCode};
pub use config::Limits;
pub use error::{Error, Result};
pub use predecessor::{lift, predecessor, Predecessor};
pub use route::{orbit_word, route, OrbitWord, Route};
pub use step::{a_prime, apply, c_prime, k_prime, step, Step, StepTag};
pub use successor::{accelerated_successor, family_members, family_successor, successor, FamilyTransition};
pub use tree::{build_tree, build_tree_with, FamilyNode, TerminalFamilyTree};
pub use verify::{check_number, verify_range, verify_range_parallel, VerifyFailure, VerifyResult};
