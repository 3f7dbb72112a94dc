//! 軌道語 ω(n) と経路骨格。
//!
//! ω(n) は n から後者写像を 1 まで反復して得たタグ列を逆順にしたもの。
//! 1 から構造前者 A: (4m-1)/3, C: (2m-1)/3, K: 4m+1 を順に適用すると n に戻る。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::arith::ensure_odd_positive;
use crate::canonical::PredecessorChain;
use crate::config::Limits;
use crate::error::{Error, Result};
use crate::step::{step, StepTag};

/// 軌道語。1 側から n 側への順。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OrbitWord(Vec<StepTag>);

impl OrbitWord {
    pub fn tags(&self) -> &[StepTag] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// K の極大連と A/C の極大連への分割
    pub fn blocks(&self) -> Vec<&[StepTag]> {
        self.0
            .chunk_by(|a, b| (*a == StepTag::K) == (*b == StepTag::K))
            .collect()
    }
}

impl From<Vec<StepTag>> for OrbitWord {
    fn from(tags: Vec<StepTag>) -> Self {
        OrbitWord(tags)
    }
}

impl fmt::Display for OrbitWord {
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

impl FromStr for OrbitWord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let chain: PredecessorChain = s.parse()?;
        Ok(OrbitWord(chain.tags().to_vec()))
    }
}

pub fn orbit_word(n: &BigUint) -> Result<OrbitWord> {
    orbit_word_with(n, &Limits::default())
}

/// ω(n): 後者写像で 1 に達するまでのタグを逆順にしたもの。
pub fn orbit_word_with(n: &BigUint, limits: &Limits) -> Result<OrbitWord> {
    ensure_odd_positive(n)?;
    let mut tags = Vec::new();
    let mut cur = n.clone();
    while !cur.is_one() {
        if tags.len() >= limits.max_orbit_steps {
            return Err(Error::ChainBoundExceeded {
                start: n.clone(),
                bound: limits.max_orbit_steps,
                reached: cur,
                chain: PredecessorChain::from(tags),
            });
        }
        let s = step(&cur)?;
        tags.push(s.tag);
        cur = s.next;
    }
    tags.reverse();
    Ok(OrbitWord(tags))
}

/// 構造前者。割り切れなければ語が矛盾している。
fn structural_predecessor(word: &OrbitWord, tag: StepTag, m: &BigUint) -> Result<BigUint> {
    let num = match tag {
        StepTag::A => m * 4u32 - 1u32,
        StepTag::C => m * 2u32 - 1u32,
        StepTag::K => return Ok(m * 4u32 + 1u32),
    };
    let (p, r) = num.div_rem(&BigUint::from(3u32));
    if !r.is_zero() {
        return Err(Error::decode(word, format!("{} has no {} predecessor", m, tag.label())));
    }
    Ok(p)
}

/// 構造前者鎖 [1, ..., n]
pub fn structural_chain(word: &OrbitWord) -> Result<Vec<BigUint>> {
    let mut m = BigUint::one();
    let mut chain = vec![m.clone()];
    for &tag in word.tags() {
        m = structural_predecessor(word, tag, &m)?;
        chain.push(m.clone());
    }
    Ok(chain)
}

/// 加速前者鎖: 直後に K が続く A/C の値を省き、K の連を1段にまとめる。
pub fn accelerated_chain(word: &OrbitWord) -> Result<Vec<BigUint>> {
    let tags = word.tags();
    let mut m = BigUint::one();
    let mut chain = vec![m.clone()];
    let mut i = 0;
    while i < tags.len() {
        let tag = tags[i];
        if tag == StepTag::K {
            while i < tags.len() && tags[i] == StepTag::K {
                m = structural_predecessor(word, StepTag::K, &m)?;
                i += 1;
            }
            chain.push(m.clone());
            continue;
        }
        m = structural_predecessor(word, tag, &m)?;
        if tags.get(i + 1) != Some(&StepTag::K) {
            chain.push(m.clone());
        }
        i += 1;
    }
    Ok(chain)
}

/// 経路骨格: 極大ブロックの端点（位相境界）
pub fn route_skeleton(word: &OrbitWord) -> Result<Vec<BigUint>> {
    let structural = structural_chain(word)?;
    let mut endpoints = vec![structural[0].clone()];
    let mut idx = 0;
    for block in word.blocks() {
        idx += block.len();
        endpoints.push(structural[idx].clone());
    }
    Ok(endpoints)
}

/// n の経路図に必要なものをまとめたもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub n: BigUint,
    pub word: OrbitWord,
    pub structural: Vec<BigUint>,
    pub accelerated: Vec<BigUint>,
    pub skeleton: Vec<BigUint>,
}

pub fn route(n: &BigUint, limits: &Limits) -> Result<Route> {
    let word = orbit_word_with(n, limits)?;
    Ok(Route {
        n: n.clone(),
        structural: structural_chain(&word)?,
        accelerated: accelerated_chain(&word)?,
        skeleton: route_skeleton(&word)?,
        word,
    })
}

const ROUTE_FILL: &str = "#7FA6E6";

impl Route {
    /// 構造鎖と加速鎖を重ねた Graphviz DOT。
    /// 骨格節点は塗りつぶし、加速鎖で省かれた節点は破線、
    /// 複数段を跨ぐ加速辺には破線の 01-lift 橋を添える。
    pub fn to_dot(&self) -> String {
        let nid = |x: &BigUint| format!("n_{}", x);
        let accel: BTreeSet<&BigUint> = self.accelerated.iter().collect();
        let skeleton: BTreeSet<&BigUint> = self.skeleton.iter().collect();
        let pos: BTreeMap<&BigUint, usize> = self.structural.iter().enumerate().map(|(i, v)| (v, i)).collect();

        let mut dot = String::new();
        // String への書き込みは失敗しない
        let _ = writeln!(dot, "digraph Collatz{} {{", self.n);
        dot.push_str("  rankdir=BT;\n  splines=true;\n  nodesep=0.15;\n  ranksep=0.65;\n\n");
        dot.push_str("  node [shape=box, fontname=\"Helvetica\", fontsize=12, margin=\"0.12,0.08\"];\n");
        dot.push_str("  edge [fontname=\"Helvetica\", fontsize=11, arrowsize=0.7];\n\n");

        dot.push_str("  // Nodes\n");
        for x in &self.structural {
            let suppressed = !accel.contains(x);
            let label = if suppressed { format!("{}\\n(suppressed)", x) } else { x.to_string() };
            let mut styles = Vec::new();
            if suppressed {
                styles.push("dashed");
            }
            if skeleton.contains(x) {
                styles.push("filled");
            }
            match (styles.is_empty(), skeleton.contains(x)) {
                (true, _) => {
                    let _ = writeln!(dot, "  {} [label=\"{}\"];", nid(x), label);
                }
                (false, true) => {
                    let _ = writeln!(
                        dot,
                        "  {} [label=\"{}\", style=\"{}\", fillcolor=\"{}\"];",
                        nid(x),
                        label,
                        styles.join(","),
                        ROUTE_FILL
                    );
                }
                (false, false) => {
                    let _ = writeln!(dot, "  {} [label=\"{}\", style=\"{}\"];", nid(x), label, styles.join(","));
                }
            }
        }

        let mut solid = vec!["  edge [penwidth=2.2, style=\"solid\"];".to_string()];
        let mut dashed = Vec::new();
        for pair in self.accelerated.windows(2) {
            let (u, v) = (&pair[0], &pair[1]);
            let (iu, iv) = (pos.get(u).copied().unwrap_or(0), pos.get(v).copied().unwrap_or(0));
            let path = &self.structural[iu.min(iv)..=iu.max(iv)];
            if path.len() == 2 {
                solid.push(format!("  {} -> {};", nid(u), nid(v)));
                continue;
            }
            solid.push(format!("  {} -> {} [label=\"accelerated\"];", nid(u), nid(v)));
            dashed.push("  edge [penwidth=0.55, style=\"dashed\"];".to_string());
            for (k, w) in path.windows(2).enumerate() {
                if k + 2 == path.len() {
                    dashed.push(format!(
                        "  {} -> {} [label=\" 01-lift\", style=\"dashed\", weight=5];",
                        nid(&w[0]),
                        nid(&w[1])
                    ));
                } else {
                    dashed.push(format!("  {} -> {};", nid(&w[0]), nid(&w[1])));
                }
            }
        }

        dot.push_str("\n  // Accelerated backbone + dashed 01-lift bridges\n");
        for line in solid.iter().chain(dashed.iter()) {
            dot.push_str(line);
            dot.push('\n');
        }
        dot.push_str("\n  edge [penwidth=1.0, style=\"solid\"];\n}\n");
        dot
    }
}
