use anyhow::Context;
use clap::{Parser, Subcommand};
use collatz_symbolic::arith::to_positive;
use collatz_symbolic::canonical::canonical_chain;
use collatz_symbolic::config::{DEFAULT_MAX_STEPS, DEFAULT_MAX_TWO_ADIC};
use collatz_symbolic::successor::{family_members_with, family_successor_with};
use collatz_symbolic::*;
use num_bigint::{BigInt, BigUint};
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "collatz-symbolic", version = env!("CARGO_PKG_VERSION"), about = "加速コラッツ写像の記号的符号化")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 前者鎖の最大長
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_STEPS)]
    max_chain: usize,

    /// 木構築時の族遷移の最大回数
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_STEPS)]
    max_hops: usize,

    /// ω(n) の最大ステップ数
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_STEPS)]
    max_orbit: usize,

    /// 復号で許す 2進指数 v の上限
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_TWO_ADIC)]
    max_two_adic: u64,
}

#[derive(Subcommand)]
enum Command {
    /// 1ステップ計算 (A′/C′/K′)
    Step { n: String },
    /// 軌道コードに符号化
    Encode { n: String },
    /// 軌道コード "(v, TAGS, seed)" を復号
    Decode { code: String },
    /// 奇数を終端種子に分類
    Classify {
        n: Option<String>,
        /// [A, B] の全奇数を分類
        #[arg(long, num_args = 2, value_names = ["A", "B"])]
        range: Option<Vec<String>>,
    },
    /// 終端種子の族と族遷移
    Family { seed: String },
    /// bound 以下の奇数から終端族木を構築
    Tree {
        bound: u64,
        /// 指定した族の根までの経路を表示
        #[arg(long)]
        family: Option<String>,
        /// 木全体を字下げ表示
        #[arg(long)]
        print: bool,
    },
    /// 軌道語 ω(n) と経路骨格
    Route {
        n: String,
        /// Graphviz DOT を output/ に保存
        #[arg(long)]
        dot: bool,
    },
    /// 範囲検証 (往復と前者鎖の整合)
    Verify {
        start: String,
        end: String,
        /// シングルスレッドで実行
        #[arg(long)]
        sequential: bool,
        /// 出現数上位の種子を何件表示するか
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collatz_symbolic=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn output_dir() -> anyhow::Result<PathBuf> {
    let dir = PathBuf::from("output");
    std::fs::create_dir_all(&dir).with_context(|| format!("{} を作成できません", dir.display()))?;
    Ok(dir)
}

fn short_n(n: &BigUint) -> String {
    let s = n.to_string();
    if s.len() <= 16 {
        s
    } else {
        format!("{}..{}d", &s[..6], s.len())
    }
}

fn parse_n(s: &str) -> anyhow::Result<BigUint> {
    let v: BigInt = s.trim().parse().with_context(|| format!("数値を解析できません: {}", s))?;
    Ok(to_positive(&v)?)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let limits = Limits::default()
        .with_max_chain_len(cli.max_chain)
        .with_max_family_hops(cli.max_hops)
        .with_max_orbit_steps(cli.max_orbit)
        .with_max_two_adic(cli.max_two_adic);

    match cli.command {
        Command::Step { n } => cmd_step(&parse_n(&n)?),
        Command::Encode { n } => cmd_encode(&parse_n(&n)?, &limits),
        Command::Decode { code } => cmd_decode(&code, &limits),
        Command::Classify { n, range } => cmd_classify(n, range, &limits),
        Command::Family { seed } => cmd_family(&parse_n(&seed)?, &limits),
        Command::Tree { bound, family, print } => cmd_tree(bound, family, print, &limits),
        Command::Route { n, dot } => cmd_route(&parse_n(&n)?, dot, &limits),
        Command::Verify { start, end, sequential, top } => {
            cmd_verify(&parse_n(&start)?, &parse_n(&end)?, sequential, top, &limits)
        }
    }
}

fn cmd_step(n: &BigUint) -> anyhow::Result<()> {
    let s = step(n)?;
    let (syr, d) = accelerated_successor(n)?;
    println!("n = {}", n);
    println!("規則 = {} (n mod 8 = {})", s.tag.label(), n % 8u32);
    println!("n' = {}", s.next);
    println!("Syracuse T(n) = {} (d={})", syr, d);
    Ok(())
}

fn cmd_encode(n: &BigUint, limits: &Limits) -> anyhow::Result<()> {
    let timer = Instant::now();
    let code = encode_with(n, limits)?;
    let elapsed = timer.elapsed();
    println!("n = {}", short_n(n));
    println!("コード = ({}, {}, {})", code.two_adic(), code.chain(), short_n(code.seed().value()));
    println!("01-tower = {}", code.chain().tower());
    println!("深さ = {}", code.depth());
    println!("計算時間 = {:?}", elapsed);
    Ok(())
}

fn cmd_decode(text: &str, limits: &Limits) -> anyhow::Result<()> {
    let code: OrbitCode = text.parse()?;
    let n = decode_with(&code, limits)?;
    println!("{}", n);
    Ok(())
}

fn cmd_classify(n: Option<String>, range: Option<Vec<String>>, limits: &Limits) -> anyhow::Result<()> {
    if let Some(bounds) = range {
        let (a, b) = match bounds.as_slice() {
            [a, b] => (parse_n(a)?, parse_n(b)?),
            _ => anyhow::bail!("--range には A B の2つが必要です"),
        };
        let mut k = if &a % 2u32 == BigUint::from(0u32) { a + 1u32 } else { a };
        println!("{:>12}  {:>12}  {:>5}  鎖", "n", "種子", "深さ");
        while k <= b {
            let c = classify_with(&k, limits)?;
            println!("{:>12}  {:>12}  {:>5}  {}", k, c.seed, c.depth(), c.chain);
            k += 2u32;
        }
        return Ok(());
    }

    let n = parse_n(n.as_deref().context("n または --range A B を指定してください")?)?;
    let c = classify_with(&n, limits)?;
    println!("n = {}", n);
    println!("種子 = {}", c.seed);
    println!("鎖 = {} ({})", c.chain, c.chain.tower());
    let values = canonical_chain(&n, limits)?;
    let shown: Vec<String> = values.iter().map(short_n).collect();
    println!("経路 = {}", shown.join(" → "));
    Ok(())
}

fn cmd_family(seed: &BigUint, limits: &Limits) -> anyhow::Result<()> {
    let seed = TerminalSeed::new(seed.clone())?;
    let members = family_members_with(&seed, limits)?;
    let shown: Vec<String> = members.iter().map(short_n).collect();
    println!("族 {} の元 ({}個) = {}", seed, members.len(), shown.join(", "));
    match family_successor_with(&seed, limits)? {
        Some(t) => println!(
            "族遷移: 出口 {} --{}--> 入口 {} ∈ 族 {}",
            t.exit,
            t.exit_tag.label(),
            t.entry,
            t.to
        ),
        None => println!("根の族 (遷移なし)"),
    }
    Ok(())
}

fn print_subtree(tree: &TerminalFamilyTree, seed: &TerminalSeed, depth: usize) {
    let Some(node) = tree.node(seed.value()) else { return };
    let mark = if node.enumerated { "" } else { " *" };
    println!("{}{}{}", "  ".repeat(depth), seed, mark);
    for child in &node.children {
        print_subtree(tree, child, depth + 1);
    }
}

fn cmd_tree(bound: u64, family: Option<String>, print: bool, limits: &Limits) -> anyhow::Result<()> {
    let timer = Instant::now();
    let tree = build_tree_with(bound, limits)?;
    let elapsed = timer.elapsed();

    println!("終端族木 (bound = {})", tree.bound());
    println!("族の数        = {}", tree.len());
    println!("列挙された族  = {}", tree.enumerated_count());
    println!("最大深さ      = {}", tree.max_depth());
    println!("計算時間      = {:?}", elapsed);

    if print {
        println!();
        println!("(* は根への経路上でのみ見つかった族)");
        print_subtree(&tree, &TerminalSeed::root(), 0);
    }

    if let Some(f) = family {
        let n = parse_n(&f)?;
        let node = tree.family_of(&n)?.with_context(|| format!("{} の族は木にありません", n))?;
        let path = tree.path_to_root(node.seed.value()).unwrap_or_default();
        let shown: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        println!();
        println!("{} の族 = {} (深さ {})", n, node.seed, node.depth);
        println!("根への経路 = {}", shown.join(" → "));
    }
    Ok(())
}

fn cmd_route(n: &BigUint, dot: bool, limits: &Limits) -> anyhow::Result<()> {
    let r = route(n, limits)?;
    let join = |v: &[BigUint]| v.iter().map(short_n).collect::<Vec<_>>().join(" → ");
    let blocks: Vec<String> = r.word.blocks().iter().map(|b| OrbitWord::from(b.to_vec()).to_string()).collect();

    println!("ω({}) = {}", short_n(n), r.word);
    println!("ブロック = {}", blocks.join(" | "));
    println!("構造鎖 = {}", join(&r.structural));
    println!("加速鎖 = {}", join(&r.accelerated));
    println!("骨格   = {}", join(&r.skeleton));

    if dot {
        let path = output_dir()?.join(format!("route_{}.dot", short_n(n)));
        let mut f = File::create(&path).with_context(|| format!("{} を作成できません", path.display()))?;
        f.write_all(r.to_dot().as_bytes())?;
        println!("\n保存: {}", path.display());
    }
    Ok(())
}

fn cmd_verify(start: &BigUint, end: &BigUint, sequential: bool, top: usize, limits: &Limits) -> anyhow::Result<()> {
    let num_threads = if sequential { 1 } else { rayon::current_num_threads() };
    println!("範囲検証: [{}, {}] ({}スレッド)", start, end, num_threads);

    let timer = Instant::now();
    let last_print = std::sync::Mutex::new(Instant::now());
    let progress = |done: u64, total: u64| {
        if total == 0 {
            return;
        }
        if let Ok(mut lp) = last_print.try_lock() {
            let now = Instant::now();
            if now.duration_since(*lp).as_millis() >= 500 {
                let pct = done as f64 / total as f64 * 100.0;
                eprint!("\x1b[2K\r  [{:.1}s] {}/{} ({:.1}%)", timer.elapsed().as_secs_f64(), done, total, pct);
                *lp = now;
            }
        }
    };
    let result = if sequential {
        verify_range(start, end, limits, progress)
    } else {
        verify_range_parallel(start, end, limits, progress)
    };
    let elapsed = timer.elapsed();
    eprintln!();

    println!();
    println!("--- 結果 ---");
    println!("検証した数   = {}", result.total_checked);
    println!("全て往復     = {}", if result.all_ok { "はい" } else { "いいえ" });
    println!("最大深さ     = {} (n={})", result.max_depth, result.max_depth_number);
    println!("種子の種類   = {}", result.seed_counts.len());
    if top > 0 && !result.seed_counts.is_empty() {
        println!("出現数上位の種子:");
        for (seed, count) in result.top_seeds(top) {
            let pct = count as f64 / result.total_checked as f64 * 100.0;
            println!("  {:>12}: {} 回 ({:.2}%)", short_n(seed.value()), count, pct);
        }
    }
    for f in result.failures.iter().take(20) {
        println!("  失敗 n={}: {}", f.n, f.error);
    }
    if result.failures.len() > 20 {
        println!("  ... ({} 件省略)", result.failures.len() - 20);
    }
    println!("計算時間     = {:?}", elapsed);

    if !result.all_ok {
        anyhow::bail!("{} 件の検証に失敗しました", result.failures.len());
    }
    Ok(())
}
