//! Generate a demo catalog with mixed-script entity names.
//!
//! Names combine Han, kana and Latin fragments (with the odd full-width or
//! bracketed variant) so every matcher phase has something to find.
//!
//! Usage:
//!     cargo run --release --bin generate-demo-db -- --output demo.sqlite3 --count 20000

use anyhow::{Context, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use yomi::{Category, Database, Entity};

#[derive(Parser)]
#[command(name = "generate-demo-db")]
#[command(about = "Write a synthetic mixed-script catalog")]
struct Args {
    /// Output path; an existing file is replaced
    #[arg(short, long, default_value = "demo_catalog.sqlite3")]
    output: PathBuf,

    /// Rows per category
    #[arg(short, long, default_value_t = 5000)]
    count: usize,
}

const HAN: &[&str] = &[
    "千本桜", "初音", "世界", "恋", "夢", "歌", "星", "月", "花", "雨", "心", "夜", "桜", "愛",
    "電子", "少女", "未来", "東京", "永遠", "青空",
];

const KANA: &[&str] = &[
    "ミク", "ルカ", "リン", "レン", "メルト", "ワールド", "ロミオ", "シンデレラ", "ハート",
    "まふまふ", "ぼかろ", "らら", "さくら", "ねこ", "ふわふわ",
];

const LATIN: &[&str] = &[
    "Miku", "Melt", "World", "Love", "Dream", "Star", "Night", "Tell", "Your", "Heart",
    "Electric", "Angel", "Project", "Sky", "Rain", "Dance", "Cover", "Remix",
];

const DECORATIONS: &[(&str, &str)] = &[("【", "】"), ("「", "」"), ("(", ")"), ("『", "』")];

fn fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' => char::from_u32(c as u32 + 0xfee0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

fn generate_name(rng: &mut impl Rng) -> String {
    let parts = rng.gen_range(1..=3);
    let mut words: Vec<String> = Vec::with_capacity(parts);
    for _ in 0..parts {
        let pool = match rng.gen_range(0..3) {
            0 => HAN,
            1 => KANA,
            _ => LATIN,
        };
        if let Some(word) = pool.choose(rng) {
            words.push(word.to_string());
        }
    }

    let mut name = words.join(if rng.gen_bool(0.5) { " " } else { "" });
    if rng.gen_bool(0.1) {
        name = fullwidth(&name);
    }
    if rng.gen_bool(0.1) {
        if let Some((open, close)) = DECORATIONS.choose(rng) {
            name = format!("{open}{name}{close}");
        }
    }
    name
}

fn generate_bvid(rng: &mut impl Rng) -> String {
    const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    let tail: String = (0..10)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("BV{tail}")
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.output.exists() {
        std::fs::remove_file(&args.output)
            .with_context(|| format!("removing {}", args.output.display()))?;
    }
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    println!("Generating demo catalog...");
    println!("Output: {}", args.output.display());

    let db = Database::open(&args.output)?;
    let mut rng = rand::thread_rng();

    for category in Category::ALL {
        let entities: Vec<Entity> = (0..args.count)
            .map(|i| {
                let name = generate_name(&mut rng);
                match category {
                    Category::Video => Entity::new(generate_bvid(&mut rng), name),
                    _ => Entity::new(i as i64 + 1, name),
                }
            })
            .collect();
        let written = db.insert_entities(category, &entities)?;
        println!("  {category}: {written} rows");
    }

    println!();
    println!("Catalog created: {}", args.output.display());
    Ok(())
}
