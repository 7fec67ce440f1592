//! Generate synthetic dirty Parquet files.
//!
//! Writes numbered files shaped like the production dataset so the pipeline
//! can be exercised end to end without real data:
//!
//! ```text
//! cargo run --features test-utils --bin generate-fixtures -- fixtures 4 50000
//! cargo run --bin term-scrub -- --template 'fixtures/part-000{index}.parquet' --count 4
//! ```

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use term_scrub::test_fixtures::{batch_from_rows, random_rows, raw_schema, write_parquet};

const ROWS_PER_ROW_GROUP: usize = 10_000;
const DIRTY_FRACTION: f64 = 0.2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let fixtures_dir = PathBuf::from(args.next().unwrap_or_else(|| "fixtures".to_string()));
    let files: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(4);
    let rows_per_file: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(50_000);

    std::fs::create_dir_all(&fixtures_dir)?;
    println!("Generating {files} files of {rows_per_file} rows in {fixtures_dir:?}");

    let mut rng = StdRng::seed_from_u64(42);
    for index in 0..files {
        let rows = random_rows(&mut rng, rows_per_file, DIRTY_FRACTION);
        let batches: Vec<_> = rows.chunks(ROWS_PER_ROW_GROUP).map(batch_from_rows).collect();

        let output_path = fixtures_dir.join(format!("part-000{index:02}.parquet"));
        println!("  Writing {output_path:?}");
        write_parquet(&output_path, raw_schema(), &batches)?;
    }

    println!("Fixtures generated successfully!");
    Ok(())
}
