use std::time::Instant;

use clap::Parser;
use fss_core::fss::params::GlobalParams;
use fss_core::fss::store::Dealer;

/// Benchmarks dealer key generation over a grid of `(lambda, n, count)`
/// values, in the grid-loop-and-time style of this lineage's offline-phase
/// tooling.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// PRG seed widths to benchmark.
    #[arg(long, value_delimiter = ',', default_value = "110,128")]
    lambda: Vec<usize>,

    /// Ring bit widths to benchmark.
    #[arg(long, value_delimiter = ',', default_value = "16,32")]
    n: Vec<usize>,

    /// Batch sizes to benchmark.
    #[arg(long, value_delimiter = ',', default_value = "64,256")]
    count: Vec<usize>,
}

fn main() {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();
    let cli = Cli::parse();

    let mut grid = Vec::new();
    for &lambda in &cli.lambda {
        for &n in &cli.n {
            for &count in &cli.count {
                grid.push((lambda, n, count));
            }
        }
    }

    for (lambda, n, count) in grid {
        let params = match GlobalParams::new(lambda, n) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("skipping (lambda={lambda}, n={n}): {e}");
                continue;
            }
        };
        let dealer = Dealer::new(params);
        let mut rng = rand::thread_rng();

        let start = Instant::now();
        dealer
            .keygen_eq(count, &mut rng)
            .expect("keygen_eq failed");
        let eq_micros = start.elapsed().as_micros();

        let start = Instant::now();
        dealer
            .keygen_comp(count, &mut rng)
            .expect("keygen_comp failed");
        let comp_micros = start.elapsed().as_micros();

        let start = Instant::now();
        dealer.keygen_xor_add(count, &mut rng);
        let xor_add_micros = start.elapsed().as_micros();

        println!(
            "(lambda={lambda}, n={n}, count={count}): eq={eq_micros}us, comp={comp_micros}us, xor_add={xor_add_micros}us"
        );
    }
}
