use clap::{Parser, Subcommand};

use fss_core::fss::params::GlobalParams;
use fss_core::network::dealer_server::DealerServer;
use fss_core::network::participant::Participant;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value_t = 110)]
    lambda: usize,

    #[arg(long, default_value_t = 32)]
    n: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dealer/rendezvous server, dealing `batch_size` primitives to
    /// the two participants once both have registered.
    DealerServer {
        #[arg(long, default_value_t = 1024)]
        batch_size: usize,
    },
    /// Run one party (0 or 1), connect to the dealer and the peer, then
    /// evaluate a single demonstration batch of equality and comparison
    /// checks over randomly-shared operands.
    Participant {
        #[arg(long)]
        id: u8,

        #[arg(long, default_value_t = 16)]
        batch_size: usize,
    },
}

fn main() {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();
    let cli = Cli::parse();
    let params = GlobalParams::new(cli.lambda, cli.n).expect("invalid (lambda, n)");

    match cli.command {
        Commands::DealerServer { batch_size } => {
            let server = DealerServer::new(params, batch_size).expect("failed to bind dealer server");
            server.run();
        }
        Commands::Participant { id, batch_size } => {
            let participant = Participant::connect(id, params).expect("failed to join session");
            log::info!("party {id} connected, running a demonstration batch of {batch_size}");

            let mut rng = rand::thread_rng();
            let x1_shares: Vec<u64> = (0..batch_size)
                .map(|_| params.reduce(rand::RngCore::next_u64(&mut rng)))
                .collect();
            let x2_shares = vec![0u64; batch_size];

            let eq_shares = participant.eq(&x1_shares, &x2_shares).expect("eq failed");
            let le_shares = participant.le(&x1_shares, &x2_shares).expect("le failed");
            log::info!(
                "party {id} done: {} eq shares, {} le shares",
                eq_shares.len(),
                le_shares.len()
            );
        }
    }
}
