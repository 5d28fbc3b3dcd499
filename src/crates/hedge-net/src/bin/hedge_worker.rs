//! Standalone remote worker for the hedge evaluation engine.
//!
//! Dials a coordinator, computes offloaded operations over the selected
//! algebra and exits 0 when the coordinator closes the connection. Any other
//! failure is logged and exits non-zero; there is no reconnect logic.

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use hedge_algebra::{GfAlgebra, Int64};
use hedge_net::remote;

#[derive(Parser)]
#[command(name = "hedge-worker")]
#[command(about = "Remote worker process for the hedge evaluation engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Coordinator address to connect to, host:port.
    #[arg(long, env = "HEDGE_ADDR", default_value = "127.0.0.1:9001")]
    addr: String,

    /// Algebra to compute over; must match the coordinator's.
    #[arg(long, value_enum, default_value = "int64")]
    algebra: AlgebraKind,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlgebraKind {
    /// 64-bit integers with wrapping arithmetic.
    Int64,
    /// GF(2): sum is XOR, product is AND.
    Gf2,
    /// Integers modulo 256.
    Gf256,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.algebra {
        AlgebraKind::Int64 => remote::connect(Int64, args.addr).await?,
        AlgebraKind::Gf2 => remote::connect(GfAlgebra::<2>, args.addr).await?,
        AlgebraKind::Gf256 => remote::connect(GfAlgebra::<256>, args.addr).await?,
    }
    Ok(())
}
