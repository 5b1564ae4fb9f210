use clap::Parser;
use matrix_mul::cli::{Cli, Command};
use matrix_mul::{MatrixMul, Report};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Local(run) => {
            let mut mm = MatrixMul::new(run.config()?, run.seed)?;
            mm.run_local().await.map(|report| print_report(&report))
        }
        Command::Coordinator {
            listen,
            join_timeout_ms,
            run,
        } => {
            let mut mm = MatrixMul::new(run.config()?, run.seed)?;
            let join_timeout = join_timeout_ms.map(std::time::Duration::from_millis);
            println!("Waiting for {} workers on {}...", mm.config().world_size - 1, listen);
            mm.coordinate(listen, join_timeout)
                .await
                .map(|report| print_report(&report))
        }
        Command::Worker { connect, ordinal } => {
            println!("Worker {} connecting to {}...", ordinal, connect);
            matrix_mul::work(connect, ordinal)
                .await
                .map(|()| println!("Worker {} done!", ordinal))
        }
    };

    if let Err(e) = &result {
        error!(error = %e, "run failed");
    }
    Ok(result?)
}

fn print_report(report: &Report) {
    let (s, r) = report.a.shape();
    let t = report.b.cols();
    println!("Matrix A ({}x{}):", s, r);
    print!("{}", report.a);
    println!("Matrix B ({}x{}):", s, t);
    print!("{}", report.b);
    println!("Direct AᵀB ({}x{}):", r, t);
    print!("{}", report.direct);
    println!("Decoded C ({}x{}):", r, t);
    print!("{}", report.outcome.product);

    let timings = &report.outcome.report;
    let quorum: Vec<u32> = timings.quorum.iter().map(|p| p.get()).collect();
    println!("Quorum: {:?}", quorum);
    println!(
        "Timings: encode {:?}, distribute {:?}, collect {:?}, decode {:?}",
        timings.encode, timings.distribute, timings.collect, timings.decode
    );
    println!("Decoded product matches direct computation.");
}
