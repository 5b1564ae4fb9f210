//! Command-line surface of the `matrix-mul` binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use polycode::{
    BlockCounts, BlockGeometry, DEFAULT_MAX_VALUE, DEFAULT_REPEAT, Dimensions, RunConfig,
    StragglerPolicy,
};

use crate::Error;

/// Straggler-tolerant distributed matrix multiplication, C = Aᵀ·B.
#[derive(Parser, Debug)]
#[command(name = "matrix-mul", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the coordinator and all workers in this process
    Local(RunArgs),

    /// Serve the gRPC coordinator and run once every worker has joined
    Coordinator {
        /// Address to listen on, e.g. 0.0.0.0:50051
        #[arg(long)]
        listen: SocketAddr,

        /// Give up if not every worker joined within this many milliseconds
        #[arg(long)]
        join_timeout_ms: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Run one worker against a gRPC coordinator
    Worker {
        /// Coordinator address, e.g. localhost:50051
        #[arg(long)]
        connect: String,

        /// This worker's ordinal, 1..W-1
        #[arg(long)]
        ordinal: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Straggle {
    /// Stragglers pause before replying
    Sleep,
    /// Stragglers recompute their product several times
    Repeat,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Columns of A (rows of C)
    pub r: usize,
    /// Rows shared by A and B
    pub s: usize,
    /// Columns of B (columns of C)
    pub t: usize,
    /// Row blocks of A and B
    pub p: usize,
    /// Column blocks of A
    pub m: usize,
    /// Column blocks of B
    pub n: usize,

    /// Processes including the coordinator; defaults to the quorum plus
    /// one per straggler plus the coordinator
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Exclusive upper bound of generated input values
    #[arg(long, default_value_t = DEFAULT_MAX_VALUE)]
    pub max: i64,

    /// Number of workers told to straggle
    #[arg(long, default_value_t = 0)]
    pub stragglers: usize,

    #[arg(long, value_enum, default_value_t = Straggle::Sleep)]
    pub straggle: Straggle,

    /// Straggler pause for `--straggle sleep`
    #[arg(long, default_value_t = 1000)]
    pub sleep_ms: u64,

    /// Total computations for `--straggle repeat`
    #[arg(long, default_value_t = DEFAULT_REPEAT)]
    pub repeat: u32,

    /// Fail if the quorum is not complete within this many milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Seed for inputs and straggler selection
    #[arg(long)]
    pub seed: Option<u64>,
}

impl RunArgs {
    pub fn config(&self) -> Result<RunConfig, Error> {
        let dims = Dimensions {
            r: self.r,
            s: self.s,
            t: self.t,
        };
        let blocks = BlockCounts {
            p: self.p,
            m: self.m,
            n: self.n,
        };
        let world_size = match self.workers {
            Some(world_size) => world_size,
            None => BlockGeometry::new(dims, blocks)?.quorum_size() + self.stragglers + 1,
        };

        let mut config = RunConfig::new(dims, blocks, world_size);
        config.max_value = self.max;
        config.straggler_count = self.stragglers;
        config.policy = match self.straggle {
            Straggle::Sleep => StragglerPolicy::Sleep(Duration::from_millis(self.sleep_ms)),
            Straggle::Repeat => StragglerPolicy::Repeat(self.repeat),
        };
        config.deadline = self.deadline_ms.map(Duration::from_millis);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(args: &[&str]) -> RunArgs {
        let argv = ["matrix-mul", "local"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Local(run) => run,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn world_size_defaults_to_quorum_plus_stragglers() {
        let config = run_args(&["4", "2", "4", "2", "2", "2", "--stragglers", "3"])
            .config()
            .unwrap();
        assert_eq!(config.world_size, 9 + 3 + 1);
        assert_eq!(config.straggler_count, 3);
        assert_eq!(config.policy, StragglerPolicy::Sleep(Duration::from_secs(1)));
        assert_eq!(config.max_value, 10);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn explicit_options_reach_the_configuration() {
        let config = run_args(&[
            "4", "4", "4", "2", "2", "1", "-w", "9", "--straggle", "repeat", "--repeat", "7",
            "--deadline-ms", "250", "--max", "5",
        ])
        .config()
        .unwrap();
        assert_eq!(config.world_size, 9);
        assert_eq!(config.policy, StragglerPolicy::Repeat(7));
        assert_eq!(config.deadline, Some(Duration::from_millis(250)));
        assert_eq!(config.max_value, 5);
    }

    #[test]
    fn non_divisible_partition_fails_before_defaulting() {
        let args = run_args(&["4", "3", "4", "2", "2", "2"]);
        assert!(args.config().is_err());
    }

    #[test]
    fn parses_worker_and_coordinator() {
        let cli = Cli::try_parse_from([
            "matrix-mul", "worker", "--connect", "localhost:50051", "--ordinal", "3",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Worker { ordinal: 3, .. }));

        let cli = Cli::try_parse_from([
            "matrix-mul", "coordinator", "--listen", "127.0.0.1:50051", "4", "2", "4", "2", "2",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Coordinator { listen, run, .. } => {
                assert_eq!(listen.port(), 50051);
                assert_eq!(run.config().unwrap().world_size, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
