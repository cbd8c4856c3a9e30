//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use clap_complete::Shell;

/// Inspect node trees built from path files: one path per line, ids separated by a delimiter
#[derive(Parser, Debug)]
#[command(name = "looptree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file, layered over the global config
    #[arg(short, long, global = true, env = "LOOPTREE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print shell completions to stdout
    #[arg(long = "generate", value_enum)]
    pub generator: Option<Shell>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the tree
    Tree {
        /// Path file
        #[arg(value_hint = ValueHint::FilePath)]
        source_path: PathBuf,
    },

    /// List the path of every node in traversal order
    Paths {
        /// Path file
        #[arg(value_hint = ValueHint::FilePath)]
        source_path: PathBuf,
        /// Pad paths with empty columns up to this depth (overrides config)
        #[arg(short, long)]
        pad: Option<usize>,
    },

    /// List terminal nodes
    Terminals {
        /// Path file
        #[arg(value_hint = ValueHint::FilePath)]
        source_path: PathBuf,
    },

    /// List distinct ids at a depth (root is depth 0)
    Ids {
        /// Path file
        #[arg(value_hint = ValueHint::FilePath)]
        source_path: PathBuf,
        /// Depth to slice at
        #[arg(short = 'l', long)]
        depth: usize,
    },

    /// Print the depth of the deepest terminal node
    MaxDepth {
        /// Path file
        #[arg(value_hint = ValueHint::FilePath)]
        source_path: PathBuf,
    },
}
