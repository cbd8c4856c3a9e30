use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

use crate::builder::parse_path_lines;
use crate::cli::args::{Cli, Commands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::tree_traits::TreeNodeConvert;
use crate::NodeTree;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    debug!("settings: {:?}", settings);

    match &cli.command {
        Some(Commands::Tree { source_path }) => _tree(source_path, &settings),
        Some(Commands::Paths { source_path, pad }) => {
            let settings = Settings {
                pad_to_level: pad.or(settings.pad_to_level),
                ..settings
            };
            _paths(source_path, &settings)
        }
        Some(Commands::Terminals { source_path }) => _terminals(source_path, &settings),
        Some(Commands::Ids { source_path, depth }) => _ids(source_path, *depth, &settings),
        Some(Commands::MaxDepth { source_path }) => _max_depth(source_path, &settings),
        None => Ok(()),
    }
}

/// Builds a tree from a path file.
#[instrument(level = "debug", skip(settings))]
pub fn load_tree(source_path: &Path, settings: &Settings) -> CliResult<NodeTree<()>> {
    let content = fs::read_to_string(source_path)
        .map_err(|e| CliError::io(format!("read {}", source_path.display()), e))?;
    let paths = parse_path_lines(&content, &settings.delimiter);
    if paths.is_empty() {
        return Err(CliError::EmptyInput(source_path.to_path_buf()));
    }

    let mut tree = NodeTree::new();
    tree.setup(&paths)?;
    Ok(tree)
}

#[instrument(skip(settings))]
fn _tree(source_path: &Path, settings: &Settings) -> CliResult<()> {
    let tree = load_tree(source_path, settings)?;
    output::info(&tree.to_tree_string());
    Ok(())
}

#[instrument(skip(settings))]
fn _paths(source_path: &Path, settings: &Settings) -> CliResult<()> {
    let tree = load_tree(source_path, settings)?;
    tree.walk(
        tree.root(),
        |node| output::info(&settings.render_path(node)),
        |_| {},
        crate::always,
    );
    Ok(())
}

#[instrument(skip(settings))]
fn _terminals(source_path: &Path, settings: &Settings) -> CliResult<()> {
    let tree = load_tree(source_path, settings)?;
    let terminals = tree.terminal_nodes(tree.root());
    output::header(&format!("{} terminal nodes:", terminals.len()));
    for node in terminals.into_iter().filter_map(|id| tree.node(id)) {
        output::info(&settings.render_path(node));
    }
    Ok(())
}

#[instrument(skip(settings))]
fn _ids(source_path: &Path, depth: usize, settings: &Settings) -> CliResult<()> {
    let tree = load_tree(source_path, settings)?;
    for id in tree.ids_at_depth(tree.root(), depth) {
        output::info(&id);
    }
    Ok(())
}

#[instrument(skip(settings))]
fn _max_depth(source_path: &Path, settings: &Settings) -> CliResult<()> {
    let tree = load_tree(source_path, settings)?;
    output::info(&tree.max_depth(tree.root()));
    Ok(())
}
