use clap::Parser;

/// Wires a chain of dynamically loaded stages into a pipeline and feeds it
/// from stdin, one line per work item, line by line until end of file.
#[derive(Debug, Parser)]
#[command(name = "analyzer", version, about)]
pub struct Cli {
    /// Capacity of the bounded queue in front of every stage.
    #[arg(value_parser = parse_capacity)]
    pub queue_capacity: usize,

    /// Stage names, in pipeline order (e.g. `uppercase reverse logger`).
    #[arg(required = true, num_args = 1..)]
    pub stages: Vec<String>,

    /// Directory to load `pipeloom_stage_*` cdylibs from.
    ///
    /// Defaults to this workspace's `target/debug` or `target/release`,
    /// matching whichever profile `analyzer` itself was built with.
    #[arg(long, env = "PIPELOOM_STAGE_DIR")]
    pub stage_dir: Option<std::path::PathBuf>,
}

fn parse_capacity(value: &str) -> Result<usize, String> {
    let capacity: usize = value
        .parse()
        .map_err(|_| format!("`{value}` is not a non-negative integer"))?;
    if capacity == 0 {
        return Err("queue capacity must be at least 1".to_string());
    }
    Ok(capacity)
}
