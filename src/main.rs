use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use deepfind::{
    ApproxComparator, Comparator, ExactComparator, JsonOptions, PathStep, Retriever, SearchConfig,
    SearchEngine, SearchMode, Session, Target, TextComparator, TextMatch, Tree,
};

/// Search a JSON document by value or by index
#[derive(Parser, Debug)]
#[command(name = "deepfind")]
#[command(about = "Find values and keys in nested data", long_about = None)]
struct Args {
    /// JSON file to search
    file: PathBuf,

    #[command(flatten)]
    query: Query,

    /// Relative tolerance for numeric comparison
    #[arg(long, conflicts_with = "ignore_case")]
    tolerance: Option<f64>,

    /// Compare text case-insensitively
    #[arg(long)]
    ignore_case: bool,

    /// Pack homogeneous numeric lists into flat arrays
    #[arg(long)]
    pack_arrays: bool,

    /// Read {"columns", "index", "data"} objects as tables
    #[arg(long)]
    pack_tables: bool,

    /// Name of the root in printed expressions
    #[arg(long, default_value = "root")]
    root_name: String,

    /// Only expand containers up to this depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct Query {
    /// Find paths whose value equals this JSON (plain text if it does not parse)
    #[arg(long)]
    value: Option<String>,

    /// Find every entry, field or column with this key
    #[arg(long)]
    key: Option<String>,

    /// Find every item at this position; negative counts from the end
    #[arg(long, allow_hyphen_values = true)]
    position: Option<isize>,

    /// Find every record field with this name
    #[arg(long)]
    field: Option<String>,
}

impl Query {
    fn target(self) -> Target {
        if let Some(raw) = self.value {
            let value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
            return Target::Value(Tree::from_json(&value));
        }
        let step = match (self.key, self.position, self.field) {
            (Some(key), _, _) => PathStep::Key(key),
            (_, Some(pos), _) => PathStep::Position(pos),
            (_, _, Some(field)) => PathStep::FieldName(field),
            _ => PathStep::Position(0),
        };
        Target::Index(step)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let document: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", args.file.display()))?;
    let options = JsonOptions {
        pack_arrays: args.pack_arrays,
        pack_tables: args.pack_tables,
    };
    let tree = Tree::from_json_with(&document, options);
    info!("Loaded {} nodes from {:?}", tree.len(), args.file);

    let comparator: Box<dyn Comparator> = match (args.tolerance, args.ignore_case) {
        (Some(rel_tol), _) => Box::new(ApproxComparator::new(rel_tol, 0.0)),
        (None, true) => Box::new(TextComparator::new(TextMatch::Equal).ignore_case(true)),
        (None, false) => Box::new(ExactComparator),
    };
    let engine = SearchEngine::with_config(SearchConfig {
        max_depth: args.max_depth,
        ..SearchConfig::default()
    });
    let retriever = Retriever::new().with_root_name(args.root_name);

    let root = tree.root()?;
    let mut session = Session::with_comparator(root, comparator)
        .with_engine(engine)
        .with_retriever(retriever.clone());
    let result = session.find(Some(args.query.target()))?;
    debug!("{} matches", result.len());

    for (path, found) in result.paths.iter().zip(&result.values) {
        let expr = retriever.render_expression(root, path);
        match result.mode {
            SearchMode::ByValue => println!("{}", expr),
            SearchMode::ByIndex => println!("{} = {}", expr, found.to_json()),
        }
    }
    Ok(())
}
