use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sift", about = "Filtered, paginated views over XML/JSON/CSV files")]
pub struct Cli {
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a data file and print one page of the (optionally
    /// filtered) view as JSON.
    View(ViewArgs),
    /// Load a data file and print its field analysis.
    Fields(FieldsArgs),
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Path to the XML, JSON or CSV file.
    pub input: String,
    /// Format override; inferred from the file extension when omitted.
    #[arg(long)]
    pub format: Option<String>,
    /// Tag (XML) or property (JSON) naming the repeated item collection.
    #[arg(long, default_value = "")]
    pub selector: String,
    /// Free-text search over visible fields, matched anywhere in the
    /// item including nested values.
    #[arg(long, default_value = "")]
    pub search: String,
    /// Conditional predicate, repeatable. OP is one of equals,
    /// notEquals, contains, notContains, startsWith, endsWith,
    /// isEmpty, isNotEmpty, greaterThan, lessThan.
    #[arg(long = "where", value_name = "FIELD:OP[:VALUE]")]
    pub conditions: Vec<String>,
    /// How conditional predicates combine: and | or.
    #[arg(long, default_value = "and")]
    pub logic: String,
    /// Field path to hide from the view; repeatable.
    #[arg(long, value_name = "FIELD")]
    pub hide: Vec<String>,
    /// Drop items whose visible top-level fields are all empty.
    #[arg(long, default_value_t = false)]
    pub skip_empty: bool,
    /// YAML file holding a complete filter set; flags layer on top.
    #[arg(long, value_name = "FILE")]
    pub filters: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    #[arg(long, default_value_t = sift_core::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

#[derive(Args, Debug)]
pub struct FieldsArgs {
    /// Path to the XML, JSON or CSV file.
    pub input: String,
    /// Format override; inferred from the file extension when omitted.
    #[arg(long)]
    pub format: Option<String>,
    /// Tag (XML) or property (JSON) naming the repeated item collection.
    #[arg(long, default_value = "")]
    pub selector: String,
}
