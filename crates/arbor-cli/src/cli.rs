use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "Arbor: content-addressed snapshots of a working tree",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository to operate on (default: search upwards from the current directory)
    #[arg(short = 'C', long, global = true)]
    pub repo: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository
    Init(InitArgs),
    /// Store a file or directory and print its id
    Hash(HashArgs),
    /// Show an object by reference or id
    Cat(CatArgs),
    /// Record the working tree as a new commit
    Snapshot(SnapshotArgs),
    /// Show history from HEAD
    Log(LogArgs),
    /// Print the commit a reference resolves to
    Resolve(ResolveArgs),
    /// Replace the working tree with a commit's tree
    Checkout(CheckoutArgs),
    /// List or create branches
    Branch(BranchArgs),
    /// List or create tags
    Tag(TagArgs),
    /// Show changes between two commits
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<String>,
}

#[derive(Args)]
pub struct HashArgs {
    pub path: String,
}

#[derive(Args)]
pub struct CatArgs {
    pub object: String,
    /// Print the stored structure as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SnapshotArgs {
    #[arg(short, long)]
    pub message: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ResolveArgs {
    pub reference: String,
}

#[derive(Args)]
pub struct CheckoutArgs {
    pub reference: String,
}

#[derive(Args)]
pub struct BranchArgs {
    pub name: Option<String>,
    /// Start the branch here instead of at HEAD
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Args)]
pub struct TagArgs {
    pub name: Option<String>,
    /// Tag this commit instead of HEAD
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: String,
    /// Defaults to HEAD
    pub new: Option<String>,
}
