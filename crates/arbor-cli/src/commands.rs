use anyhow::{bail, Context};
use arbor_codec::{Encode, Encoder, Value};
use arbor_repo::{Change, Object, Reference, Repository, Resolution};
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let verbose = cli.verbose;
    let repo_path = cli.repo;
    match cli.command {
        Command::Init(args) => cmd_init(args, repo_path),
        Command::Hash(args) => cmd_hash(&open(repo_path)?, args),
        Command::Cat(args) => cmd_cat(&open(repo_path)?, args, verbose),
        Command::Snapshot(args) => cmd_snapshot(&open(repo_path)?, args),
        Command::Log(args) => cmd_log(&open(repo_path)?, args, verbose),
        Command::Resolve(args) => cmd_resolve(&open(repo_path)?, args),
        Command::Checkout(args) => cmd_checkout(&open(repo_path)?, args),
        Command::Branch(args) => cmd_branch(&open(repo_path)?, args),
        Command::Tag(args) => cmd_tag(&open(repo_path)?, args),
        Command::Diff(args) => cmd_diff(&open(repo_path)?, args),
    }
}

fn open(path: Option<String>) -> anyhow::Result<Repository> {
    let repo = match path {
        Some(path) => Repository::open(&path),
        None => Repository::discover("."),
    };
    let repo = repo?;
    debug!(root = %repo.root().display(), "using repository");
    Ok(repo)
}

fn print_warnings(resolution: &Resolution) {
    for warning in &resolution.warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}

fn short(id: &arbor_repo::ObjectId) -> String {
    id.short_hex()
}

fn cmd_init(args: InitArgs, repo_path: Option<String>) -> anyhow::Result<()> {
    let path = args.path.or(repo_path).unwrap_or_else(|| ".".into());
    let repo = Repository::init(&path)?;
    println!(
        "{} Initialized empty Arbor repository in {}",
        "✓".green().bold(),
        repo.store_dir().display().to_string().bold()
    );
    println!("  Branch: {}", arbor_repo::DEFAULT_BRANCH.yellow());
    Ok(())
}

fn cmd_hash(repo: &Repository, args: HashArgs) -> anyhow::Result<()> {
    let object = repo
        .hash_file(&args.path)
        .with_context(|| format!("cannot hash {}", args.path))?;
    println!("{}", object.id());
    Ok(())
}

fn cmd_cat(repo: &Repository, args: CatArgs, verbose: bool) -> anyhow::Result<()> {
    let (object, resolution) = repo.find_object(&args.object)?;
    print_warnings(&resolution);
    if args.json {
        let mut encoder = Encoder::new();
        object.encode(&mut encoder)?;
        let json = to_json(&encoder.into_value()?);
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", object.description(verbose));
        if matches!(object, Object::Blob(_)) {
            println!();
        }
    }
    Ok(())
}

/// Render a stored structure as JSON. Binary fields become hex strings.
fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::from(*n),
        Value::UInt(n) => Json::from(*n),
        Value::Float(f) => Json::from(f64::from(*f)),
        Value::Double(f) => Json::from(*f),
        Value::String(s) => Json::String(s.clone()),
        Value::Binary(bytes) => Json::String(hex::encode(bytes)),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| {
                    let key = match k.as_str() {
                        Some(s) => s.to_string(),
                        None => to_json(k).to_string(),
                    };
                    (key, to_json(v))
                })
                .collect(),
        ),
    }
}

fn cmd_snapshot(repo: &Repository, args: SnapshotArgs) -> anyhow::Result<()> {
    let outcome = repo.snapshot(&args.message)?;
    let location = repo
        .current_branch()?
        .unwrap_or_else(|| "detached HEAD".into());
    let root = if outcome.parent_id.is_none() { " (root commit)" } else { "" };
    println!(
        "[{}{} {}] {}",
        location.green(),
        root,
        short(&outcome.commit_id).yellow(),
        args.message.lines().next().unwrap_or_default()
    );
    Ok(())
}

fn cmd_log(repo: &Repository, args: LogArgs, verbose: bool) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(usize::MAX);
    let mut shown = 0;
    for commit in repo.commits()?.take(limit) {
        let commit = commit?;
        if shown > 0 {
            println!();
        }
        let description = commit.description(verbose);
        let (header, body) = description.split_once('\n').unwrap_or((description.as_str(), ""));
        println!("{}", header.yellow());
        print!("{body}");
        shown += 1;
    }
    if shown == 0 {
        println!("No commits yet.");
    }
    Ok(())
}

fn cmd_resolve(repo: &Repository, args: ResolveArgs) -> anyhow::Result<()> {
    let resolution = repo.resolve(Reference::unknown(&args.reference))?;
    print_warnings(&resolution);
    match resolution.commit_id() {
        Some(id) => println!("{id}"),
        None => bail!("could not resolve {}", args.reference),
    }
    Ok(())
}

fn cmd_checkout(repo: &Repository, args: CheckoutArgs) -> anyhow::Result<()> {
    let id = repo.checkout(&Reference::unknown(&args.reference))?;
    match repo.current_branch()? {
        Some(branch) => {
            println!("Switched to branch {}", branch.yellow().bold());
        }
        None => println!("HEAD is now at {}", short(&id).yellow()),
    }
    Ok(())
}

fn cmd_branch(repo: &Repository, args: BranchArgs) -> anyhow::Result<()> {
    let Some(name) = args.name else {
        let current = repo.current_branch()?;
        for branch in repo.branches()? {
            if current.as_deref() == Some(branch.as_str()) {
                println!("* {}", branch.green().bold());
            } else {
                println!("  {branch}");
            }
        }
        return Ok(());
    };

    let from = args.from.map(Reference::unknown);
    match repo.create_branch(&name, from.as_ref())? {
        Some(id) => println!("Created branch {} at {}", name.yellow(), short(&id)),
        None => println!("Created branch {} (no commits yet)", name.yellow()),
    }
    Ok(())
}

fn cmd_tag(repo: &Repository, args: TagArgs) -> anyhow::Result<()> {
    let Some(name) = args.name else {
        let tags = repo.tags()?;
        if tags.is_empty() {
            println!("No tags.");
        }
        for tag in tags {
            println!("{tag}");
        }
        return Ok(());
    };

    let from = args.from.map(Reference::unknown);
    let id = repo.create_tag(&name, from.as_ref())?;
    println!("Created tag {} at {}", name.yellow(), short(&id));
    Ok(())
}

fn cmd_diff(repo: &Repository, args: DiffArgs) -> anyhow::Result<()> {
    let old = Reference::unknown(&args.old);
    let new = args.new.map(Reference::unknown);
    let changes = repo.diff(&old, new.as_ref())?.changes();
    if changes.is_empty() {
        println!("No changes.");
    }
    for change in &changes {
        let line = change.to_string();
        let line = match change {
            Change::Added { .. } => line.green(),
            Change::Removed { .. } => line.red(),
            Change::Modified { .. } => line.yellow(),
            Change::Renamed { .. } => line.cyan(),
        };
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with_commit() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "hi").unwrap();
        repo.snapshot("first").unwrap();
        (dir, repo)
    }

    #[test]
    fn json_renders_commit_fields() {
        let (_dir, repo) = repo_with_commit();
        let (object, _) = repo.find_object("HEAD").unwrap();
        let mut encoder = Encoder::new();
        object.encode(&mut encoder).unwrap();
        let json = to_json(&encoder.into_value().unwrap());

        assert_eq!(json["type"], "commit");
        assert_eq!(json["object"]["message"], "first");
        assert!(json["object"].get("parentId").is_none());
    }

    #[test]
    fn json_renders_binary_as_hex() {
        let value = Value::Map(vec![(Value::from("content"), Value::Binary(vec![0xab, 0x01]))]);
        assert_eq!(to_json(&value)["content"], "ab01");
    }

    #[test]
    fn resolve_unknown_ref_fails() {
        let (_dir, repo) = repo_with_commit();
        let err = cmd_resolve(
            &repo,
            ResolveArgs {
                reference: "missing".into(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("could not resolve"));
    }

    #[test]
    fn branch_then_checkout() {
        let (_dir, repo) = repo_with_commit();
        cmd_branch(
            &repo,
            BranchArgs {
                name: Some("topic".into()),
                from: None,
            },
        )
        .unwrap();
        cmd_checkout(
            &repo,
            CheckoutArgs {
                reference: "topic".into(),
            },
        )
        .unwrap();
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("topic"));
    }
}
