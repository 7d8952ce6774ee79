use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use repli_core::config::{self, Config};
use repli_core::github::ContentsClient;
use repli_core::inspect::{self, DEFAULT_CANDIDATES};
use repli_core::replicate::{build_excludes, Replicator, DEFAULT_MESSAGE};
use repli_core::retry::RetryPolicy;
use repli_core::rewrite::RewriteTable;

#[derive(Parser)]
#[command(name="repli", version, about="Copy a directory tree inside a hosted repository, rewriting period tokens")]
struct Cli { #[command(subcommand)] cmd: Cmd }

#[derive(Args)]
struct RemoteArgs {
    /// Access token (falls back to GITHUB_TOKEN, then .env)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,
    /// Branch to read from and commit to (default branch if unset)
    #[arg(long)]
    branch: Option<String>,
    /// Retries for 5xx and connection failures
    #[arg(long, default_value_t = 3)]
    retries: u32,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

impl RemoteArgs {
    fn config(&self) -> Result<Config> {
        let cfg = Config::new(self.token.clone(), self.repo.clone(), self.api_url.clone())?
            .with_branch(self.branch.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        Ok(cfg)
    }

    fn client(&self) -> Result<ContentsClient> {
        let cfg = self.config()?;
        info!("Repository: {}", cfg.repo);
        info!("API base: {}", cfg.repo_url());
        let retry = RetryPolicy::default().with_max_attempts(self.retries);
        ContentsClient::new(&cfg, retry).context("build HTTP client")
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct RulesArgs {
    /// JSON rewrite table: [{"find": .., "replace": ..}, ...]
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Built-in table advancing month names and dates from this period
    #[arg(long, value_name = "YYYY-MM")]
    advance_from: Option<String>,
}

impl RulesArgs {
    fn load(&self) -> Result<RewriteTable> {
        let table = match (&self.rules, &self.advance_from) {
            (Some(path), _) => RewriteTable::load(path).with_context(|| format!("load rules {}", path.display()))?,
            (None, Some(period)) => RewriteTable::month_advance(period)?,
            (None, None) => bail!("one of --rules or --advance-from is required"),
        };
        if table.is_empty() { warn!("rewrite table is empty; files are copied verbatim"); }
        for c in table.idempotence_conflicts() {
            let (r, e) = (&table.rules[c.rule], &table.rules[c.earlier]);
            warn!("rule {} replacement {:?} reintroduces find pattern {:?} of rule {}; a second run rewrites it again", c.rule, r.replace, e.find, c.earlier);
        }
        Ok(table)
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Copy a tree to a new location, rewriting file contents
    Replicate {
        #[command(flatten)] remote: RemoteArgs,
        #[command(flatten)] table: RulesArgs,
        /// Destination directory
        #[arg(long)]
        dest: String,
        /// Source directory; without it the repository root is replicated
        #[arg(long)]
        source: Option<String>,
        /// Root-level names to leave out (globs)
        #[arg(long, default_values = [".gitignore", "README.md"])]
        exclude: Vec<String>,
        /// Commit message; {source} and {target} are substituted
        #[arg(long, default_value = DEFAULT_MESSAGE)]
        message: String,
        /// Exit non-zero if any file or directory failed
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Show the repository root and check candidate source folders
    Inspect {
        #[command(flatten)] remote: RemoteArgs,
        paths: Vec<String>,
    },
    /// Print the effective rewrite table as JSON
    Rules {
        #[command(flatten)] table: RulesArgs,
    },
}

fn main() -> Result<()> {
    init_logging();
    config::load_dotenv();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Replicate { remote, table, dest, source, exclude, message, strict } => {
            replicate(&remote, &table, &dest, source.as_deref(), &exclude, &message, strict)?
        }
        Cmd::Inspect { remote, paths } => inspect_repo(&remote, &paths)?,
        Cmd::Rules { table } => print_rules(&table)?,
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn replicate(remote: &RemoteArgs, rules: &RulesArgs, dest: &str, source: Option<&str>, exclude: &[String], message: &str, strict: bool) -> Result<()> {
    let dest = dest.trim_matches('/');
    if dest.is_empty() { bail!("--dest must name a directory"); }
    let table = rules.load()?;
    let client = remote.client()?;
    let replicator = Replicator::new(&client, &table).with_message(message);

    let report = match source.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(src) => {
            if src == dest { bail!("--source and --dest are the same directory"); }
            replicator.replicate_tree(src, dest)
        }
        None => {
            let excludes = build_excludes(exclude).context("compile --exclude globs")?;
            replicator.replicate_root(dest, &excludes)
        }
    };

    let s = &report.summary;
    println!("Files processed: {}", report.root);
    println!(
        "Created {}, failed {}, fetch failures {}, empty {}, directories {}, listing failures {}",
        s.created, s.failed, s.fetch_failed, s.empty, s.directories, s.listing_failed
    );
    if strict && !s.is_clean() {
        bail!("replication incomplete: {} failed, {} unreadable, {} unlisted", s.failed, s.fetch_failed, s.listing_failed);
    }
    Ok(())
}

fn inspect_repo(remote: &RemoteArgs, paths: &[String]) -> Result<()> {
    let candidates: Vec<String> = if paths.is_empty() {
        DEFAULT_CANDIDATES.iter().map(|s| s.to_string()).collect()
    } else {
        paths.to_vec()
    };
    let client = remote.client()?;
    let report = inspect::inspect(&client, &candidates);
    for line in report.lines() { println!("{}", line); }
    if let Err(e) = report.root { bail!("cannot access repository: {}", e); }
    Ok(())
}

fn print_rules(rules: &RulesArgs) -> Result<()> {
    let table = rules.load()?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    for c in table.idempotence_conflicts() {
        println!("conflict: rule {} reintroduces rule {}", c.rule, c.earlier);
    }
    Ok(())
}
