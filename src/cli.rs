//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};

/// Fetch and archive dealer price-list documents.
///
/// Walks dealer listing pages, downloads the linked PDF price lists, checks
/// they really are PDFs and files them as `{brand}/{year}/dealer_{id}_{date}.pdf`.
#[derive(Parser, Debug)]
#[command(name = "pricelists")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/pricelists/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Dealer to brand mapping file (JSON object)
    #[arg(long, value_name = "PATH", global = true)]
    pub mapping: Option<PathBuf>,

    /// Root directory documents are filed under
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Directory run reports are written to
    #[arg(long, value_name = "DIR", global = true)]
    pub report_dir: Option<PathBuf>,

    /// Site base URL
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Maximum concurrent document downloads (1-100)
    #[arg(short = 'c', long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Maximum dealers processed at once (1-100)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub dealer_concurrency: Option<u8>,

    /// Attempts per request when rate limited (1-10)
    #[arg(short = 'r', long, global = true, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// Minimum delay between requests to the site in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, global = true, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub crawl_delay: Option<u64>,

    /// Load robots.txt and honour its Disallow rules and Crawl-delay
    #[arg(long, global = true)]
    pub check_robots: bool,

    /// User-Agent: "random" (default), "rotate", or a literal value
    #[arg(long, value_name = "UA", global = true)]
    pub user_agent: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// What to fetch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the newest price list of every mapped dealer
    Latest(DealerFilter),

    /// Download every listed price list, for all dealers or one brand
    #[command(group(ArgGroup::new("scope").required(true).args(["all", "brand"])))]
    Archive {
        /// Every dealer in the mapping
        #[arg(long)]
        all: bool,

        /// Only dealers of this brand
        #[arg(long, value_name = "NAME")]
        brand: Option<String>,

        /// Restrict to these dealer ids (repeatable)
        #[arg(long = "dealer", value_name = "ID")]
        dealers: Vec<String>,
    },

    /// Download every price list linked from one listing page
    Page {
        /// Listing page URL
        url: String,

        /// Brand to file documents under (default: taken from the URL)
        #[arg(long, value_name = "NAME")]
        brand: Option<String>,
    },

    /// Download older price lists recorded in a discovery index
    History {
        /// Discovery index file (dealer -> year -> [{url, date}])
        #[arg(long, value_name = "FILE")]
        index: PathBuf,

        #[command(flatten)]
        filter: DealerFilter,
    },
}

/// Narrows the mapped dealers a command runs over.
#[derive(ClapArgs, Debug, Default)]
pub struct DealerFilter {
    /// Only dealers of this brand
    #[arg(long, value_name = "NAME")]
    pub brand: Option<String>,

    /// Restrict to these dealer ids (repeatable)
    #[arg(long = "dealer", value_name = "ID")]
    pub dealers: Vec<String>,
}
