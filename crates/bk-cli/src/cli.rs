use clap::{ArgAction, Args, Parser, Subcommand};

use bk_domain::BlockVersion;

pub const BK_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const BK_BEFORE_HELP: &str = concat!(
    "bk ",
    env!("CARGO_PKG_VERSION"),
    " – block registry client\n\n",
    "\x1b[1;36mAccount\x1b[0m\n",
    "  user             Show or switch the registry user.\n",
    "  login            Log in, prompting for credentials when needed.\n",
    "  logout           Forget the stored token; the username is kept.\n\n",
    "\x1b[1;36mRegistry\x1b[0m\n",
    "  info             Show server version and notices.\n",
    "  deps             Show the dependency table of a published version.\n",
    "  fetch            Retrieve files of a published version into the cache.\n",
    "  check            Compare cached parent versions with the server.\n\n",
    "\x1b[1;36mCache\x1b[0m\n",
    "  cache            Inspect, garbage-collect or wipe the local cache.\n",
);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = BK_BEFORE_HELP,
    help_template = BK_HELP_TEMPLATE
)]
pub struct BkCli {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v", global = true)]
    pub trace: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Show the current user, or switch to another one (`none` for anonymous).",
        override_usage = "bk user [NAME] [--password PASSWORD]"
    )]
    User(UserArgs),
    #[command(about = "Log in to the registry, prompting for credentials when needed.")]
    Login,
    #[command(about = "Forget the stored token; the username is kept for the next login.")]
    Logout,
    #[command(about = "Show server version and notices.")]
    Info,
    #[command(
        about = "Show the dependency table of a published version.",
        override_usage = "bk deps <OWNER/BLOCK/BRANCH@TIME>"
    )]
    Deps(VersionArgs),
    #[command(
        about = "Retrieve files of a published version through the cache.",
        override_usage = "bk fetch <OWNER/BLOCK/BRANCH@TIME> <FILE> [FILE ...]"
    )]
    Fetch(FetchArgs),
    #[command(
        about = "Compare cached parent versions with the server and drop stale entries.",
        override_usage = "bk check <VERSION> [VERSION ...] [--publish]"
    )]
    Check(CheckArgs),
    #[command(subcommand, about = "Inspect and maintain the local cache.")]
    Cache(CacheCommand),
}

#[derive(Args, Debug)]
pub struct UserArgs {
    #[arg(value_name = "NAME", help = "Username to switch to; omit to show the current one")]
    pub name: Option<String>,
    #[arg(short, long, help = "Authenticate right away with this password")]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    #[arg(value_name = "VERSION")]
    pub version: BlockVersion,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[arg(value_name = "VERSION")]
    pub version: BlockVersion,
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "VERSION", required = true, num_args = 1..)]
    pub versions: Vec<BlockVersion>,
    #[arg(long, help = "Fail when any cached parent drifted, as a publish would")]
    pub publish: bool,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    #[command(about = "Show row counts of the cache tables.")]
    Info,
    #[command(about = "Remove cells and contents no reference points to.")]
    Gc,
    #[command(about = "Drop every cached artifact and the stored token.")]
    Clean,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        BkCli::command().debug_assert();
    }

    #[test]
    fn versions_parse_from_canonical_form() -> anyhow::Result<()> {
        let cli = BkCli::try_parse_from(["bk", "deps", "maya/lib/master@3"])?;
        match cli.command {
            CommandGroupCli::Deps(args) => {
                assert_eq!(args.version.to_string(), "maya/lib/master@3");
            }
            other => panic!("unexpected command {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn check_accepts_many_versions() -> anyhow::Result<()> {
        let cli = BkCli::try_parse_from([
            "bk",
            "check",
            "maya/lib/master@3",
            "pepe/math/master@1",
            "--publish",
        ])?;
        match cli.command {
            CommandGroupCli::Check(args) => {
                assert_eq!(args.versions.len(), 2);
                assert!(args.publish);
            }
            other => panic!("unexpected command {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn malformed_versions_are_rejected() {
        assert!(BkCli::try_parse_from(["bk", "deps", "maya/lib"]).is_err());
    }
}
