use std::rc::Rc;

use anyhow::{bail, Context as _, Result};
use tracing::debug;

use bk_core::{AuthManager, BlockApiProxy, Config, RestClient, UserIo};
use bk_domain::{BlockVersion, Credentials, References};
use bk_store::LocalDb;

use crate::cli::{CacheCommand, CheckArgs, CommandGroupCli, FetchArgs, UserArgs};
use crate::style::Style;

type Proxy = BlockApiProxy<AuthManager<RestClient, Rc<LocalDb>>>;

/// State shared by every command of one invocation.
pub struct CommandContext {
    config: Config,
    store: Rc<LocalDb>,
    io: Rc<dyn UserIo>,
    style: Style,
}

impl CommandContext {
    pub fn new(config: Config, io: Rc<dyn UserIo>, style: Style) -> Result<Self> {
        let path = config.database_path();
        let store = LocalDb::open(&path)
            .with_context(|| format!("failed to open local cache at {}", path.display()))?;
        Ok(Self {
            config,
            store: Rc::new(store),
            io,
            style,
        })
    }

    fn proxy(&self) -> Result<Proxy> {
        let rest = RestClient::new(&self.config, Rc::clone(&self.io))?;
        let auth = AuthManager::new(rest, Rc::clone(&self.store), Rc::clone(&self.io))?;
        Ok(BlockApiProxy::new(
            Rc::clone(&self.store),
            auth,
            Rc::clone(&self.io),
        ))
    }
}

pub fn dispatch(ctx: &CommandContext, command: &CommandGroupCli) -> Result<()> {
    debug!(?command, "dispatching");
    match command {
        CommandGroupCli::User(args) => user(ctx, args),
        CommandGroupCli::Login => login(ctx),
        CommandGroupCli::Logout => logout(ctx),
        CommandGroupCli::Info => info(ctx),
        CommandGroupCli::Deps(args) => deps(ctx, &args.version),
        CommandGroupCli::Fetch(args) => fetch(ctx, args),
        CommandGroupCli::Check(args) => check(ctx, args),
        CommandGroupCli::Cache(command) => cache(ctx, command),
    }
}

fn describe_user(user: Option<&str>) -> String {
    match user {
        Some(user) => user.to_string(),
        None => "None (anonymous)".to_string(),
    }
}

fn user(ctx: &CommandContext, args: &UserArgs) -> Result<()> {
    let current = ctx.store.get_login()?;
    let Some(name) = args.name.as_deref() else {
        println!("Current user: {}", describe_user(current.username.as_deref()));
        return Ok(());
    };
    let new_user = (name != "none").then(|| name.to_string());
    let token = match (&new_user, &args.password) {
        (Some(user), Some(password)) => Some(ctx.proxy()?.authenticate(user, password)?),
        _ => None,
    };
    if new_user == current.username {
        println!("Current user already: {}", describe_user(new_user.as_deref()));
    } else {
        println!(
            "Change user from {} to {}",
            describe_user(current.username.as_deref()),
            describe_user(new_user.as_deref())
        );
        ctx.store.clean()?;
    }
    ctx.store.set_login(&Credentials {
        username: new_user,
        token,
    })?;
    Ok(())
}

fn login(ctx: &CommandContext) -> Result<()> {
    let mut proxy = ctx.proxy()?;
    proxy.require_auth()?;
    let user = proxy.user_name()?;
    println!(
        "{}",
        ctx.style
            .success(&format!("Logged in as {}", describe_user(user.as_deref())))
    );
    Ok(())
}

fn logout(ctx: &CommandContext) -> Result<()> {
    let login = ctx.store.get_login()?;
    ctx.store.set_login(&login.without_token())?;
    println!(
        "Token removed for {}",
        describe_user(login.username.as_deref())
    );
    Ok(())
}

fn info(ctx: &CommandContext) -> Result<()> {
    let mut proxy = ctx.proxy()?;
    println!("Server: {}", ctx.config.server_url());
    let Some(server) = proxy.probe_server_info()? else {
        return Ok(());
    };
    println!("Server version: {}", server.version);
    if let Some(last) = &server.last_compatible {
        println!("Oldest compatible client: {last}");
    }
    if !server.message.is_empty() {
        ctx.io.info(&server.message);
    }
    Ok(())
}

fn deps(ctx: &CommandContext, version: &BlockVersion) -> Result<()> {
    let mut proxy = ctx.proxy()?;
    let Some(table) = proxy.get_dep_table(version)? else {
        bail!("{version} is not published; it has no dependency table");
    };
    if table.is_empty() {
        println!("{version} has no dependencies");
        return Ok(());
    }
    println!("{}", ctx.style.table_header(&format!("Dependencies of {version}")));
    for dependency in table.versions() {
        println!("  {dependency}");
    }
    Ok(())
}

fn fetch(ctx: &CommandContext, args: &FetchArgs) -> Result<()> {
    let mut proxy = ctx.proxy()?;
    let mut references = References::new();
    references.extend(&args.version, args.files.iter().map(String::as_str));
    let found = proxy.get_published_resources(&references)?;
    for (reference, resource) in found.resources.explode() {
        let size = resource
            .content
            .as_ref()
            .map_or(0, |content| content.blob.len());
        println!("{reference}  {size} bytes");
    }
    let total = references.len();
    let missing = found.missing.len();
    if missing == 0 {
        println!("{}", ctx.style.success(&format!("{total} file(s) available")));
    } else {
        println!("{} of {total} file(s) available", total - missing);
    }
    Ok(())
}

fn check(ctx: &CommandContext, args: &CheckArgs) -> Result<()> {
    let mut proxy = ctx.proxy()?;
    let mismatched = proxy.check_valid(&args.versions, args.publish)?;
    if mismatched.is_empty() {
        println!("{}", ctx.style.success("Cache matches the server"));
    }
    Ok(())
}

fn cache(ctx: &CommandContext, command: &CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Info => {
            let stats = ctx.store.stats()?;
            println!("Cache: {}", ctx.store.path().display());
            println!("  references  {}", stats.references);
            println!("  cells       {}", stats.cells);
            println!("  contents    {}", stats.contents);
            println!("  snapshots   {}", stats.snapshots);
            println!("  dep tables  {}", stats.dep_tables);
            println!("  deltas      {}", stats.deltas);
        }
        CacheCommand::Gc => {
            let report = ctx.store.collect_garbage()?;
            println!(
                "Removed {} cell(s) and {} content(s)",
                report.cells, report.contents
            );
        }
        CacheCommand::Clean => {
            ctx.store.clean()?;
            println!("{}", ctx.style.success("Local cache cleaned"));
        }
    }
    Ok(())
}
