use crate::{
    analysis::check_crate,
    config::{Config, CONFIG_FILE},
    diagnostics::{emit_dependency_issue, emit_diagnostics},
    error::{Error, Result},
    logging::{init_logging, LogFormat, LogLevel, LogSettings},
    registry::{check_dependency, InMemoryRegistry},
    render::render,
    resolve::{CrateId, ResolveCache, Resolver, ScopeId, Workspace},
    ty::{expand_aliases, Substitution},
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(
    name = "rustpath",
    version,
    about = "Name resolution, generic-argument checks and type rendering for Rust sources"
)]
pub struct Cli {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_parser = parse_level)]
    pub log_level: Option<LogLevel>,

    /// Log format (auto, text, json)
    #[arg(long, global = true, value_parser = parse_format)]
    pub log_format: Option<LogFormat>,
}

impl LogArgs {
    pub fn settings(&self) -> LogSettings {
        LogSettings {
            format: self.log_format,
            level: self.log_level,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a crate and print its diagnostics.
    Check(CheckArgs),
    /// Render a type written in the context of a crate.
    Render(RenderArgs),
    /// Look up a crate in a registry index.
    Lookup(LookupArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Crate root file
    pub file: PathBuf,

    /// Crate name; defaults to the file stem
    #[arg(long)]
    pub crate_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Crate root file
    pub file: PathBuf,

    /// Type to render
    #[arg(long = "ty")]
    pub ty: String,

    /// Module the type is written in, e.g. `net::http`
    #[arg(long)]
    pub module: Option<String>,

    /// Module the rendered text is inserted into; reports the imports it needs there
    #[arg(long)]
    pub into: Option<String>,

    /// Replace type aliases by their targets
    #[arg(long)]
    pub expand: bool,

    /// Leave lifetimes out of the output
    #[arg(long)]
    pub no_lifetimes: bool,

    #[arg(long)]
    pub crate_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    pub name: String,

    /// Version requirement
    #[arg(default_value = "*")]
    pub req: String,

    /// Registry index; defaults to `[registry] index` of the nearest rustpath.toml
    #[arg(long)]
    pub index: Option<PathBuf>,
}

fn parse_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| format!("unknown log level `{value}`"))
}

fn parse_format(value: &str) -> Result<LogFormat, String> {
    LogFormat::parse(value).ok_or_else(|| format!("unknown log format `{value}`"))
}

pub fn run(cli: Cli) -> Result<()> {
    let anchor = match &cli.command {
        Command::Check(args) => args.file.clone(),
        Command::Render(args) => args.file.clone(),
        Command::Lookup(_) => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let config = Config::for_file(&anchor)?;
    init_logging(LogSettings::layered(config.log, cli.log.settings()));

    match cli.command {
        Command::Check(args) => run_check(&config, &args),
        Command::Render(args) => run_render(&config, &args),
        Command::Lookup(args) => run_lookup(&config, &args),
    }
}

fn crate_name(file: &Path, explicit: Option<&str>) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }
    file.file_stem()
        .map(|stem| stem.to_string_lossy().replace('-', "_"))
        .unwrap_or_else(|| "main".to_string())
}

/// Loads the configured dependencies, then the crate rooted at `file`.
pub fn load_workspace(config: &Config, file: &Path, name: &str) -> Result<(Workspace, CrateId)> {
    let mut ws = Workspace::new()?;
    let registry = match config.registry_index() {
        Some(index) => Some(InMemoryRegistry::load(&index)?),
        None => None,
    };
    let mut deps = Vec::new();
    for dep in &config.dependencies {
        if let (Some(registry), Some(req)) = (&registry, dep.version.as_deref()) {
            match check_dependency(registry, &dep.name, req) {
                Ok(picked) => debug!(target: "rustpath::cli", name = %dep.name, version = %picked.version, "dependency version found"),
                Err(issue) => emit_dependency_issue(&dep.name, issue),
            }
        }
        deps.push(ws.load_crate(&dep.name, &config.resolve_path(&dep.path), &[])?);
    }
    let krate = ws.load_crate(name, file, &deps)?;
    Ok((ws, krate))
}

fn run_check(config: &Config, args: &CheckArgs) -> Result<()> {
    let name = crate_name(&args.file, args.crate_name.as_deref());
    let (ws, krate) = load_workspace(config, &args.file, &name)?;
    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let diagnostics = check_crate(&resolver, krate, config.lints);
    let errors = emit_diagnostics(&ws, &diagnostics);
    info!(
        target: "rustpath::cli",
        krate = %name,
        errors,
        warnings = diagnostics.len() - errors,
        "check finished"
    );
    if diagnostics.is_empty() {
        println!("{}: no diagnostics", args.file.display());
        Ok(())
    } else {
        Err(Error::DiagnosticsReported {
            count: diagnostics.len(),
        })
    }
}

fn module_scope(ws: &Workspace, krate: CrateId, module: Option<&str>, file: &Path) -> Result<ScopeId> {
    let Some(path) = module else {
        return Ok(ws.crate_root_scope(krate));
    };
    let segments: Vec<&str> = path
        .split("::")
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != "crate")
        .collect();
    ws.find_module(krate, &segments)
        .and_then(|def| ws.module(def))
        .map(|module| module.scope)
        .ok_or_else(|| Error::ModuleNotFound {
            path: path.to_string(),
            file: file.to_path_buf(),
        })
}

fn run_render(config: &Config, args: &RenderArgs) -> Result<()> {
    let name = crate_name(&args.file, args.crate_name.as_deref());
    let (mut ws, krate) = load_workspace(config, &args.file, &name)?;
    let scope = module_scope(&ws, krate, args.module.as_deref(), &args.file)?;
    let dest = match &args.into {
        Some(into) => Some(module_scope(&ws, krate, Some(into), &args.file)?),
        None => None,
    };
    let ty = ws
        .parse_type_at(&args.ty, scope)
        .map_err(|source| Error::Syntax {
            text: args.ty.clone(),
            source,
        })?;

    let cache = ResolveCache::new();
    let resolver = Resolver::new(&ws, &cache);
    let ty = if args.expand {
        expand_aliases(&resolver, &ty)
    } else {
        ty
    };
    let mut options = config.render_options();
    if args.no_lifetimes {
        options.render_lifetimes = false;
    }
    let rendered = render(&resolver, &ty, Substitution::new(), options, dest);
    for import in &rendered.imports {
        println!("{}", import.use_text());
    }
    println!("{}", rendered.text);
    Ok(())
}

fn run_lookup(config: &Config, args: &LookupArgs) -> Result<()> {
    let index = args
        .index
        .clone()
        .or_else(|| config.registry_index())
        .ok_or_else(|| Error::NoRegistryIndex {
            config: CONFIG_FILE,
        })?;
    let registry = InMemoryRegistry::load(&index)?;
    match check_dependency(&registry, &args.name, &args.req) {
        Ok(picked) => {
            let mut line = format!("{} {}", args.name, picked.version);
            if picked.is_yanked {
                line.push_str(" (yanked)");
            }
            if !picked.features.is_empty() {
                line.push_str(&format!(" [{}]", picked.features.join(", ")));
            }
            println!("{line}");
            Ok(())
        }
        Err(issue) => {
            emit_dependency_issue(&args.name, issue);
            Err(Error::DiagnosticsReported { count: 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn arguments_parse() {
        let cli = Cli::try_parse_from([
            "rustpath",
            "render",
            "src/lib.rs",
            "--ty",
            "Vec<Foo>",
            "--into",
            "net::http",
            "--no-lifetimes",
            "--log-level",
            "debug",
        ])
        .expect("arguments");
        assert_eq!(cli.log.log_level, Some(LogLevel::Debug));
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.ty, "Vec<Foo>");
        assert_eq!(args.into.as_deref(), Some("net::http"));
        assert!(args.no_lifetimes && !args.expand);

        assert!(Cli::try_parse_from(["rustpath", "check", "lib.rs", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn crate_names_come_from_the_file_stem() {
        assert_eq!(crate_name(Path::new("dir/my-app.rs"), None), "my_app");
        assert_eq!(crate_name(Path::new("dir/lib.rs"), Some("core_utils")), "core_utils");
    }

    #[test]
    fn workspaces_include_configured_dependencies() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("shapes.rs"), "pub struct Circle;\n").expect("dependency");
        fs::write(
            dir.path().join("app.rs"),
            "mod net { pub mod http {} }\nuse shapes::Circle;\nfn f(_: Circle) {}\n",
        )
        .expect("crate");
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[[dependency]]\nname = \"shapes\"\npath = \"shapes.rs\"\n",
        )
        .expect("config");

        let file = dir.path().join("app.rs");
        let config = Config::for_file(&file).expect("config");
        let (ws, krate) = load_workspace(&config, &file, "app").expect("workspace");
        assert_eq!(ws.crate_data(krate).deps.len(), 2);
        assert!(ws.crate_by_name("shapes").is_some());

        let scope = module_scope(&ws, krate, Some("crate::net::http"), &file).expect("module");
        assert_ne!(scope, ws.crate_root_scope(krate));
        let missing = module_scope(&ws, krate, Some("net::ftp"), &file).expect_err("missing module");
        assert!(matches!(missing, Error::ModuleNotFound { .. }));
    }
}
