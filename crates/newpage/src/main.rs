use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use newpage_core::config::{NewPageConfig, load_config};
use newpage_core::filesystem::FilesystemIndex;
use newpage_core::host::{Host, RenderContext};
use newpage_core::ids::clean_id;
use newpage_core::namespaces::list_namespaces;
use newpage_core::nspath::resolve_namespace;
use newpage_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, ensure_pages_dir, init_layout,
    inspect_runtime, resolve_paths,
};
use newpage_core::{Rendered, parse_directive, render_directive, render_page};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "newpage",
    version,
    about = "Render {{NEWPAGE}} page-creation forms against a wiki page store"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    pages_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    pages_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            pages_dir: cli.pages_dir.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create the page store and a default config file")]
    Init(InitArgs),
    #[command(about = "Parse a directive and print it as JSON")]
    Parse(ParseArgs),
    #[command(about = "Render the form for a single directive")]
    Form(FormArgs),
    #[command(about = "Render every directive on a stored page")]
    Render(RenderArgs),
    #[command(about = "List namespaces offered below a root namespace")]
    Namespaces(NamespacesArgs),
    #[command(about = "Expand a namespace template into its target path")]
    Resolve(ResolveArgs),
    #[command(about = "Show resolved paths and configuration state")]
    Status,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, help = "Overwrite an existing config file")]
    force: bool,
}

#[derive(Debug, Args)]
struct ParseArgs {
    markup: String,
}

#[derive(Debug, Args)]
struct FormArgs {
    markup: String,
    #[arg(long, value_name = "ID", help = "Page the directive appears on")]
    page: Option<String>,
    #[arg(long, help = "Print html and cacheability as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct RenderArgs {
    page: String,
    #[arg(long, help = "Print html and cacheability as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct NamespacesArgs {
    #[arg(default_value = "")]
    root: String,
    #[arg(long, value_name = "LIST", help = "Semicolon-separated prefixes to leave out")]
    exclude: Option<String>,
}

#[derive(Debug, Args)]
struct ResolveArgs {
    template: String,
    #[arg(long, value_name = "ID", help = "Page the directive appears on")]
    page: Option<String>,
    #[arg(long, help = "Use the template as the full page id")]
    autopage: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Init(args)) => run_init(&runtime, args),
        Some(Commands::Parse(args)) => run_parse(&runtime, args),
        Some(Commands::Form(args)) => run_form(&runtime, args),
        Some(Commands::Render(args)) => run_render(&runtime, args),
        Some(Commands::Namespaces(args)) => run_namespaces(&runtime, args),
        Some(Commands::Resolve(args)) => run_resolve(&runtime, args),
        Some(Commands::Status) => run_status(&runtime),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NEWPAGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Workspace {
    paths: ResolvedPaths,
    config: NewPageConfig,
}

impl Workspace {
    fn load(runtime: &RuntimeOptions) -> Result<Self> {
        let paths = resolve_runtime_paths(runtime)?;
        let config = load_config(&paths.config_path)?;
        if runtime.diagnostics {
            eprintln!("[diagnostics]\n{}", paths.diagnostics());
        }
        Ok(Self { paths, config })
    }

    fn page_or_start(&self, page: Option<String>) -> String {
        page.map(|page| clean_id(&page))
            .unwrap_or_else(|| self.config.start_page().to_string())
    }

    fn render<F>(&self, render: F) -> Rendered
    where
        F: FnOnce(&Host<'_>) -> Rendered,
    {
        let index = FilesystemIndex::new(&self.paths.pages_dir);
        let acl = self.config.acl();
        let resolver = self.config.resolver();
        let lang = self.config.lang();
        let target = self.config.form_target();
        let host = Host {
            acl: &acl,
            index: &index,
            resolver: &resolver,
            lang: &lang,
            target: &target,
        };
        render(&host)
    }
}

fn run_init(runtime: &RuntimeOptions, args: InitArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let report = init_layout(&paths, args.force)?;

    println!("Initialized newpage runtime layout");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!("pages_dir: {}", normalize_path(&paths.pages_dir));
    println!("config_path: {}", normalize_path(&paths.config_path));
    println!("created_dirs: {}", report.created_dirs.len());
    println!("wrote_config: {}", report.wrote_config);
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn run_parse(runtime: &RuntimeOptions, args: ParseArgs) -> Result<()> {
    let workspace = Workspace::load(runtime)?;
    let directive = parse_directive(args.markup.trim(), &workspace.config.defaults);
    println!("{}", serde_json::to_string_pretty(&directive)?);
    Ok(())
}

fn run_form(runtime: &RuntimeOptions, args: FormArgs) -> Result<()> {
    let workspace = Workspace::load(runtime)?;
    let markup = args.markup.trim();
    if !markup.starts_with("{{NEWPAGE") || !markup.ends_with("}}") {
        bail!("expected a {{{{NEWPAGE...}}}} directive, got: {markup}");
    }
    let ctx = RenderContext::new(workspace.page_or_start(args.page));
    let directive = parse_directive(markup, &workspace.config.defaults);
    let rendered = workspace.render(|host| render_directive(&directive, &ctx, host));
    print_rendered(&rendered, args.json)
}

fn run_render(runtime: &RuntimeOptions, args: RenderArgs) -> Result<()> {
    let workspace = Workspace::load(runtime)?;
    let status = inspect_runtime(&workspace.paths);
    ensure_pages_dir(&workspace.paths, &status)?;

    let page_id = clean_id(&args.page);
    let index = FilesystemIndex::new(&workspace.paths.pages_dir);
    let Some(text) = index.read_page(&page_id)? else {
        bail!(
            "page `{page_id}` not found under {}",
            normalize_path(&workspace.paths.pages_dir)
        );
    };

    let ctx = RenderContext::new(page_id);
    let rendered =
        workspace.render(|host| render_page(&text, &workspace.config.defaults, &ctx, host));
    print_rendered(&rendered, args.json)
}

fn run_namespaces(runtime: &RuntimeOptions, args: NamespacesArgs) -> Result<()> {
    let workspace = Workspace::load(runtime)?;
    let status = inspect_runtime(&workspace.paths);
    ensure_pages_dir(&workspace.paths, &status)?;

    let root = clean_id(&args.root);
    let exclude = args
        .exclude
        .unwrap_or_else(|| workspace.config.defaults.exclude.clone());
    let index = FilesystemIndex::new(&workspace.paths.pages_dir);
    let namespaces = list_namespaces(&index, &root, &exclude)?;

    println!("namespaces.root: {}", if root.is_empty() { "<root>" } else { root.as_str() });
    println!("namespaces.count: {}", namespaces.len());
    for namespace in namespaces {
        println!("namespaces.id: {namespace}");
    }
    Ok(())
}

fn run_resolve(runtime: &RuntimeOptions, args: ResolveArgs) -> Result<()> {
    let workspace = Workspace::load(runtime)?;
    let ctx = RenderContext::new(workspace.page_or_start(args.page));
    let path = resolve_namespace(&args.template, &ctx, args.autopage);
    println!("path: {path}");
    println!("known_namespace: {}", path.known_namespace());
    println!("has_input: {}", format_flag(path.has_input()));
    Ok(())
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let status = inspect_runtime(&paths);
    let config = load_config(&paths.config_path)?;

    println!("runtime status");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!(
        "project_root_exists: {}",
        format_flag(status.project_root_exists)
    );
    println!("pages_dir: {}", normalize_path(&paths.pages_dir));
    println!("pages_dir_exists: {}", format_flag(status.pages_dir_exists));
    println!("state_dir_exists: {}", format_flag(status.state_dir_exists));
    println!("config_exists: {}", format_flag(status.config_exists));
    println!("form.action: {}", config.form_target().action);
    println!("form.charset: {}", config.charset());
    println!("start_page: {}", config.start_page());
    println!("acl.default: {}", config.acl().default.as_str());
    println!("acl.rules: {}", config.acl.rules.len());
    if !status.warnings.is_empty() {
        println!("warnings:");
        for warning in &status.warnings {
            println!("  - {warning}");
        }
    }
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
    Ok(())
}

fn print_rendered(rendered: &Rendered, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rendered)?);
    } else {
        println!("{}", rendered.html);
        if !rendered.cacheable {
            tracing::info!("output depends on permissions and namespace state; do not cache");
        }
    }
    Ok(())
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        pages_dir: runtime.pages_dir.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
