mod config;
mod report;
mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use activator::ActivationWarning;

use crate::config::RegistryConfig;
use crate::report::Mode;

const SUBCOMMANDS: &[&str] = &["run", "test", "help"];

#[derive(Parser)]
#[command(name = "xblock", version, about = "Activate XBlock markup against a registry")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Activate the blocks in an HTML file
    Run(RunArgs),

    /// Run .test.html fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Rendered HTML file to activate
    file: String,

    /// Registry TOML declaring runtimes and constructors
    #[arg(short, long)]
    registry: Option<String>,

    /// Only activate elements rendered with this request token
    #[arg(short, long)]
    token: Option<String>,

    /// Which bulk activation to run
    #[arg(short, long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Parse only, don't activate (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed element tree
    #[arg(long)]
    tree: bool,

    /// List block and aside elements without activating them
    #[arg(long)]
    list_blocks: bool,

    /// Suppress the activation report (just check for errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.html file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    // `xblock page.html` is shorthand for `xblock run page.html`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|i| i + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Run(run_args) => do_run(run_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn do_run(args: RunArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    let mut dom = match dom::parser::Parser::new(source, file_id).parse() {
        Ok(dom) => dom,
        Err(errors) => {
            for error in &errors {
                let diagnostic = error.to_diagnostic();
                let _ =
                    term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            }
            process::exit(1);
        }
    };

    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    if args.tree {
        print!("{}", dom.outline(dom.root()));
        return;
    }

    if args.list_blocks {
        print!("{}", report::list_candidates(&dom));
        return;
    }

    let registry_config = match &args.registry {
        Some(path) => RegistryConfig::load(Path::new(path)),
        None => Ok(RegistryConfig::default()),
    };
    let registry = match registry_config.and_then(|c| c.build()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: registry: {}", e);
            process::exit(1);
        }
    };

    let root = dom.root();
    match report::activate_and_render(&mut dom, root, &registry, args.mode, args.token.as_deref())
    {
        Ok((rendered, warnings)) => {
            emit_warnings(&writer, &config, &files, &warnings);
            if !args.quiet {
                print!("{}", rendered);
            }
        }
        Err(error) => {
            eprintln!("activation error: {}", error);
            process::exit(1);
        }
    }
}

fn emit_warnings(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    warnings: &[ActivationWarning],
) {
    for warning in warnings {
        match &warning.span {
            Some(span) => {
                let diagnostic = Diagnostic::new(Severity::Warning)
                    .with_message("block can't be initialized")
                    .with_labels(vec![
                        Label::primary(warning.source_id, span.clone())
                            .with_message(warning.message.clone()),
                    ]);
                let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
            }
            None => eprintln!("warning: {}", warning),
        }
    }
}
