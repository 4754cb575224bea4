use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, miette};
use std::io::{self, BufWriter, Write};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tilde_lang::{Engine, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tilde=warn";

#[derive(Parser, Debug, Default)]
#[command(name = "tilde")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To render a template:\n\
    tilde -t page layout.tl page.tl --params page.json\n\n\
    ## To pass string parameters:\n\
    tilde -t greeting greeting.tl --arg name world\n\n\
    ## To check template files for syntax errors:\n\
    tilde check layout.tl page.tl")]
#[command(
    about = "tilde compiles HTML templates written in the tilde language and renders them.",
    long_about = None
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Option<Commands>,

    /// Name of the template to render
    #[arg(short, long, value_name = "NAME")]
    template: Option<String>,

    /// Load render parameters from a JSON file
    #[arg(short, long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Sets a string parameter, overriding the parameters file
    #[arg(long = "arg", value_names = ["NAME", "VALUE"])]
    args: Option<Vec<String>>,

    /// Compile templates without flattening their bodies
    #[arg(long, default_value_t = false)]
    no_optimize: bool,

    /// Output to the specified file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Template files, compiled in order
    files: Vec<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check syntax errors in template files
    Check {
        /// Path to the template file to check
        files: Vec<PathBuf>,
    },
    /// List the templates defined by the files
    List {
        /// Template files, compiled in order
        files: Vec<PathBuf>,
    },
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        self.init_tracing();

        match &self.commands {
            Some(Commands::Check { files }) => self.check(files),
            Some(Commands::List { files }) => {
                let engine = self.compile(files)?;
                let stdout = io::stdout();
                let mut handle = BufWriter::new(stdout.lock());

                for name in engine.template_names() {
                    writeln!(handle, "{}", name).into_diagnostic()?;
                }

                handle.flush().into_diagnostic()
            }
            None => self.render(),
        }
    }

    fn init_tracing(&self) {
        let filter = if self.verbose {
            EnvFilter::new("tilde=debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
        };

        // A subscriber may already be installed when running inside tests.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
            .ok();
    }

    fn render(&self) -> miette::Result<()> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| miette!("No template specified. Use --template NAME"))?;

        if self.files.is_empty() {
            return Err(miette!("No template files specified"));
        }

        let engine = self.compile(&self.files)?;
        let params = self.params()?;

        if !engine.is_defined(template) {
            return Err(miette!(
                "Template '{}' is not defined. Available: {}",
                template,
                engine.template_names().join(", ")
            ));
        }

        let html = engine.render(template, &params)?;
        debug!(template, bytes = html.len(), "rendered");

        let mut handle: Box<dyn Write> = match &self.output_file {
            Some(path) => Box::new(BufWriter::new(fs::File::create(path).into_diagnostic()?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };

        writeln!(handle, "{}", html).into_diagnostic()?;
        handle.flush().into_diagnostic()
    }

    fn check(&self, files: &[PathBuf]) -> miette::Result<()> {
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());
        let mut has_error = false;

        for file in files {
            let content = Self::read_file(file)?;
            let mut engine = Engine::default();

            if let Err(e) = engine.compile(&content, &file.to_string_lossy()) {
                has_error = true;
                writeln!(handle, "{}", format!("Checking: {}", file.display()).bold()).into_diagnostic()?;

                let (line, column) = e.position().map(|p| (p.line, p.column)).unwrap_or_default();
                writeln!(
                    handle,
                    "  {}: {} at line {}, column {}",
                    "Error".red().bold(),
                    e,
                    line,
                    column
                )
                .into_diagnostic()?;
            }
        }

        handle.flush().into_diagnostic()?;

        if has_error {
            Err(miette!("Syntax errors found in template files"))
        } else {
            Ok(())
        }
    }

    fn compile(&self, files: &[PathBuf]) -> miette::Result<Engine> {
        let mut engine = Engine::default();
        engine.set_optimize(!self.no_optimize);

        for file in files {
            let content = Self::read_file(file)?;
            engine.compile(&content, &file.to_string_lossy())?;
        }

        Ok(engine)
    }

    fn params(&self) -> miette::Result<Value> {
        let mut params = match &self.params {
            Some(path) => {
                let content = Self::read_file(path)?;
                match serde_json::from_str::<serde_json::Value>(&content).into_diagnostic()? {
                    serde_json::Value::Object(map) => map,
                    _ => return Err(miette!("Parameters file must contain a JSON object: {}", path.display())),
                }
            }
            None => serde_json::Map::new(),
        };

        if let Some(args) = &self.args {
            for pair in args.chunks(2) {
                if let [name, value] = pair {
                    params.insert(name.clone(), serde_json::Value::String(value.clone()));
                }
            }
        }

        Ok(serde_json::Value::Object(params).into())
    }

    fn read_file(path: &Path) -> miette::Result<String> {
        if !path.exists() {
            return Err(miette!("File not found: {}", path.display()));
        }

        fs::read_to_string(path).into_diagnostic()
    }
}
