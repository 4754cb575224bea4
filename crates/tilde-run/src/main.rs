use clap::Parser;

fn main() -> miette::Result<()> {
    tilde_run::Cli::parse().run()
}
