fn main() -> anyhow::Result<()> {
    specroute::cli::run_cli()
}
