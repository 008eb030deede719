use clap::Parser;

#[derive(Parser)]
#[command(about = "Local mock of the competition backend")]
struct Args {
    #[arg(long, env = "TESTER_PORT", default_value_t = 9000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tester::start_tester(args.port).await
}
