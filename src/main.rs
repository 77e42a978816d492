#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sport_timer_lib::run().await
}
