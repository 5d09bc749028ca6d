use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    common::logging::init("worker=info,common=info,reqwest=info");

    worker::worker::run().await
}
