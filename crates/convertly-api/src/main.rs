use convertly_core::Config;

// mimalloc as the global allocator, matching the container builds.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = convertly_api::setup::initialize_app(config.clone()).await?;

    convertly_api::setup::server::start_server(&config, router, state.shutdown.clone()).await?;

    Ok(())
}
