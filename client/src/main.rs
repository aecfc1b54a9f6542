use engine::{config::config_manager::Config, init_engine};

use crate::{config::ClientConfig, headless_renderer::HeadlessRenderer, session::Session};

mod config;
mod fps_counter;
mod headless_renderer;
mod session;
mod terrain;

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_timed();
    log::info!("Starting headless client...");

    let context = init_engine(HeadlessRenderer::default())?;
    let client_config = ClientConfig::create_manager()?;

    let mut session = Session::new(context, client_config);
    let result = session.run();
    session.shutdown();
    result
}
