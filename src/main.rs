use winit::event_loop::{ControlFlow, EventLoop};

use firlight::{App, AppError, TreeConfig, Tuning};

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Fixed seed reproduces a layout exactly; otherwise each run differs.
    let seed = std::env::var("FIRLIGHT_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(TreeConfig::default(), Tuning::default(), seed);
    event_loop.run_app(&mut app)?;
    Ok(())
}
