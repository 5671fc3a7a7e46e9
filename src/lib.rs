//! # Firlight
//!
//! An interactive GPU installation: a cloud of roughly 120k particles that
//! morphs between scattered chaos and an assembled fir tree, dressed with
//! instanced ornaments, spiral ribbons and a spinning topper.
//!
//! The scene is fully procedural. Generation is seedable and deterministic;
//! animation runs off two smoothed formation-progress scalars driven toward
//! a two-state target (chaos / formed), so heavier ornaments visibly settle
//! after the foliage.
//!
//! ```ignore
//! use firlight::{App, TreeConfig, Tuning};
//! use winit::event_loop::{ControlFlow, EventLoop};
//!
//! let event_loop = EventLoop::new()?;
//! event_loop.set_control_flow(ControlFlow::Poll);
//! let mut app = App::new(TreeConfig::default(), Tuning::default(), None);
//! event_loop.run_app(&mut app)?;
//! ```

pub mod animation;
pub mod camera;
pub mod config;
pub mod error;
pub mod foliage;
pub mod mesh;
pub mod ornaments;
pub mod ribbons;
pub mod scene;
pub mod spawn;
pub mod time;
pub mod window;

pub use animation::{FormationDriver, FormationState};
pub use camera::Camera;
pub use config::{TreeConfig, Tuning};
pub use error::{AppError, ConfigError, GpuError};
pub use scene::Scene;
pub use spawn::SpawnContext;
pub use window::App;
