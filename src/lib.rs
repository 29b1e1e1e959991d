//! EdgeBounce library.
//!
//! Interrupt-style edge debouncing with deferred, coalesced dispatch. An
//! urgent producer reports raw edges through an [`EdgeInjector`]; a fixed
//! debounce window closes on a timer thread; a worker thread reads the
//! settled level and hands it to an [`EventHandler`].
//!
//! ```no_run
//! use edgebounce::{LogEventHandler, Pipeline, PipelineConfig, SimLine};
//!
//! let line = SimLine::new(false);
//! let pipeline = Pipeline::new(PipelineConfig::default(), line.clone(), LogEventHandler::new())?;
//! let injector = pipeline.injector();
//! line.toggle();
//! injector.on_edge_now();
//! pipeline.shutdown();
//! # Ok::<(), edgebounce::Error>(())
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod debounce;
pub mod drivers;
pub mod error;
pub mod health;
pub mod pipeline;
pub mod source;

pub use adapters::log_sink::LogEventHandler;
pub use app::events::SettledEvent;
pub use app::ports::EventHandler;
pub use config::PipelineConfig;
pub use debounce::{EdgeOutcome, EventCounters, WindowPhase, WindowReport};
pub use drivers::sim_line::SimLine;
pub use error::{Error, InitError, PipelineFault};
pub use pipeline::{EdgeInjector, Pipeline, PipelineSnapshot};
