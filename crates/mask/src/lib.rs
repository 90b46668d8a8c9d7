//! # Mask tracing and cutout compositing
//!
//! Turns the per-pixel output of a point-prompt segmentation model into
//! vector outlines, and those outlines plus the source bitmap into a
//! trimmed two-tone cutout (black subject on white).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask::{Compositor, MaskTracer, RawMask};
//!
//! let bitmap = image::open("photo.png")?.to_rgba8();
//! let mask = RawMask::from_fn(512, 256, |x, y| if x > 100 && y > 50 { 1.0 } else { -1.0 });
//!
//! // Mask cells are half a display pixel wide for a 1024px-long upload of a 2048px photo
//! let outline = MaskTracer::default().trace(&mask, 2.0)?;
//! if let Some(rendered) = Compositor.render(&bitmap, &outline)? {
//!     std::fs::write("cutout.png", rendered.encode_png()?)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom tracer
//!
//! ```rust,no_run
//! use mask::{MaskTracer, algorithms::*};
//!
//! let tracer = MaskTracer::builder()
//!     .set_hole_detector(NoHoleDetector)
//!     .with_minimum_area(9.0)
//!     .with_simplification(1.5)
//!     .build();
//! ```

pub mod error;
pub mod raw;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod tracer;
pub mod compositor;
pub mod io;

pub use error::{MaskError, Result};
pub use raw::{RawMask, FOREGROUND_THRESHOLD};
pub use types::{ComplexShape, Ring, TracedOutline};
pub use traits::*;
pub use tracer::{MaskTracer, builder::MaskTracerBuilder};
pub use compositor::{BoundingBox, Compositor, RenderedImage};
