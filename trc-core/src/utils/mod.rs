//! Utility re-exports and helper macros for the tracked chassis remote.
//!
//! - `connection`: chassis REST vocabulary and the command mapper
//! - `controllers`: sliders, session, throttled dispatch and the request log
//! - `math`: drag-to-position mapping and spring-back decay
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod connection;
pub mod controllers;
pub mod math;

pub use connection::client::{ChassisLink, CommandMapper, Direction};
pub use controllers::{Panel, PanelEvent, SharedLog};
pub use embassy_time::*;
pub use math::drag::Axis;

#[doc(hidden)]
pub use static_cell;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::static_cell::StaticCell<$t> =
            $crate::utils::static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
