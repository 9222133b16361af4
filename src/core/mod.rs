pub mod client;
pub mod state;
pub mod util;
