pub(crate) mod key;
mod mouse;
