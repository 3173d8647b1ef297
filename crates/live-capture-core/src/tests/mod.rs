mod log_pump;
#[cfg(unix)]
mod registry;
#[cfg(unix)]
mod support;
