pub mod fixtures;

#[cfg(test)]
mod capacity_tests;
#[cfg(test)]
mod idle_reaper_tests;
#[cfg(test)]
mod role_mismatch_tests;
#[cfg(test)]
mod signaling_tests;
#[cfg(test)]
mod ws_helpers;
